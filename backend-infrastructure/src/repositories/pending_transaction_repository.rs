use async_trait::async_trait;
use sqlx::types::Json;

use backend_domain::{PendingStatusUpdate, PendingTransaction, PendingTransactionRepository};

use crate::repositories::pg_rows::PendingRow;
use crate::repositories::pg_store::PgStore;

#[async_trait]
impl PendingTransactionRepository for PgStore {
    async fn insert_pending(&self, pending: &PendingTransaction) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO pending_transactions (order_id, event_id, attendee_id, lines, \
             promo_code_id, amount, currency, charged_amount, fx_rate, gateway_token, status, \
             transaction_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&pending.order_id)
        .bind(pending.event_id)
        .bind(pending.attendee_id)
        .bind(Json(&pending.lines))
        .bind(pending.promo_code_id)
        .bind(pending.amount)
        .bind(pending.currency.as_str())
        .bind(pending.charged_amount)
        .bind(pending.fx_rate)
        .bind(&pending.gateway_token)
        .bind(pending.status.as_str())
        .bind(&pending.transaction_id)
        .bind(pending.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_pending(&self, order_id: &str) -> anyhow::Result<Option<PendingTransaction>> {
        let row = sqlx::query_as::<_, PendingRow>(
            "SELECT order_id, event_id, attendee_id, lines, promo_code_id, amount, currency, \
             charged_amount, fx_rate, gateway_token, status, transaction_id, created_at \
             FROM pending_transactions WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(PendingTransaction::try_from).transpose()
    }

    async fn set_gateway_token(&self, order_id: &str, token: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE pending_transactions SET gateway_token = $2 WHERE order_id = $1")
            .bind(order_id)
            .bind(token)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn find_by_gateway_token(
        &self,
        token: &str,
    ) -> anyhow::Result<Option<PendingTransaction>> {
        let row = sqlx::query_as::<_, PendingRow>(
            "SELECT order_id, event_id, attendee_id, lines, promo_code_id, amount, currency, \
             charged_amount, fx_rate, gateway_token, status, transaction_id, created_at \
             FROM pending_transactions WHERE gateway_token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;
        row.map(PendingTransaction::try_from).transpose()
    }

    async fn update_pending_status(
        &self,
        order_id: &str,
        update: &PendingStatusUpdate,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE pending_transactions \
             SET status = $2, transaction_id = COALESCE($3, transaction_id) \
             WHERE order_id = $1",
        )
        .bind(order_id)
        .bind(update.status.as_str())
        .bind(&update.transaction_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
