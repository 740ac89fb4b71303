use async_trait::async_trait;
use uuid::Uuid;

use backend_domain::{Payout, PayoutAuditEntry, PayoutRepository, PayoutStatus};

use crate::repositories::pg_rows::{convert_all, PayoutAuditRow, PayoutRow};
use crate::repositories::pg_store::{count, limit, PgStore};

const PAYOUT_COLUMNS: &str = "id, organizer_id, amount, currency, method, destination, status, \
     decline_reason, failure_reason, payment_reference, receipt_url, scheduled_for, \
     completed_at, created_at, updated_at";

#[async_trait]
impl PayoutRepository for PgStore {
    async fn insert_payout(&self, payout: &Payout) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO payouts ({PAYOUT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(payout.id)
        .bind(payout.organizer_id)
        .bind(payout.amount)
        .bind(payout.currency.as_str())
        .bind(payout.method.as_str())
        .bind(&payout.destination)
        .bind(payout.status.as_str())
        .bind(&payout.decline_reason)
        .bind(&payout.failure_reason)
        .bind(&payout.payment_reference)
        .bind(&payout.receipt_url)
        .bind(payout.scheduled_for)
        .bind(payout.completed_at)
        .bind(payout.created_at)
        .bind(payout.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_payout(&self, id: Uuid) -> anyhow::Result<Option<Payout>> {
        let row = sqlx::query_as::<_, PayoutRow>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Payout::try_from).transpose()
    }

    async fn update_payout(
        &self,
        payout: &Payout,
        expected: PayoutStatus,
        audit: &PayoutAuditEntry,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool().begin().await?;
        let updated = sqlx::query(
            "UPDATE payouts SET status = $3, decline_reason = $4, failure_reason = $5, \
             payment_reference = $6, receipt_url = $7, completed_at = $8, updated_at = $9 \
             WHERE id = $1 AND status = $2",
        )
        .bind(payout.id)
        .bind(expected.as_str())
        .bind(payout.status.as_str())
        .bind(&payout.decline_reason)
        .bind(&payout.failure_reason)
        .bind(&payout.payment_reference)
        .bind(&payout.receipt_url)
        .bind(payout.completed_at)
        .bind(payout.updated_at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query(
            "INSERT INTO payout_audit (payout_id, actor_id, from_status, to_status, note, at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(audit.payout_id)
        .bind(audit.actor_id)
        .bind(audit.from_status.as_str())
        .bind(audit.to_status.as_str())
        .bind(&audit.note)
        .bind(audit.at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Payout>> {
        let rows = sqlx::query_as::<_, PayoutRow>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE organizer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(organizer_id)
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn list_by_status(
        &self,
        status: Option<PayoutStatus>,
        max: usize,
    ) -> anyhow::Result<Vec<Payout>> {
        let rows = sqlx::query_as::<_, PayoutRow>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts \
             WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at LIMIT $2"
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit(max))
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn list_audit(&self, payout_id: Uuid) -> anyhow::Result<Vec<PayoutAuditEntry>> {
        let rows = sqlx::query_as::<_, PayoutAuditRow>(
            "SELECT payout_id, actor_id, from_status, to_status, note, at \
             FROM payout_audit WHERE payout_id = $1 ORDER BY at, id",
        )
        .bind(payout_id)
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn count_pending(&self) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payouts WHERE status = 'pending'")
            .fetch_one(self.pool())
            .await?;
        Ok(count(total))
    }
}
