use async_trait::async_trait;

use backend_domain::WebhookReceiptRepository;

use crate::repositories::pg_store::PgStore;

#[async_trait]
impl WebhookReceiptRepository for PgStore {
    async fn has_receipt(&self, provider: &str, event_id: &str) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM webhook_receipts WHERE provider = $1 AND event_id = $2)",
        )
        .bind(provider)
        .bind(event_id)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }

    async fn record_receipt(&self, provider: &str, event_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO webhook_receipts (provider, event_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(provider)
        .bind(event_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn claim_payment(&self, payment_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO payment_claims (payment_id) VALUES ($1) ON CONFLICT DO NOTHING",
        )
        .bind(payment_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_payment(&self, payment_id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM payment_claims WHERE payment_id = $1")
            .bind(payment_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
