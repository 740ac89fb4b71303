use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use backend_domain::{EarningsDelta, EarningsRepository, OrganizerEarnings};

use crate::repositories::pg_rows::{convert_all, EarningsRow};
use crate::repositories::pg_store::PgStore;

#[async_trait]
impl EarningsRepository for PgStore {
    // Additive upsert, so concurrent credits for the same organizer never lose updates.
    async fn credit(&self, organizer_id: Uuid, delta: &EarningsDelta) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO organizer_earnings (organizer_id, currency, gross, platform_fees, \
             processing_fees, net, tickets_sold, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (organizer_id, currency) DO UPDATE SET \
             gross = organizer_earnings.gross + EXCLUDED.gross, \
             platform_fees = organizer_earnings.platform_fees + EXCLUDED.platform_fees, \
             processing_fees = organizer_earnings.processing_fees + EXCLUDED.processing_fees, \
             net = organizer_earnings.net + EXCLUDED.net, \
             tickets_sold = organizer_earnings.tickets_sold + EXCLUDED.tickets_sold, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(organizer_id)
        .bind(delta.currency.as_str())
        .bind(delta.gross)
        .bind(delta.platform_fees)
        .bind(delta.processing_fees)
        .bind(delta.net)
        .bind(delta.tickets_sold)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_for_organizer(
        &self,
        organizer_id: Uuid,
    ) -> anyhow::Result<Vec<OrganizerEarnings>> {
        let rows = sqlx::query_as::<_, EarningsRow>(
            "SELECT organizer_id, currency, gross, platform_fees, processing_fees, net, \
             tickets_sold, updated_at FROM organizer_earnings WHERE organizer_id = $1 \
             ORDER BY currency",
        )
        .bind(organizer_id)
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn replace_for_organizer(
        &self,
        organizer_id: Uuid,
        rows: &[OrganizerEarnings],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM organizer_earnings WHERE organizer_id = $1")
            .bind(organizer_id)
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO organizer_earnings (organizer_id, currency, gross, platform_fees, \
                 processing_fees, net, tickets_sold, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(organizer_id)
            .bind(row.currency.as_str())
            .bind(row.gross)
            .bind(row.platform_fees)
            .bind(row.processing_fees)
            .bind(row.net)
            .bind(row.tickets_sold)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
