use async_trait::async_trait;
use uuid::Uuid;

use backend_domain::{PromoCode, PromoCodeRepository};

use crate::repositories::pg_rows::{convert_all, PromoCodeRow};
use crate::repositories::pg_store::PgStore;

const PROMO_COLUMNS: &str = "id, event_id, code, discount_type, discount_value, max_uses, uses, \
     active, expires_at, created_at";

#[async_trait]
impl PromoCodeRepository for PgStore {
    async fn insert_promo_code(&self, promo: &PromoCode) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO promo_codes ({PROMO_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(promo.id)
        .bind(promo.event_id)
        .bind(&promo.code)
        .bind(promo.discount.kind())
        .bind(promo.discount.value())
        .bind(promo.max_uses)
        .bind(promo.uses)
        .bind(promo.active)
        .bind(promo.expires_at)
        .bind(promo.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_promo_code(&self, id: Uuid) -> anyhow::Result<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(PromoCode::try_from).transpose()
    }

    async fn find_by_code(&self, event_id: Uuid, code: &str) -> anyhow::Result<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE event_id = $1 AND code = $2"
        ))
        .bind(event_id)
        .bind(code)
        .fetch_optional(self.pool())
        .await?;
        row.map(PromoCode::try_from).transpose()
    }

    async fn list_by_event(&self, event_id: Uuid) -> anyhow::Result<Vec<PromoCode>> {
        let rows = sqlx::query_as::<_, PromoCodeRow>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE event_id = $1 ORDER BY code"
        ))
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE promo_codes SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_usage(&self, id: Uuid, by: u32) -> anyhow::Result<()> {
        sqlx::query("UPDATE promo_codes SET uses = uses + $2 WHERE id = $1")
            .bind(id)
            .bind(i32::try_from(by)?)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
