use async_trait::async_trait;
use uuid::Uuid;

use backend_domain::{SuspiciousActivity, SuspiciousActivityRepository};

use crate::repositories::pg_rows::ActivityRow;
use crate::repositories::pg_store::{count, limit, PgStore};

#[async_trait]
impl SuspiciousActivityRepository for PgStore {
    async fn insert_activity(&self, activity: &SuspiciousActivity) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO suspicious_activities (id, user_id, kind, severity, details, reviewed, \
             reviewed_by, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(activity.id)
        .bind(activity.user_id)
        .bind(&activity.kind)
        .bind(activity.severity.as_str())
        .bind(&activity.details)
        .bind(activity.reviewed)
        .bind(activity.reviewed_by)
        .bind(activity.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_activities(
        &self,
        reviewed: Option<bool>,
        max: usize,
    ) -> anyhow::Result<Vec<SuspiciousActivity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, user_id, kind, severity, details, reviewed, reviewed_by, created_at \
             FROM suspicious_activities WHERE ($1::BOOLEAN IS NULL OR reviewed = $1) \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(reviewed)
        .bind(limit(max))
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(SuspiciousActivity::from).collect())
    }

    async fn mark_reviewed(&self, id: Uuid, reviewer: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE suspicious_activities SET reviewed = TRUE, reviewed_by = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(reviewer)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_unreviewed(&self) -> anyhow::Result<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM suspicious_activities WHERE NOT reviewed")
                .fetch_one(self.pool())
                .await?;
        Ok(count(total))
    }
}
