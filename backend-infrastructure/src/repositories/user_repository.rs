use async_trait::async_trait;
use uuid::Uuid;

use backend_domain::{Role, User, UserRepository};

use crate::repositories::pg_rows::UserRow;
use crate::repositories::pg_store::{count, PgStore};

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, phone, role, verified, notify_email, \
             notify_whatsapp, notify_push, push_tokens, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(User::from))
    }

    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE users SET verified = $2 WHERE id = $1")
            .bind(id)
            .bind(verified)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await?;
        Ok(count(total))
    }
}
