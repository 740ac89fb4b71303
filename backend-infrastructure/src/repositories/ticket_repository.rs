use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use backend_domain::{Ticket, TicketRepository, TicketStatus};

use crate::repositories::pg_rows::{convert_all, TicketRow};
use crate::repositories::pg_store::{count, PgStore};

const TICKET_COLUMNS: &str = "id, event_id, tier_id, attendee_id, price_paid, currency, \
     payment_method, payment_id, status, qr_payload, checked_in_at, charged_amount, \
     charged_currency, fx_rate, promo_code_id, purchased_at";

#[async_trait]
impl TicketRepository for PgStore {
    async fn insert_tickets(&self, tickets: &[Ticket]) -> anyhow::Result<()> {
        let mut tx = self.pool().begin().await?;
        for ticket in tickets {
            sqlx::query(&format!(
                "INSERT INTO tickets ({TICKET_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
            ))
            .bind(ticket.id)
            .bind(ticket.event_id)
            .bind(ticket.tier_id)
            .bind(ticket.attendee_id)
            .bind(ticket.price_paid)
            .bind(ticket.currency.as_str())
            .bind(ticket.payment_method.as_str())
            .bind(&ticket.payment_id)
            .bind(ticket.status.as_str())
            .bind(&ticket.qr_payload)
            .bind(ticket.checked_in_at)
            .bind(ticket.charged_amount)
            .bind(ticket.charged_currency.map(|c| c.as_str()))
            .bind(ticket.fx_rate)
            .bind(ticket.promo_code_id)
            .bind(ticket.purchased_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn exists_for_payment(&self, payment_id: &str) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tickets WHERE payment_id = $1)")
                .bind(payment_id)
                .fetch_one(self.pool())
                .await?;
        Ok(exists)
    }

    async fn find_ticket(&self, id: Uuid) -> anyhow::Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Ticket::try_from).transpose()
    }

    async fn list_by_event(&self, event_id: Uuid) -> anyhow::Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 ORDER BY purchased_at, id"
        ))
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn mark_checked_in(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE tickets SET checked_in_at = $2 WHERE id = $1 AND checked_in_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_status(&self, id: Uuid, status: TicketStatus) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE tickets SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_tickets(&self) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(self.pool())
            .await?;
        Ok(count(total))
    }
}
