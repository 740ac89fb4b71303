use async_trait::async_trait;
use uuid::Uuid;

use backend_domain::{Event, EventRepository, TicketTier};

use crate::repositories::pg_rows::{convert_all, EventRow, TierRow};
use crate::repositories::pg_store::{count, limit, PgStore};

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, venue, starts_at, ends_at, \
     currency, ticket_price, total_tickets, sold_tickets, published, created_at";

#[async_trait]
impl EventRepository for PgStore {
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, venue, starts_at, ends_at, \
             currency, ticket_price, total_tickets, sold_tickets, published, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.currency.as_str())
        .bind(event.ticket_price)
        .bind(event.total_tickets)
        .bind(event.sold_tickets)
        .bind(event.published)
        .bind(event.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE events SET published = $2 WHERE id = $1")
            .bind(id)
            .bind(published)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY starts_at"
        ))
        .bind(organizer_id)
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn search_published(&self, query: &str, max: usize) -> anyhow::Result<Vec<Event>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE published AND (title ILIKE $1 OR venue ILIKE $1) \
             ORDER BY starts_at LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit(max))
        .fetch_all(self.pool())
        .await?;
        convert_all(rows)
    }

    async fn count_events(&self) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(self.pool())
            .await?;
        Ok(count(total))
    }

    async fn insert_tier(&self, tier: &TicketTier) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO ticket_tiers (id, event_id, name, price, total_quantity, sold_quantity, \
             sales_start, sales_end) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(tier.id)
        .bind(tier.event_id)
        .bind(&tier.name)
        .bind(tier.price)
        .bind(tier.total_quantity)
        .bind(tier.sold_quantity)
        .bind(tier.sales_start)
        .bind(tier.sales_end)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_tiers(&self, event_id: Uuid) -> anyhow::Result<Vec<TicketTier>> {
        let rows = sqlx::query_as::<_, TierRow>(
            "SELECT id, event_id, name, price, total_quantity, sold_quantity, sales_start, sales_end \
             FROM ticket_tiers WHERE event_id = $1 ORDER BY price, name",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(TicketTier::from).collect())
    }

    async fn reserve_inventory(
        &self,
        event_id: Uuid,
        tier_id: Option<Uuid>,
        quantity: u32,
    ) -> anyhow::Result<bool> {
        let quantity = i32::try_from(quantity)?;
        let mut tx = self.pool().begin().await?;
        let reserved = match tier_id {
            Some(tier_id) => {
                let tier = sqlx::query(
                    "UPDATE ticket_tiers SET sold_quantity = sold_quantity + $3 \
                     WHERE id = $1 AND event_id = $2 AND sold_quantity + $3 <= total_quantity",
                )
                .bind(tier_id)
                .bind(event_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
                tier.rows_affected() == 1
                    && sqlx::query("UPDATE events SET sold_tickets = sold_tickets + $2 WHERE id = $1")
                        .bind(event_id)
                        .bind(quantity)
                        .execute(&mut *tx)
                        .await?
                        .rows_affected()
                        == 1
            }
            None => {
                sqlx::query(
                    "UPDATE events SET sold_tickets = sold_tickets + $2 \
                     WHERE id = $1 AND sold_tickets + $2 <= total_tickets",
                )
                .bind(event_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                    == 1
            }
        };
        if reserved {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        Ok(reserved)
    }

    async fn release_inventory(
        &self,
        event_id: Uuid,
        tier_id: Option<Uuid>,
        quantity: u32,
    ) -> anyhow::Result<()> {
        let quantity = i32::try_from(quantity)?;
        let mut tx = self.pool().begin().await?;
        if let Some(tier_id) = tier_id {
            sqlx::query(
                "UPDATE ticket_tiers SET sold_quantity = GREATEST(sold_quantity - $2, 0) WHERE id = $1",
            )
            .bind(tier_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE events SET sold_tickets = GREATEST(sold_tickets - $2, 0) WHERE id = $1")
            .bind(event_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.ping_database().await
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_off"), "100\\%\\_off");
        assert_eq!(escape_like("Jacmel"), "Jacmel");
    }
}
