// Postgres row shapes and their conversion into domain entities

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use backend_domain::{
    Currency, Discount, Event, NotificationPrefs, OrganizerEarnings, PaymentMethod, Payout,
    PayoutAuditEntry, PayoutMethod, PayoutStatus, PendingStatus, PendingTransaction, PromoCode,
    PurchaseLine, Role, Severity, SuspiciousActivity, Ticket, TicketStatus, TicketTier, User,
};

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub verified: bool,
    pub notify_email: bool,
    pub notify_whatsapp: bool,
    pub notify_push: bool,
    pub push_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            phone: row.phone,
            role: Role::from(row.role.as_str()),
            verified: row.verified,
            notification_prefs: NotificationPrefs {
                email: row.notify_email,
                whatsapp: row.notify_whatsapp,
                push: row.notify_push,
            },
            push_tokens: row.push_tokens,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub currency: String,
    pub ticket_price: i64,
    pub total_tickets: i32,
    pub sold_tickets: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Event {
            id: row.id,
            organizer_id: row.organizer_id,
            title: row.title,
            description: row.description,
            venue: row.venue,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            currency: row.currency.parse()?,
            ticket_price: row.ticket_price,
            total_tickets: row.total_tickets,
            sold_tickets: row.sold_tickets,
            published: row.published,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct TierRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: i64,
    pub total_quantity: i32,
    pub sold_quantity: i32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
}

impl From<TierRow> for TicketTier {
    fn from(row: TierRow) -> Self {
        TicketTier {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            price: row.price,
            total_quantity: row.total_quantity,
            sold_quantity: row.sold_quantity,
            sales_start: row.sales_start,
            sales_end: row.sales_end,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct TicketRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub tier_id: Option<Uuid>,
    pub attendee_id: Uuid,
    pub price_paid: i64,
    pub currency: String,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub status: String,
    pub qr_payload: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub charged_amount: Option<i64>,
    pub charged_currency: Option<String>,
    pub fx_rate: Option<Decimal>,
    pub promo_code_id: Option<Uuid>,
    pub purchased_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = anyhow::Error;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(Ticket {
            id: row.id,
            event_id: row.event_id,
            tier_id: row.tier_id,
            attendee_id: row.attendee_id,
            price_paid: row.price_paid,
            currency: row.currency.parse()?,
            payment_method: PaymentMethod::from(row.payment_method.as_str()),
            payment_id: row.payment_id,
            status: row.status.parse()?,
            qr_payload: row.qr_payload,
            checked_in_at: row.checked_in_at,
            charged_amount: row.charged_amount,
            charged_currency: row
                .charged_currency
                .as_deref()
                .map(str::parse::<Currency>)
                .transpose()?,
            fx_rate: row.fx_rate,
            promo_code_id: row.promo_code_id,
            purchased_at: row.purchased_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PayoutRow {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub destination: String,
    pub status: String,
    pub decline_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub payment_reference: Option<String>,
    pub receipt_url: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PayoutRow> for Payout {
    type Error = anyhow::Error;

    fn try_from(row: PayoutRow) -> Result<Self> {
        Ok(Payout {
            id: row.id,
            organizer_id: row.organizer_id,
            amount: row.amount,
            currency: row.currency.parse()?,
            method: PayoutMethod::from(row.method.as_str()),
            destination: row.destination,
            status: row.status.parse()?,
            decline_reason: row.decline_reason,
            failure_reason: row.failure_reason,
            payment_reference: row.payment_reference,
            receipt_url: row.receipt_url,
            scheduled_for: row.scheduled_for,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PayoutAuditRow {
    pub payout_id: Uuid,
    pub actor_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl TryFrom<PayoutAuditRow> for PayoutAuditEntry {
    type Error = anyhow::Error;

    fn try_from(row: PayoutAuditRow) -> Result<Self> {
        Ok(PayoutAuditEntry {
            payout_id: row.payout_id,
            actor_id: row.actor_id,
            from_status: row.from_status.parse::<PayoutStatus>()?,
            to_status: row.to_status.parse::<PayoutStatus>()?,
            note: row.note,
            at: row.at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PromoCodeRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = anyhow::Error;

    fn try_from(row: PromoCodeRow) -> Result<Self> {
        let discount = Discount::from_parts(&row.discount_type, row.discount_value)
            .ok_or_else(|| anyhow!("unknown discount type '{}'", row.discount_type))?;
        Ok(PromoCode {
            id: row.id,
            event_id: row.event_id,
            code: row.code,
            discount,
            max_uses: row.max_uses,
            uses: row.uses,
            active: row.active,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PendingRow {
    pub order_id: String,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub lines: Json<Vec<PurchaseLine>>,
    pub promo_code_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub charged_amount: i64,
    pub fx_rate: Option<Decimal>,
    pub gateway_token: Option<String>,
    pub status: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PendingRow> for PendingTransaction {
    type Error = anyhow::Error;

    fn try_from(row: PendingRow) -> Result<Self> {
        Ok(PendingTransaction {
            order_id: row.order_id,
            event_id: row.event_id,
            attendee_id: row.attendee_id,
            lines: row.lines.0,
            promo_code_id: row.promo_code_id,
            amount: row.amount,
            currency: row.currency.parse()?,
            charged_amount: row.charged_amount,
            fx_rate: row.fx_rate,
            gateway_token: row.gateway_token,
            status: row.status.parse::<PendingStatus>()?,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub severity: String,
    pub details: String,
    pub reviewed: bool,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityRow> for SuspiciousActivity {
    fn from(row: ActivityRow) -> Self {
        SuspiciousActivity {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            severity: Severity::from(row.severity.as_str()),
            details: row.details,
            reviewed: row.reviewed,
            reviewed_by: row.reviewed_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct EarningsRow {
    pub organizer_id: Uuid,
    pub currency: String,
    pub gross: i64,
    pub platform_fees: i64,
    pub processing_fees: i64,
    pub net: i64,
    pub tickets_sold: i64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EarningsRow> for OrganizerEarnings {
    type Error = anyhow::Error;

    fn try_from(row: EarningsRow) -> Result<Self> {
        Ok(OrganizerEarnings {
            organizer_id: row.organizer_id,
            currency: row.currency.parse()?,
            gross: row.gross,
            platform_fees: row.platform_fees,
            processing_fees: row.processing_fees,
            net: row.net,
            tickets_sold: row.tickets_sold,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promo_row_with_unknown_discount_is_rejected() {
        let row = PromoCodeRow {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            code: "LAKAY".to_string(),
            discount_type: "bogo".to_string(),
            discount_value: 1,
            max_uses: None,
            uses: 0,
            active: true,
            expires_at: None,
            created_at: Utc::now(),
        };
        assert!(PromoCode::try_from(row).is_err());
    }

    #[test]
    fn ticket_row_parses_legacy_status_spelling() {
        let row = TicketRow {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            tier_id: None,
            attendee_id: Uuid::new_v4(),
            price_paid: 1500,
            currency: "usd".to_string(),
            payment_method: "card".to_string(),
            payment_id: Some("pi_1".to_string()),
            status: "active".to_string(),
            qr_payload: "eht1.x".to_string(),
            checked_in_at: None,
            charged_amount: Some(198_750),
            charged_currency: Some("HTG".to_string()),
            fx_rate: Some(Decimal::new(13_250, 2)),
            promo_code_id: None,
            purchased_at: Utc::now(),
        };
        let ticket = Ticket::try_from(row).expect("ticket");
        assert_eq!(ticket.status, TicketStatus::Valid);
        assert_eq!(ticket.currency, Currency::Usd);
        assert_eq!(ticket.charged_currency, Some(Currency::Htg));
    }
}
