// CSV exports for organizer financial reporting

use std::collections::HashMap;
use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{Event, Ticket};
use crate::services::settlement::Settlement;
use crate::value_objects::format_minor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Summary,
    Financials,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Summary => "summary",
            ExportKind::Financials => "financials",
        }
    }
}

impl FromStr for ExportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(ExportKind::Summary),
            "financials" | "financial" => Ok(ExportKind::Financials),
            other => Err(anyhow!("unknown export kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

pub fn export_filename(event_id: Uuid, kind: ExportKind, date: NaiveDate) -> String {
    format!(
        "event_{}_{}_{}.csv",
        event_id,
        kind.as_str(),
        date.format("%Y-%m-%d")
    )
}

pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_row(out: &mut String, fields: &[String]) {
    let row: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
    let _ = writeln!(out, "{}", row.join(","));
}

pub fn summary_csv(event: &Event, tickets: &[Ticket], settlement: &Settlement) -> String {
    let sold = tickets.iter().filter(|t| t.status.is_active()).count();
    let checked_in = tickets
        .iter()
        .filter(|t| t.status.is_active() && t.checked_in_at.is_some())
        .count();
    let totals = &settlement.totals;

    let rows = [
        ("event_id", event.id.to_string()),
        ("title", event.title.clone()),
        ("currency", event.currency.to_string()),
        ("tickets_sold", sold.to_string()),
        ("tickets_checked_in", checked_in.to_string()),
        ("payment_groups", totals.payment_groups.to_string()),
        ("gross", format_minor(totals.gross)),
        ("platform_fee", format_minor(totals.platform_fee)),
        ("processing_fee", format_minor(totals.processing_fee)),
        ("organizer_net", format_minor(totals.organizer_net)),
    ];

    let mut out = String::from("metric,value\n");
    for (metric, value) in rows {
        push_row(&mut out, &[metric.to_string(), value]);
    }
    out
}

// One row per settled ticket, in settlement order. Tickets outside any
// settlement group (refunded, cancelled, free) are listed with zero amounts.
pub fn financials_csv(
    tickets: &[Ticket],
    settlement: &Settlement,
    tier_names: &HashMap<Uuid, String>,
) -> String {
    let mut out = String::from(
        "ticket_id,payment_id,purchased_at,tier,payment_method,currency,gross,platform_fee,processing_fee,organizer_net,status\n",
    );
    let by_id: HashMap<Uuid, &Ticket> = tickets.iter().map(|t| (t.id, t)).collect();

    let mut listed = Vec::with_capacity(tickets.len());
    for group in &settlement.groups {
        for allocation in &group.allocations {
            let Some(ticket) = by_id.get(&allocation.ticket_id) else {
                continue;
            };
            listed.push(ticket.id);
            push_row(
                &mut out,
                &[
                    ticket.id.to_string(),
                    allocation.payment_id.clone(),
                    ticket.purchased_at.to_rfc3339(),
                    tier_label(ticket, tier_names),
                    ticket.payment_method.as_str().to_string(),
                    ticket.currency.to_string(),
                    format_minor(allocation.gross),
                    format_minor(allocation.platform_fee),
                    format_minor(allocation.processing_fee),
                    format_minor(allocation.organizer_net),
                    ticket.status.as_str().to_string(),
                ],
            );
        }
    }

    let mut rest: Vec<&Ticket> = tickets.iter().filter(|t| !listed.contains(&t.id)).collect();
    rest.sort_by_key(|t| t.id.to_string());
    for ticket in rest {
        push_row(
            &mut out,
            &[
                ticket.id.to_string(),
                ticket.payment_id.clone().unwrap_or_default(),
                ticket.purchased_at.to_rfc3339(),
                tier_label(ticket, tier_names),
                ticket.payment_method.as_str().to_string(),
                ticket.currency.to_string(),
                format_minor(0),
                format_minor(0),
                format_minor(0),
                format_minor(0),
                ticket.status.as_str().to_string(),
            ],
        );
    }
    out
}

fn tier_label(ticket: &Ticket, tier_names: &HashMap<Uuid, String>) -> String {
    ticket
        .tier_id
        .and_then(|id| tier_names.get(&id).cloned())
        .unwrap_or_else(|| "General Admission".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::FeeSchedule;
    use crate::services::settlement::settle;
    use crate::value_objects::{Currency, PaymentMethod, TicketStatus};
    use chrono::Utc;

    fn event() -> Event {
        Event {
            id: Uuid::from_u128(1),
            organizer_id: Uuid::from_u128(2),
            title: "Jazz, Rum & Kreyol".to_string(),
            description: None,
            venue: "Jacmel".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            currency: Currency::Usd,
            ticket_price: 10_000,
            total_tickets: 10,
            sold_tickets: 2,
            published: true,
            created_at: Utc::now(),
        }
    }

    fn ticket(id: u128, status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::from_u128(id),
            event_id: Uuid::from_u128(1),
            tier_id: None,
            attendee_id: Uuid::from_u128(3),
            price_paid: 10_000,
            currency: Currency::Usd,
            payment_method: PaymentMethod::Card,
            payment_id: Some(format!("pi_{id}")),
            status,
            qr_payload: String::new(),
            checked_in_at: None,
            charged_amount: None,
            charged_currency: None,
            fx_rate: None,
            promo_code_id: None,
            purchased_at: Utc::now(),
        }
    }

    #[test]
    fn filename_follows_event_kind_date_pattern() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
        assert_eq!(
            export_filename(Uuid::from_u128(1), ExportKind::Summary, date),
            format!("event_{}_summary_2024-03-09.csv", Uuid::from_u128(1))
        );
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn summary_excludes_refunded_tickets() {
        let tickets = vec![
            ticket(1, TicketStatus::Valid),
            ticket(2, TicketStatus::Refunded),
        ];
        let settlement = settle(&tickets, &FeeSchedule::default());
        let csv = summary_csv(&event(), &tickets, &settlement);

        assert!(csv.starts_with("metric,value\n"));
        assert!(csv.contains("title,\"Jazz, Rum & Kreyol\"\n"));
        assert!(csv.contains("tickets_sold,1\n"));
        assert!(csv.contains("gross,100.00\n"));
        assert!(csv.contains("organizer_net,86.80\n"));
    }

    #[test]
    fn financials_list_allocations_then_unsettled_tickets() {
        let tickets = vec![
            ticket(1, TicketStatus::Valid),
            ticket(2, TicketStatus::Refunded),
        ];
        let settlement = settle(&tickets, &FeeSchedule::default());
        let csv = financials_csv(&tickets, &settlement, &HashMap::new());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ticket_id,payment_id,purchased_at"));
        assert!(lines[1].ends_with(",USD,100.00,10.00,3.20,86.80,valid"));
        assert!(lines[2].ends_with(",USD,0.00,0.00,0.00,0.00,refunded"));
    }

    #[test]
    fn export_kind_parses_query_values() {
        assert_eq!("Summary".parse::<ExportKind>().unwrap(), ExportKind::Summary);
        assert_eq!("financials".parse::<ExportKind>().unwrap(), ExportKind::Financials);
        assert!("xlsx".parse::<ExportKind>().is_err());
    }
}
