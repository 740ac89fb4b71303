use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use backend_domain::ports::NotificationService;
use backend_domain::{format_minor, PayoutNotice, TicketNotice};

pub struct RelayNotificationService {
    client: Client,
    relay_url: Option<String>,
    relay_token: Option<String>,
}

impl RelayNotificationService {
    pub fn new(
        relay_url: Option<String>,
        relay_token: Option<String>,
        request_timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_seconds.max(3)))
            .build()?;
        Ok(Self {
            client,
            relay_url,
            relay_token,
        })
    }

    fn dispatch(&self, kind: &'static str, payload: Value) {
        let Some(url) = self.relay_url.clone() else {
            debug!(kind, "notification relay not configured, skipping");
            return;
        };
        let client = self.client.clone();
        let token = self.relay_token.clone();
        tokio::spawn(async move {
            if let Err(err) = post_notice(&client, &url, token.as_deref(), &payload).await {
                warn!(kind, "notification relay failed: {}", err);
            }
        });
    }
}

impl NotificationService for RelayNotificationService {
    fn spawn_ticket_confirmation(&self, notice: TicketNotice) {
        if !(notice.channels.email || notice.channels.whatsapp || notice.channels.push) {
            debug!(email = %notice.attendee_email, "attendee opted out of notifications");
            return;
        }
        self.dispatch("ticket_confirmation", ticket_payload(&notice));
    }

    fn spawn_payout_update(&self, notice: PayoutNotice) {
        self.dispatch("payout_update", payout_payload(&notice));
    }
}

async fn post_notice(client: &Client, url: &str, token: Option<&str>, payload: &Value) -> Result<()> {
    let mut request = client.post(url).json(payload);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await?.error_for_status()?;
    Ok(())
}

fn ticket_payload(notice: &TicketNotice) -> Value {
    let mut channels = Vec::new();
    if notice.channels.email {
        channels.push(json!({ "type": "email", "to": notice.attendee_email }));
    }
    if notice.channels.whatsapp {
        if let Some(phone) = &notice.phone {
            channels.push(json!({ "type": "whatsapp", "to": phone }));
        }
    }
    if notice.channels.push && !notice.push_tokens.is_empty() {
        channels.push(json!({ "type": "push", "tokens": notice.push_tokens }));
    }
    let greeting = notice
        .attendee_name
        .as_deref()
        .unwrap_or("there");
    json!({
        "kind": "ticket_confirmation",
        "channels": channels,
        "subject": format!("Your tickets for {}", notice.event_title),
        "message": format!(
            "Hi {greeting}, you have {} ticket(s) for {} at {} on {}.",
            notice.ticket_ids.len(),
            notice.event_title,
            notice.venue,
            notice.starts_at.format("%Y-%m-%d %H:%M UTC"),
        ),
        "tickets": notice
            .ticket_ids
            .iter()
            .zip(notice.qr_payloads.iter())
            .map(|(id, qr)| json!({ "id": id, "qr": qr }))
            .collect::<Vec<_>>(),
    })
}

fn payout_payload(notice: &PayoutNotice) -> Value {
    let mut message = format!(
        "Payout {} of {} {} is now {}.",
        notice.payout_id,
        format_minor(notice.amount),
        notice.currency.as_str(),
        notice.status.as_str(),
    );
    if let Some(note) = &notice.note {
        message.push(' ');
        message.push_str(note);
    }
    json!({
        "kind": "payout_update",
        "channels": [{ "type": "email", "to": notice.organizer_email }],
        "subject": "Payout update",
        "message": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::{Currency, NotificationPrefs, PayoutStatus};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn notice(channels: NotificationPrefs) -> TicketNotice {
        TicketNotice {
            attendee_email: "fan@example.com".to_string(),
            attendee_name: Some("Mika".to_string()),
            phone: Some("+50937000000".to_string()),
            push_tokens: vec![],
            channels,
            event_title: "Kanaval".to_string(),
            starts_at: Utc.with_ymd_and_hms(2026, 2, 16, 20, 0, 0).unwrap(),
            venue: "Champ de Mars".to_string(),
            ticket_ids: vec![Uuid::nil()],
            qr_payloads: vec!["qr-1".to_string()],
        }
    }

    #[test]
    fn ticket_payload_follows_channel_preferences() {
        let payload = ticket_payload(&notice(NotificationPrefs {
            email: true,
            whatsapp: true,
            push: true,
        }));
        let channels = payload["channels"].as_array().expect("channels");
        // push is skipped without tokens
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1]["to"], "+50937000000");
        assert_eq!(payload["tickets"][0]["qr"], "qr-1");
        assert!(payload["message"]
            .as_str()
            .expect("message")
            .contains("2026-02-16 20:00 UTC"));
    }

    #[test]
    fn payout_payload_includes_note() {
        let payload = payout_payload(&PayoutNotice {
            organizer_email: "org@example.com".to_string(),
            payout_id: Uuid::nil(),
            amount: 125_050,
            currency: Currency::Htg,
            status: PayoutStatus::Declined,
            note: Some("Missing bank details".to_string()),
        });
        let message = payload["message"].as_str().expect("message");
        assert!(message.contains("1250.50 HTG"));
        assert!(message.ends_with("Missing bank details"));
    }
}
