// Card processor client: checkout sessions and signed webhook deliveries

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use backend_domain::{
    verify_hmac_sha256, CardCheckoutRequest, CardCheckoutSession, CardGateway, CardWebhookEvent,
    CardWebhookKind, Currency, RawPurchaseMetadata,
};

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub tolerance_seconds: i64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature timestamp outside tolerance ({age}s)")]
    Stale { age: i64 },
    #[error("no matching signature")]
    Mismatch,
}

// Checks a `t=<unix>,v1=<hex>[,v1=<hex>]` header against `<t>.<payload>`.
pub fn verify_signature(
    secret: &str,
    payload: &str,
    header: &str,
    now_unix: i64,
    tolerance_seconds: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    let age = now_unix - timestamp;
    if age.abs() > tolerance_seconds {
        return Err(SignatureError::Stale { age });
    }
    let signed = format!("{timestamp}.{payload}");
    if signatures
        .iter()
        .any(|signature| verify_hmac_sha256(secret, &signed, signature))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: RawPurchaseMetadata,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    #[serde(default)]
    amount_received: Option<i64>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    metadata: RawPurchaseMetadata,
}

pub fn parse_webhook_event(payload: &str) -> Result<CardWebhookEvent> {
    let envelope: WebhookEnvelope =
        serde_json::from_str(payload).context("webhook body is not a valid event")?;
    match envelope.kind.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = serde_json::from_value(envelope.data.object)?;
            let paid = matches!(
                session.payment_status.as_deref(),
                Some("paid") | Some("no_payment_required")
            );
            Ok(CardWebhookEvent {
                id: envelope.id,
                kind: CardWebhookKind::CheckoutCompleted,
                payment_id: session.payment_intent.unwrap_or(session.id),
                amount: session.amount_total.unwrap_or(0),
                currency: parse_currency(session.currency.as_deref()),
                paid,
                metadata: session.metadata,
            })
        }
        "payment_intent.succeeded" => {
            let intent: PaymentIntentObject = serde_json::from_value(envelope.data.object)?;
            Ok(CardWebhookEvent {
                id: envelope.id,
                kind: CardWebhookKind::PaymentSucceeded,
                payment_id: intent.id,
                amount: intent.amount_received.or(intent.amount).unwrap_or(0),
                currency: parse_currency(intent.currency.as_deref()),
                paid: intent.status.as_deref() == Some("succeeded"),
                metadata: intent.metadata,
            })
        }
        other => Ok(CardWebhookEvent {
            id: envelope.id,
            kind: CardWebhookKind::Ignored(other.to_string()),
            payment_id: String::new(),
            amount: 0,
            currency: None,
            paid: false,
            metadata: RawPurchaseMetadata::default(),
        }),
    }
}

fn parse_currency(raw: Option<&str>) -> Option<Currency> {
    let raw = raw?;
    match raw.parse() {
        Ok(currency) => Some(currency),
        Err(_) => {
            warn!(currency = raw, "webhook carries an unsupported currency");
            None
        }
    }
}

// Form fields for the checkout session API. Metadata is copied onto the
// payment intent too so either webhook carries the purchase.
fn checkout_form(request: &CardCheckoutRequest) -> Result<Vec<(String, String)>> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.as_str().to_lowercase(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            format!("{} ({} tickets)", request.event_title, request.quantity),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.total.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    let metadata = serde_json::to_value(&request.metadata)?;
    if let Value::Object(fields) = metadata {
        for (key, value) in fields {
            if let Value::String(value) = value {
                form.push((format!("metadata[{key}]"), value.clone()));
                form.push((format!("payment_intent_data[metadata][{key}]"), value));
            }
        }
    }
    Ok(form)
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CardGateway for StripeGateway {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> Result<CardWebhookEvent> {
        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .ok_or(SignatureError::NotConfigured)?;
        let payload = std::str::from_utf8(payload).context("webhook body is not utf-8")?;
        verify_signature(
            secret,
            payload,
            signature_header,
            now_unix,
            self.config.tolerance_seconds,
        )?;
        parse_webhook_event(payload)
    }

    async fn create_checkout_session(
        &self,
        request: &CardCheckoutRequest,
    ) -> Result<CardCheckoutSession> {
        let secret_key = self
            .config
            .secret_key
            .as_deref()
            .ok_or_else(|| anyhow!("stripe secret key is not configured"))?;
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(secret_key)
            .form(&checkout_form(request)?)
            .send()
            .await?
            .error_for_status()?;
        let session: SessionResponse = response.json().await?;
        let url = session
            .url
            .ok_or_else(|| anyhow!("checkout session {} has no url", session.id))?;
        Ok(CardCheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::sign_hmac_sha256;

    const SECRET: &str = "whsec_test";

    fn header(payload: &str, timestamp: i64) -> String {
        let signature = sign_hmac_sha256(SECRET, &format!("{timestamp}.{payload}")).expect("sign");
        format!("t={timestamp},v1={signature}")
    }

    #[test]
    fn valid_signature_within_tolerance_is_accepted() {
        let payload = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        assert_eq!(
            verify_signature(SECRET, payload, &header(payload, now - 10), now, 300),
            Ok(())
        );
    }

    #[test]
    fn stale_tampered_or_malformed_signatures_are_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        assert_eq!(
            verify_signature(SECRET, payload, &header(payload, now - 301), now, 300),
            Err(SignatureError::Stale { age: 301 })
        );
        assert_eq!(
            verify_signature(SECRET, r#"{"id":"evt_2"}"#, &header(payload, now), now, 300),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(SECRET, payload, "v1=abc", now, 300),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn checkout_completed_prefers_payment_intent_id() {
        let payload = r#"{
            "id": "evt_9",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_1",
                "payment_intent": "pi_123",
                "amount_total": 5000,
                "currency": "usd",
                "payment_status": "paid",
                "metadata": {"eventId": "e1", "userId": "u1", "quantity": "2"}
            }}
        }"#;
        let event = parse_webhook_event(payload).expect("event");
        assert_eq!(event.kind, CardWebhookKind::CheckoutCompleted);
        assert_eq!(event.payment_id, "pi_123");
        assert_eq!(event.amount, 5000);
        assert_eq!(event.currency, Some(Currency::Usd));
        assert!(event.paid);
        assert_eq!(event.metadata.event_id.as_deref(), Some("e1"));
        assert_eq!(event.metadata.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn unpaid_sessions_and_other_types_are_flagged() {
        let unpaid = r#"{"id":"evt_3","type":"checkout.session.completed",
            "data":{"object":{"id":"cs_2","payment_status":"unpaid"}}}"#;
        let event = parse_webhook_event(unpaid).expect("event");
        assert!(!event.paid);
        assert_eq!(event.payment_id, "cs_2");

        let other = r#"{"id":"evt_4","type":"charge.refunded","data":{"object":{}}}"#;
        let event = parse_webhook_event(other).expect("event");
        assert_eq!(event.kind, CardWebhookKind::Ignored("charge.refunded".to_string()));
    }

    #[test]
    fn checkout_form_copies_metadata_to_the_intent() {
        let request = CardCheckoutRequest {
            event_title: "Kanaval".to_string(),
            currency: Currency::Usd,
            total: 4500,
            quantity: 3,
            customer_email: None,
            success_url: "https://eventhaiti.test/ok".to_string(),
            cancel_url: "https://eventhaiti.test/no".to_string(),
            metadata: RawPurchaseMetadata {
                event_id: Some("e1".to_string()),
                ..RawPurchaseMetadata::default()
            },
        };
        let form = checkout_form(&request).expect("form");
        let has = |key: &str, value: &str| form.iter().any(|(k, v)| k == key && v == value);
        assert!(has("line_items[0][price_data][currency]", "usd"));
        assert!(has("line_items[0][price_data][unit_amount]", "4500"));
        assert!(has("metadata[event_id]", "e1"));
        assert!(has("payment_intent_data[metadata][event_id]", "e1"));
        assert!(!form.iter().any(|(k, _)| k == "metadata[tier_id]"));
    }
}
