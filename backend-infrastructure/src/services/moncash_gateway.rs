// Mobile-money gateway client (OAuth client credentials + payment lookups)

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use backend_domain::{CheckoutRedirect, MobileMoneyGateway, MobileMoneyPayment};

use crate::utils::{major_to_minor, minor_to_major};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MonCashConfig {
    pub base_url: String,
    pub gateway_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub form_post_url: Option<String>,
    pub business_key: Option<String>,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    59
}

#[derive(Debug, Deserialize)]
struct CreatePaymentResponse {
    payment_token: PaymentToken,
}

#[derive(Debug, Deserialize)]
struct PaymentToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    payment: Option<PaymentBody>,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    reference: String,
    transaction_id: String,
    cost: Decimal,
    message: String,
    #[serde(default)]
    payer: Option<String>,
}

impl PaymentBody {
    fn into_payment(self) -> Result<MobileMoneyPayment> {
        let amount = major_to_minor(self.cost)
            .ok_or_else(|| anyhow!("payment cost {} out of range", self.cost))?;
        Ok(MobileMoneyPayment {
            transaction_id: self.transaction_id,
            order_id: self.reference,
            amount,
            successful: self.message.trim().eq_ignore_ascii_case("successful"),
            payer: self.payer,
        })
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct MonCashGateway {
    client: Client,
    config: MonCashConfig,
    token: Mutex<Option<CachedToken>>,
}

impl MonCashGateway {
    pub fn new(config: MonCashConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
            .build()?;
        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| anyhow!("mobile money client id is not configured"))?;
        let response: TokenResponse = self
            .client
            .post(format!("{}/oauth/token", self.config.base_url))
            .basic_auth(client_id, self.config.client_secret.as_deref())
            .header("Accept", "application/json")
            .form(&[("scope", "read,write"), ("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(expires_in = response.expires_in, "mobile money token refreshed");
        let value = response.access_token.clone();
        *cached = Some(CachedToken {
            value: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(value)
    }

    async fn retrieve(&self, path: &str, body: serde_json::Value) -> Result<Option<MobileMoneyPayment>> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(format!("{}/v1/{}", self.config.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let parsed: RetrieveResponse = response.error_for_status()?.json().await?;
        parsed.payment.map(PaymentBody::into_payment).transpose()
    }

    fn form_post_action(&self) -> String {
        self.config
            .form_post_url
            .clone()
            .unwrap_or_else(|| format!("{}/Payment/Button", self.config.gateway_url))
    }
}

#[async_trait]
impl MobileMoneyGateway for MonCashGateway {
    async fn create_payment(&self, order_id: &str, amount: i64) -> Result<String> {
        let token = self.access_token().await?;
        let amount_major = minor_to_major(amount)
            .to_f64()
            .ok_or_else(|| anyhow!("amount {} out of range", amount))?;
        let response: CreatePaymentResponse = self
            .client
            .post(format!("{}/v1/CreatePayment", self.config.base_url))
            .bearer_auth(token)
            .json(&json!({ "amount": amount_major, "orderId": order_id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.payment_token.token)
    }

    fn redirect_for_token(&self, token: &str) -> CheckoutRedirect {
        CheckoutRedirect::Redirect {
            url: format!(
                "{}/Payment/Redirect?token={}",
                self.config.gateway_url,
                urlencoding::encode(token)
            ),
        }
    }

    fn form_post_fallback(&self, order_id: &str, amount: i64) -> CheckoutRedirect {
        let mut fields = vec![
            ("amount".to_string(), minor_to_major(amount).to_string()),
            ("orderId".to_string(), order_id.to_string()),
        ];
        match &self.config.business_key {
            Some(key) => fields.push(("businessKey".to_string(), key.clone())),
            None => warn!(order_id, "form post checkout without a business key"),
        }
        CheckoutRedirect::FormPost {
            action: self.form_post_action(),
            fields,
        }
    }

    async fn retrieve_by_transaction(&self, transaction_id: &str) -> Result<Option<MobileMoneyPayment>> {
        self.retrieve(
            "RetrieveTransactionPayment",
            json!({ "transactionId": transaction_id }),
        )
        .await
    }

    async fn retrieve_by_order(&self, order_id: &str) -> Result<Option<MobileMoneyPayment>> {
        self.retrieve("RetrieveOrderPayment", json!({ "orderId": order_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(business_key: Option<&str>) -> MonCashGateway {
        MonCashGateway::new(MonCashConfig {
            base_url: "https://moncash.test/Api".to_string(),
            gateway_url: "https://moncash.test/Moncash-middleware".to_string(),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            form_post_url: None,
            business_key: business_key.map(ToString::to_string),
            request_timeout_seconds: 5,
        })
        .expect("gateway")
    }

    #[test]
    fn lookup_body_maps_to_minor_units() {
        let body: RetrieveResponse = serde_json::from_str(
            r#"{"payment":{"reference":"EHABC","transaction_id":"2154","cost":650.05,
                "message":"successful","payer":"50937000000"},"status":200}"#,
        )
        .expect("json");
        let payment = body.payment.expect("payment").into_payment().expect("payment");
        assert_eq!(payment.amount, 65005);
        assert_eq!(payment.order_id, "EHABC");
        assert!(payment.successful);
    }

    #[test]
    fn redirect_url_encodes_the_token() {
        match gateway(None).redirect_for_token("a+b/c") {
            CheckoutRedirect::Redirect { url } => assert_eq!(
                url,
                "https://moncash.test/Moncash-middleware/Payment/Redirect?token=a%2Bb%2Fc"
            ),
            other => panic!("unexpected redirect {other:?}"),
        }
    }

    #[test]
    fn form_post_carries_major_amount_and_business_key() {
        match gateway(Some("bk-1")).form_post_fallback("EH1", 150_000) {
            CheckoutRedirect::FormPost { action, fields } => {
                assert_eq!(action, "https://moncash.test/Moncash-middleware/Payment/Button");
                assert!(fields.contains(&("amount".to_string(), "1500.00".to_string())));
                assert!(fields.contains(&("businessKey".to_string(), "bk-1".to_string())));
            }
            other => panic!("unexpected redirect {other:?}"),
        }
    }
}
