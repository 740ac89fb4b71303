use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use backend_domain::FxRateProvider;

// Accepts `{"rates":{"HTG":..}}` (USD-based rate tables) or a bare `{"rate":..}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateBody {
    Table { rates: HashMap<String, Decimal> },
    Single { rate: Decimal },
}

fn extract_htg(body: RateBody) -> Result<Decimal> {
    let rate = match body {
        RateBody::Table { rates } => rates
            .get("HTG")
            .copied()
            .ok_or_else(|| anyhow!("rate table has no HTG entry"))?,
        RateBody::Single { rate } => rate,
    };
    if rate <= Decimal::ZERO {
        bail!("non-positive usd/htg rate {rate}");
    }
    Ok(rate)
}

pub struct HttpFxRateProvider {
    client: Client,
    url: Option<String>,
}

impl HttpFxRateProvider {
    pub fn new(url: Option<String>, request_timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_seconds.max(3)))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl FxRateProvider for HttpFxRateProvider {
    async fn usd_to_htg(&self) -> Result<Decimal> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("fx_rate_url not configured"))?;
        let body: RateBody = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        extract_htg(body)
    }
}
