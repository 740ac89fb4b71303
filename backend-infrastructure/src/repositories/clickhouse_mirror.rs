// Analytics mirror: one row per issued purchase in ClickHouse

use anyhow::Result;
use async_trait::async_trait;
use clickhouse::{Client, Row};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use backend_domain::{AnalyticsMirror, DbConfig, SaleRecord};

use crate::utils::chrono_to_offset;

#[derive(Debug, Clone, Serialize, Row)]
pub struct SaleRow {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub purchased_at: OffsetDateTime,
    pub payment_id: String,
    pub event_id: String,
    pub organizer_id: String,
    pub attendee_id: String,
    pub payment_method: String,
    pub currency: String,
    pub quantity: u32,
    pub gross: i64,
    pub net: i64,
}

impl From<&SaleRecord> for SaleRow {
    fn from(sale: &SaleRecord) -> Self {
        Self {
            purchased_at: chrono_to_offset(sale.purchased_at),
            payment_id: sale.payment_id.clone(),
            event_id: sale.event_id.to_string(),
            organizer_id: sale.organizer_id.to_string(),
            attendee_id: sale.attendee_id.to_string(),
            payment_method: sale.payment_method.as_str().to_string(),
            currency: sale.currency.as_str().to_string(),
            quantity: sale.quantity,
            gross: sale.gross,
            net: sale.net,
        }
    }
}

#[derive(Clone)]
pub struct ClickhouseMirror {
    client: Client,
    database: String,
}

impl ClickhouseMirror {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn from_config(config: &DbConfig) -> Option<Self> {
        let url = config.clickhouse_url.as_ref()?;
        let mut client = Client::default()
            .with_url(url)
            .with_database(&config.clickhouse_database);
        if let Some(user) = &config.clickhouse_user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.clickhouse_password {
            client = client.with_password(password);
        }
        Some(Self::new(client, config.clickhouse_database.clone()))
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client.query(&create_db).execute().await?;

        let create_sales = r#"
CREATE TABLE IF NOT EXISTS ticket_sales (
    purchased_at DateTime64(3),
    payment_id String,
    event_id String,
    organizer_id String,
    attendee_id String,
    payment_method LowCardinality(String),
    currency LowCardinality(String),
    quantity UInt32,
    gross Int64,
    net Int64
) ENGINE = ReplacingMergeTree
PARTITION BY toYYYYMM(purchased_at)
ORDER BY (organizer_id, event_id, payment_id)
"#;
        self.client.query(create_sales).execute().await?;
        info!(database = %self.database, "analytics schema ready");
        Ok(())
    }
}

#[async_trait]
impl AnalyticsMirror for ClickhouseMirror {
    async fn mirror_sale(&self, sale: &SaleRecord) -> Result<()> {
        let mut insert = self.client.insert("ticket_sales")?;
        insert.write(&SaleRow::from(sale)).await?;
        insert.end().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT toUInt8(1)").fetch_one().await?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMirror;

#[async_trait]
impl AnalyticsMirror for DisabledMirror {
    async fn mirror_sale(&self, _sale: &SaleRecord) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::{Currency, PaymentMethod};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn sale_row_flattens_identifiers() {
        let sale = SaleRecord {
            payment_id: "moncash_991".to_string(),
            event_id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            attendee_id: Uuid::new_v4(),
            payment_method: PaymentMethod::MobileMoney,
            currency: Currency::Htg,
            quantity: 3,
            gross: 300_000,
            net: 270_000,
            purchased_at: Utc::now(),
        };
        let row = SaleRow::from(&sale);
        assert_eq!(row.event_id, sale.event_id.to_string());
        assert_eq!(row.currency, "HTG");
        assert_eq!(row.payment_method, "mobile_money");
    }

    #[test]
    fn mirror_is_disabled_without_url() {
        let config = DbConfig {
            database_url: "postgres://localhost/eventhaiti".to_string(),
            database_max_connections: 5,
            clickhouse_url: None,
            clickhouse_database: "eventhaiti".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
        };
        assert!(ClickhouseMirror::from_config(&config).is_none());
    }
}
