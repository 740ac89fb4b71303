use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use backend_application::{AppState, Metrics};
use backend_domain::ports::AnalyticsMirror;
use backend_infrastructure::{
    AppConfig, ClickhouseMirror, DefaultHealthService, DisabledMirror, HttpFxRateProvider,
    MonCashGateway, PgStore, RelayNotificationService, StripeGateway,
};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();

        let store = Arc::new(PgStore::connect(&db_config).await?);
        store.migrate().await?;

        let analytics: Arc<dyn AnalyticsMirror> = match ClickhouseMirror::from_config(&db_config) {
            Some(mirror) => {
                // sales are still recorded in postgres when the mirror is down
                if let Err(err) = mirror.ensure_schema().await {
                    warn!("clickhouse schema setup failed: {}", err);
                }
                Arc::new(mirror)
            }
            None => {
                info!("clickhouse_url not set, analytics mirror disabled");
                Arc::new(DisabledMirror)
            }
        };

        let timeout = config.request_timeout_seconds;
        let card_gateway = Arc::new(StripeGateway::new(config.to_stripe_config())?);
        let mobile_money_gateway = Arc::new(MonCashGateway::new(config.to_moncash_config())?);
        let fx_provider = Arc::new(HttpFxRateProvider::new(config.fx_rate_url.clone(), timeout)?);
        let notification_service = Arc::new(RelayNotificationService::new(
            config.notify_relay_url.clone(),
            config.notify_relay_token.clone(),
            timeout,
        )?);
        let health_service = Arc::new(DefaultHealthService::new(store.clone(), analytics.clone()));

        let state = AppState {
            config: runtime_config,
            user_repo: store.clone(),
            event_repo: store.clone(),
            ticket_repo: store.clone(),
            payout_repo: store.clone(),
            promo_repo: store.clone(),
            pending_repo: store.clone(),
            suspicious_repo: store.clone(),
            earnings_repo: store.clone(),
            receipt_repo: store,
            card_gateway,
            mobile_money_gateway,
            fx_provider,
            notification_service,
            analytics_mirror: analytics,
            health_service,
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self { state })
    }
}
