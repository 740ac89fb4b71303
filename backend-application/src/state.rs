use std::sync::Arc;

use backend_domain::ports::{
    AnalyticsMirror, CardGateway, EarningsRepository, EventRepository, FxRateProvider,
    HealthCheckService, MobileMoneyGateway, NotificationService, PayoutRepository,
    PendingTransactionRepository, PromoCodeRepository, SuspiciousActivityRepository,
    TicketRepository, UserRepository, WebhookReceiptRepository,
};
use backend_domain::RuntimeConfig;

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub user_repo: Arc<dyn UserRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub ticket_repo: Arc<dyn TicketRepository>,
    pub payout_repo: Arc<dyn PayoutRepository>,
    pub promo_repo: Arc<dyn PromoCodeRepository>,
    pub pending_repo: Arc<dyn PendingTransactionRepository>,
    pub suspicious_repo: Arc<dyn SuspiciousActivityRepository>,
    pub earnings_repo: Arc<dyn EarningsRepository>,
    pub receipt_repo: Arc<dyn WebhookReceiptRepository>,
    pub card_gateway: Arc<dyn CardGateway>,
    pub mobile_money_gateway: Arc<dyn MobileMoneyGateway>,
    pub fx_provider: Arc<dyn FxRateProvider>,
    pub notification_service: Arc<dyn NotificationService>,
    pub analytics_mirror: Arc<dyn AnalyticsMirror>,
    pub health_service: Arc<dyn HealthCheckService>,
    pub metrics: Arc<Metrics>,
}
