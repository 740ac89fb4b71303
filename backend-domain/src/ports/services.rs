use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::entities::{
    CardCheckoutRequest, CardCheckoutSession, CardWebhookEvent, CheckoutRedirect,
    MobileMoneyPayment, PayoutNotice, SaleRecord, TicketNotice,
};

#[async_trait]
pub trait CardGateway: Send + Sync {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> anyhow::Result<CardWebhookEvent>;
    async fn create_checkout_session(
        &self,
        request: &CardCheckoutRequest,
    ) -> anyhow::Result<CardCheckoutSession>;
}

#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    async fn create_payment(&self, order_id: &str, amount: i64) -> anyhow::Result<String>;
    fn redirect_for_token(&self, token: &str) -> CheckoutRedirect;
    fn form_post_fallback(&self, order_id: &str, amount: i64) -> CheckoutRedirect;
    async fn retrieve_by_transaction(
        &self,
        transaction_id: &str,
    ) -> anyhow::Result<Option<MobileMoneyPayment>>;
    async fn retrieve_by_order(&self, order_id: &str)
        -> anyhow::Result<Option<MobileMoneyPayment>>;
}

#[async_trait]
pub trait FxRateProvider: Send + Sync {
    async fn usd_to_htg(&self) -> anyhow::Result<Decimal>;
}

pub trait NotificationService: Send + Sync {
    fn spawn_ticket_confirmation(&self, notice: TicketNotice);
    fn spawn_payout_update(&self, notice: PayoutNotice);
}

#[async_trait]
pub trait AnalyticsMirror: Send + Sync {
    async fn mirror_sale(&self, sale: &SaleRecord) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_database(&self) -> anyhow::Result<bool>;
    async fn check_analytics(&self) -> anyhow::Result<bool>;
}
