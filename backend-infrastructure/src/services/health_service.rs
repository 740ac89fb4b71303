use std::sync::Arc;

use async_trait::async_trait;
use backend_domain::ports::{AnalyticsMirror, HealthCheckService};
use backend_domain::EventRepository;

pub struct DefaultHealthService {
    event_repo: Arc<dyn EventRepository>,
    analytics: Arc<dyn AnalyticsMirror>,
}

impl DefaultHealthService {
    pub fn new(event_repo: Arc<dyn EventRepository>, analytics: Arc<dyn AnalyticsMirror>) -> Self {
        Self {
            event_repo,
            analytics,
        }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_database(&self) -> anyhow::Result<bool> {
        self.event_repo.ping().await.map(|_| true)
    }

    async fn check_analytics(&self) -> anyhow::Result<bool> {
        self.analytics.ping().await.map(|_| true)
    }
}
