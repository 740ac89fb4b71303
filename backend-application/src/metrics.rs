use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    webhooks_received: AtomicU64,
    webhook_failures: AtomicU64,
    tickets_issued: AtomicU64,
    side_effect_failures: AtomicU64,
    checkouts_started: AtomicU64,
}

impl Metrics {
    pub fn record_webhook(&self) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_webhook_failure(&self) {
        self.webhook_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tickets_issued(&self, count: usize) {
        self.tickets_issued.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_side_effect_failure(&self) {
        self.side_effect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checkout(&self) {
        self.checkouts_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tickets_issued(&self) -> u64 {
        self.tickets_issued.load(Ordering::Relaxed)
    }

    pub fn side_effect_failures(&self) -> u64 {
        self.side_effect_failures.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let received = self.webhooks_received.load(Ordering::Relaxed);
        let failures = self.webhook_failures.load(Ordering::Relaxed);
        let issued = self.tickets_issued.load(Ordering::Relaxed);
        let side_effects = self.side_effect_failures.load(Ordering::Relaxed);
        let checkouts = self.checkouts_started.load(Ordering::Relaxed);

        format!(
            "# TYPE eventhaiti_webhooks_received_total counter\n\
eventhaiti_webhooks_received_total {}\n\
# TYPE eventhaiti_webhook_failures_total counter\n\
eventhaiti_webhook_failures_total {}\n\
# TYPE eventhaiti_tickets_issued_total counter\n\
eventhaiti_tickets_issued_total {}\n\
# TYPE eventhaiti_side_effect_failures_total counter\n\
eventhaiti_side_effect_failures_total {}\n\
# TYPE eventhaiti_checkouts_started_total counter\n\
eventhaiti_checkouts_started_total {}\n",
            received, failures, issued, side_effects, checkouts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_counters_in_prometheus_text_format() {
        let metrics = Metrics::default();
        metrics.record_webhook();
        metrics.record_tickets_issued(3);
        let text = metrics.render_prometheus();
        assert!(text.contains("eventhaiti_webhooks_received_total 1\n"));
        assert!(text.contains("eventhaiti_tickets_issued_total 3\n"));
        assert!(text.contains("eventhaiti_webhook_failures_total 0\n"));
    }
}
