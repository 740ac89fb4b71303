use std::future::Future;

use backend_domain::{SuspiciousActivity, SuspiciousActivityQuery};
use serde::Serialize;
use tracing::warn;

use crate::{AppError, AppState, Principal};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Default, Serialize)]
pub struct PlatformOverview {
    pub users: u64,
    pub events: u64,
    pub tickets: u64,
    pub pending_payouts: u64,
    pub unreviewed_activities: u64,
}

async fn count_or_zero(name: &str, count: impl Future<Output = anyhow::Result<u64>>) -> u64 {
    match count.await {
        Ok(value) => value,
        Err(err) => {
            warn!(counter = name, "overview count failed: {err:#}");
            0
        }
    }
}

// Platform-wide counters. A failing count reads as zero.
pub async fn platform_overview(
    state: &AppState,
    principal: &Principal,
) -> Result<PlatformOverview, AppError> {
    principal.require_admin()?;
    Ok(PlatformOverview {
        users: count_or_zero("users", state.user_repo.count_users()).await,
        events: count_or_zero("events", state.event_repo.count_events()).await,
        tickets: count_or_zero("tickets", state.ticket_repo.count_tickets()).await,
        pending_payouts: count_or_zero("pending_payouts", state.payout_repo.count_pending()).await,
        unreviewed_activities: count_or_zero(
            "unreviewed_activities",
            state.suspicious_repo.count_unreviewed(),
        )
        .await,
    })
}

pub async fn list_suspicious(
    state: &AppState,
    principal: &Principal,
    query: SuspiciousActivityQuery,
) -> Result<Vec<SuspiciousActivity>, AppError> {
    principal.require_admin()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(state
        .suspicious_repo
        .list_activities(query.reviewed, limit)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, MemoryStore};
    use backend_domain::{Currency, PayoutStatus, Role, Severity};
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn admin(store: &MemoryStore) -> Principal {
        Principal {
            user: store.seed_user("admin@eventhaiti.test", Role::Attendee),
            is_admin: true,
        }
    }

    #[tokio::test]
    async fn overview_counts_platform_rows() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let principal = admin(&store);
        store.seed_event(principal.id(), Currency::Htg, 1000, 10);
        store.seed_payout(Uuid::new_v4(), 6000, PayoutStatus::Pending);
        store.seed_payout(Uuid::new_v4(), 6000, PayoutStatus::Completed);

        let overview = platform_overview(&state, &principal).await.expect("overview");
        assert_eq!(overview.users, 1);
        assert_eq!(overview.events, 1);
        assert_eq!(overview.pending_payouts, 1);
        assert_eq!(overview.tickets, 0);
    }

    #[tokio::test]
    async fn failing_counts_read_as_zero() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let principal = admin(&store);
        store.seed_event(principal.id(), Currency::Htg, 1000, 10);
        store.fail_counts.store(true, Ordering::Relaxed);

        let overview = platform_overview(&state, &principal).await.expect("overview");
        assert_eq!(overview.users, 0);
        assert_eq!(overview.events, 0);
    }

    #[tokio::test]
    async fn suspicious_list_filters_by_review_state() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let principal = admin(&store);
        let mut reviewed = SuspiciousActivity::new(
            Uuid::new_v4(),
            "duplicate_check_in",
            Severity::Medium,
            "scanned twice".to_string(),
        );
        reviewed.reviewed = true;
        store.activities.lock().expect("lock").push(reviewed);
        store.activities.lock().expect("lock").push(SuspiciousActivity::new(
            Uuid::new_v4(),
            "payment_amount_mismatch",
            Severity::High,
            "short".to_string(),
        ));

        let open = list_suspicious(
            &state,
            &principal,
            SuspiciousActivityQuery { reviewed: Some(false), limit: None },
        )
        .await
        .expect("list");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].kind, "payment_amount_mismatch");

        let outsider = Principal {
            user: store.seed_user("fan@example.com", Role::Attendee),
            is_admin: false,
        };
        assert!(matches!(
            list_suspicious(&state, &outsider, SuspiciousActivityQuery { reviewed: None, limit: None }).await,
            Err(AppError::Forbidden)
        ));
    }
}
