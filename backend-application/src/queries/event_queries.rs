use backend_domain::{Event, EventSearchQuery, TicketTier};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppError, AppState};

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 50;

pub async fn search_events(
    state: &AppState,
    query: EventSearchQuery,
) -> Result<Vec<Event>, AppError> {
    let needle = query.q.unwrap_or_default().trim().to_string();
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(state.event_repo.search_published(&needle, limit).await?)
}

#[derive(Debug, Serialize)]
pub struct EventListing {
    pub event: Event,
    pub tiers: Vec<TicketTier>,
}

pub async fn published_event(state: &AppState, event_id: Uuid) -> Result<EventListing, AppError> {
    let event = state
        .event_repo
        .find_event(event_id)
        .await?
        .filter(|event| event.published)
        .ok_or_else(|| AppError::NotFound(format!("event {event_id}")))?;
    let mut tiers = state.event_repo.list_tiers(event_id).await?;
    tiers.sort_by_key(|tier| tier.price);
    Ok(EventListing { event, tiers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, MemoryStore};
    use backend_domain::Currency;

    #[tokio::test]
    async fn search_only_returns_published_matches() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let published = store.seed_event(Uuid::new_v4(), Currency::Htg, 1000, 10);
        let draft = store.seed_event(Uuid::new_v4(), Currency::Htg, 1000, 10);
        store.events.lock().expect("lock").get_mut(&draft.id).expect("draft").published = false;

        let found = search_events(
            &state,
            EventSearchQuery {
                q: Some("lakay".to_string()),
                limit: Some(500),
            },
        )
        .await
        .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, published.id);

        assert!(published_event(&state, draft.id).await.is_err());
    }
}
