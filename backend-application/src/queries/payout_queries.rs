use std::str::FromStr;

use backend_domain::{Payout, PayoutDetail, PayoutListQuery, PayoutStatus};
use uuid::Uuid;

use crate::{AppError, AppState, Principal};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

pub async fn list_my_payouts(
    state: &AppState,
    principal: &Principal,
) -> Result<Vec<Payout>, AppError> {
    principal.require_organizer()?;
    let mut payouts = state.payout_repo.list_by_organizer(principal.id()).await?;
    payouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(payouts)
}

pub async fn list_payouts(
    state: &AppState,
    principal: &Principal,
    query: PayoutListQuery,
) -> Result<Vec<Payout>, AppError> {
    principal.require_admin()?;
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty() && *raw != "all")
        .map(PayoutStatus::from_str)
        .transpose()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(state.payout_repo.list_by_status(status, limit).await?)
}

pub async fn payout_detail(
    state: &AppState,
    principal: &Principal,
    payout_id: Uuid,
) -> Result<PayoutDetail, AppError> {
    let payout = state
        .payout_repo
        .find_payout(payout_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("payout {payout_id}")))?;
    if !principal.is_admin && payout.organizer_id != principal.id() {
        return Err(AppError::Forbidden);
    }
    let audit = state.payout_repo.list_audit(payout_id).await?;
    Ok(PayoutDetail { payout, audit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, MemoryStore};
    use backend_domain::Role;

    #[tokio::test]
    async fn admin_filters_by_status() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        store.seed_payout(organizer.id, 6_000, PayoutStatus::Pending);
        store.seed_payout(organizer.id, 7_000, PayoutStatus::Completed);
        let admin = Principal {
            user: store.seed_user("admin@eventhaiti.test", Role::Attendee),
            is_admin: true,
        };

        let pending = list_payouts(
            &state,
            &admin,
            PayoutListQuery {
                status: Some("pending".to_string()),
                limit: None,
            },
        )
        .await
        .expect("list");
        assert_eq!(pending.len(), 1);

        let err = list_payouts(
            &state,
            &admin,
            PayoutListQuery {
                status: Some("bogus".to_string()),
                limit: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn detail_is_limited_to_owner_or_admin() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let payout = store.seed_payout(organizer.id, 6_000, PayoutStatus::Pending);
        let stranger = Principal {
            user: store.seed_user("other@example.com", Role::Organizer),
            is_admin: false,
        };
        assert!(matches!(
            payout_detail(&state, &stranger, payout.id).await,
            Err(AppError::Forbidden)
        ));
        let owner = Principal {
            user: organizer,
            is_admin: false,
        };
        let detail = payout_detail(&state, &owner, payout.id).await.expect("detail");
        assert!(detail.audit.is_empty());
    }
}
