use std::collections::BTreeMap;

use backend_domain::{Currency, EarningsBalance};
use tracing::error;
use uuid::Uuid;

use crate::{AppError, AppState, Principal};

pub async fn earnings_for_organizer(
    state: &AppState,
    organizer_id: Uuid,
) -> Result<Vec<EarningsBalance>, AppError> {
    let rows = state
        .earnings_repo
        .list_for_organizer(organizer_id)
        .await
        .map_err(|err| {
            error!(organizer_id = %organizer_id, "failed to load earnings: {err:#}");
            AppError::Internal(err)
        })?;
    let payouts = state.payout_repo.list_by_organizer(organizer_id).await?;

    let mut committed: BTreeMap<Currency, i64> = BTreeMap::new();
    for payout in payouts.iter().filter(|p| p.status.holds_funds()) {
        *committed.entry(payout.currency).or_default() += payout.amount;
    }

    let mut balances: Vec<EarningsBalance> = rows
        .into_iter()
        .map(|row| {
            let committed_payouts = committed.remove(&row.currency).unwrap_or(0);
            EarningsBalance {
                currency: row.currency,
                gross: row.gross,
                platform_fees: row.platform_fees,
                processing_fees: row.processing_fees,
                net: row.net,
                tickets_sold: row.tickets_sold,
                committed_payouts,
                available: row.net - committed_payouts,
            }
        })
        .collect();
    // payouts in a currency with no earnings row still count against it
    for (currency, amount) in committed {
        balances.push(EarningsBalance {
            currency,
            gross: 0,
            platform_fees: 0,
            processing_fees: 0,
            net: 0,
            tickets_sold: 0,
            committed_payouts: amount,
            available: -amount,
        });
    }
    balances.sort_by_key(|balance| balance.currency);
    Ok(balances)
}

pub async fn my_earnings(
    state: &AppState,
    principal: &Principal,
) -> Result<Vec<EarningsBalance>, AppError> {
    principal.require_organizer()?;
    earnings_for_organizer(state, principal.id()).await
}

pub async fn available_balance(
    state: &AppState,
    organizer_id: Uuid,
    currency: Currency,
) -> Result<i64, AppError> {
    let balances = earnings_for_organizer(state, organizer_id).await?;
    Ok(balances
        .iter()
        .find(|balance| balance.currency == currency)
        .map(|balance| balance.available)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, MemoryStore};
    use backend_domain::{PayoutStatus, Role};

    #[tokio::test]
    async fn committed_payouts_reduce_available_balance() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        store.seed_earnings(organizer.id, Currency::Htg, 50_000);
        store.seed_payout(organizer.id, 10_000, PayoutStatus::Pending);
        store.seed_payout(organizer.id, 15_000, PayoutStatus::Completed);
        store.seed_payout(organizer.id, 20_000, PayoutStatus::Failed);

        let balances = earnings_for_organizer(&state, organizer.id).await.expect("balances");
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].committed_payouts, 25_000);
        assert_eq!(balances[0].available, 25_000);
        assert_eq!(
            available_balance(&state, organizer.id, Currency::Usd).await.expect("usd"),
            0
        );
    }
}
