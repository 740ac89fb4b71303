use std::collections::HashMap;

use backend_domain::{
    export_filename, financials_csv, settle, summary_csv, CsvExport, Currency, ExportKind,
    Settlement,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::commands::event_commands::load_event;
use crate::{AppError, AppState, Principal};

#[derive(Debug, Serialize)]
pub struct EventFinancials {
    pub event_id: Uuid,
    pub currency: Currency,
    pub settlement: Settlement,
}

pub async fn event_financials(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
) -> Result<EventFinancials, AppError> {
    let event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;
    let tickets = state.ticket_repo.list_by_event(event_id).await?;
    Ok(EventFinancials {
        event_id,
        currency: event.currency,
        settlement: settle(&tickets, &state.config.fees),
    })
}

pub async fn export_event(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
    kind: ExportKind,
) -> Result<CsvExport, AppError> {
    let event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;
    let tickets = state.ticket_repo.list_by_event(event_id).await?;
    let settlement = settle(&tickets, &state.config.fees);

    let body = match kind {
        ExportKind::Summary => summary_csv(&event, &tickets, &settlement),
        ExportKind::Financials => {
            let tier_names: HashMap<Uuid, String> = state
                .event_repo
                .list_tiers(event_id)
                .await?
                .into_iter()
                .map(|tier| (tier.id, tier.name))
                .collect();
            financials_csv(&tickets, &settlement, &tier_names)
        }
    };
    info!(
        event_id = %event_id,
        kind = kind.as_str(),
        rows = tickets.len(),
        "financial export generated"
    );
    Ok(CsvExport {
        filename: export_filename(event_id, kind, Utc::now().date_naive()),
        body,
    })
}
