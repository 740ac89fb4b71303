use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use backend_application::commands::issuance_commands::{self, WebhookAck};
use backend_application::AppState;

use crate::error::HttpError;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn card_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, HttpError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| HttpError::BadRequest("missing signature header".to_string()))?;
    let ack = issuance_commands::handle_card_webhook(&state, &body, signature).await?;
    Ok(Json(ack))
}
