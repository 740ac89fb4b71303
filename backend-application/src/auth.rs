// Session verification
// Tokens look like eh1.<user_id>.<expires_unix>.<hex hmac-sha256 of the first three parts>

use backend_domain::{sign_hmac_sha256, verify_hmac_sha256, Event, User};
use tracing::debug;
use uuid::Uuid;

use crate::{AppError, AppState};

const TOKEN_PREFIX: &str = "eh1";

#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub is_admin: bool,
}

impl Principal {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_organizer(&self) -> Result<(), AppError> {
        if self.is_admin || self.user.is_organizer() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_event_access(&self, event: &Event) -> Result<(), AppError> {
        if self.is_admin || event.organizer_id == self.user.id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub fn sign_session_token(secret: &str, user_id: Uuid, expires_unix: i64) -> anyhow::Result<String> {
    let body = format!("{TOKEN_PREFIX}.{user_id}.{expires_unix}");
    let signature = sign_hmac_sha256(secret, &body)?;
    Ok(format!("{body}.{signature}"))
}

pub fn verify_session_token(secret: &str, token: &str, now_unix: i64) -> Result<Uuid, AppError> {
    let token = token.trim();
    let (body, signature) = token.rsplit_once('.').ok_or(AppError::Unauthorized)?;
    let mut parts = body.split('.');
    if parts.next() != Some(TOKEN_PREFIX) {
        return Err(AppError::Unauthorized);
    }
    let user_id = parts
        .next()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or(AppError::Unauthorized)?;
    let expires = parts
        .next()
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or(AppError::Unauthorized)?;
    if parts.next().is_some() || secret.is_empty() || !verify_hmac_sha256(secret, body, signature) {
        return Err(AppError::Unauthorized);
    }
    if expires <= now_unix {
        debug!(user_id = %user_id, "session token expired");
        return Err(AppError::Unauthorized);
    }
    Ok(user_id)
}

pub async fn authenticate(state: &AppState, bearer: Option<&str>) -> Result<Principal, AppError> {
    let token = bearer.ok_or(AppError::Unauthorized)?;
    let now = chrono::Utc::now().timestamp();
    let user_id = verify_session_token(&state.config.session_secret, token, now)?;
    let user = state
        .user_repo
        .find_user(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let is_admin = user.is_admin(&state.config.admin_emails);
    Ok(Principal { user, is_admin })
}
