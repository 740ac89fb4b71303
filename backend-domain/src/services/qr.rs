// Signed QR payloads printed on tickets
// Format: eht1.<ticket_id>.<event_id>.<hex hmac-sha256>

use anyhow::Result;
use uuid::Uuid;

use crate::utils::{sign_hmac_sha256, verify_hmac_sha256};

const QR_PREFIX: &str = "eht1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrClaims {
    pub ticket_id: Uuid,
    pub event_id: Uuid,
}

pub fn sign_ticket_qr(secret: &str, ticket_id: Uuid, event_id: Uuid) -> Result<String> {
    let body = format!("{QR_PREFIX}.{ticket_id}.{event_id}");
    let signature = sign_hmac_sha256(secret, &body)?;
    Ok(format!("{body}.{signature}"))
}

pub fn verify_ticket_qr(secret: &str, payload: &str) -> Option<QrClaims> {
    let payload = payload.trim();
    let (body, signature) = payload.rsplit_once('.')?;
    let mut parts = body.split('.');
    if parts.next()? != QR_PREFIX {
        return None;
    }
    let ticket_id = Uuid::parse_str(parts.next()?).ok()?;
    let event_id = Uuid::parse_str(parts.next()?).ok()?;
    if parts.next().is_some() || !verify_hmac_sha256(secret, body, signature) {
        return None;
    }
    Some(QrClaims {
        ticket_id,
        event_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_payload_verifies() {
        let ticket = Uuid::new_v4();
        let event = Uuid::new_v4();
        let payload = sign_ticket_qr("qr-secret", ticket, event).expect("sign");
        assert_eq!(
            verify_ticket_qr("qr-secret", &payload),
            Some(QrClaims { ticket_id: ticket, event_id: event })
        );
    }

    #[test]
    fn tampered_or_foreign_payloads_are_rejected() {
        let payload = sign_ticket_qr("qr-secret", Uuid::new_v4(), Uuid::new_v4()).expect("sign");
        assert!(verify_ticket_qr("other-secret", &payload).is_none());

        let swapped = payload.replacen("eht1", "eht2", 1);
        assert!(verify_ticket_qr("qr-secret", &swapped).is_none());
        assert!(verify_ticket_qr("qr-secret", "EH-1234-ABCD").is_none());
        assert!(verify_ticket_qr("qr-secret", "").is_none());
    }
}
