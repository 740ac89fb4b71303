// Payout state machine
//
// Every transition is an explicit admin action and yields an audit entry.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{Payout, PayoutAuditEntry, PayoutRequest};
use crate::value_objects::PayoutStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutAction {
    Approve,
    Decline { reason: String },
    StartProcessing,
    MarkPaid { payment_reference: String, receipt_url: String },
    Fail { reason: String },
}

impl PayoutAction {
    pub fn name(&self) -> &'static str {
        match self {
            PayoutAction::Approve => "approve",
            PayoutAction::Decline { .. } => "decline",
            PayoutAction::StartProcessing => "process",
            PayoutAction::MarkPaid { .. } => "mark-paid",
            PayoutAction::Fail { .. } => "fail",
        }
    }

    pub fn target(&self) -> PayoutStatus {
        match self {
            PayoutAction::Approve => PayoutStatus::Approved,
            PayoutAction::Decline { .. } => PayoutStatus::Declined,
            PayoutAction::StartProcessing => PayoutStatus::Processing,
            PayoutAction::MarkPaid { .. } => PayoutStatus::Completed,
            PayoutAction::Fail { .. } => PayoutStatus::Failed,
        }
    }

    fn allowed_from(&self) -> &'static [PayoutStatus] {
        match self {
            PayoutAction::Approve | PayoutAction::Decline { .. } => &[PayoutStatus::Pending],
            PayoutAction::StartProcessing => &[PayoutStatus::Pending, PayoutStatus::Approved],
            PayoutAction::MarkPaid { .. } => &[PayoutStatus::Approved, PayoutStatus::Processing],
            PayoutAction::Fail { .. } => &[
                PayoutStatus::Pending,
                PayoutStatus::Approved,
                PayoutStatus::Processing,
            ],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayoutError {
    #[error("cannot {action} a payout that is {from}")]
    InvalidTransition { action: &'static str, from: PayoutStatus },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("amount must be at least {minimum}")]
    BelowMinimum { minimum: i64 },
    #[error("amount exceeds available balance of {available}")]
    InsufficientBalance { available: i64 },
}

fn required(value: &str, field: &'static str) -> Result<String, PayoutError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PayoutError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

pub fn transition(
    payout: &Payout,
    action: PayoutAction,
    actor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(Payout, PayoutAuditEntry), PayoutError> {
    if !action.allowed_from().contains(&payout.status) {
        return Err(PayoutError::InvalidTransition {
            action: action.name(),
            from: payout.status,
        });
    }

    let mut next = payout.clone();
    next.status = action.target();
    next.updated_at = now;
    let note = match action {
        PayoutAction::Approve | PayoutAction::StartProcessing => None,
        PayoutAction::Decline { reason } => {
            let reason = required(&reason, "decline reason")?;
            next.decline_reason = Some(reason.clone());
            Some(reason)
        }
        PayoutAction::Fail { reason } => {
            let reason = required(&reason, "failure reason")?;
            next.failure_reason = Some(reason.clone());
            Some(reason)
        }
        PayoutAction::MarkPaid {
            payment_reference,
            receipt_url,
        } => {
            let reference = required(&payment_reference, "payment reference")?;
            let receipt = required(&receipt_url, "receipt url")?;
            next.payment_reference = Some(reference.clone());
            next.receipt_url = Some(receipt);
            next.completed_at = Some(now);
            Some(format!("reference {reference}"))
        }
    };

    let audit = PayoutAuditEntry {
        payout_id: payout.id,
        actor_id,
        from_status: payout.status,
        to_status: next.status,
        note,
        at: now,
    };
    Ok((next, audit))
}

pub fn validate_payout_request(
    request: &PayoutRequest,
    minimum: i64,
    available: i64,
) -> Result<(), PayoutError> {
    required(&request.destination, "destination")?;
    if request.amount < minimum {
        return Err(PayoutError::BelowMinimum { minimum });
    }
    if request.amount > available {
        return Err(PayoutError::InsufficientBalance {
            available: available.max(0),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{Currency, PayoutMethod};

    fn payout(status: PayoutStatus) -> Payout {
        let now = Utc::now();
        Payout {
            id: Uuid::from_u128(5),
            organizer_id: Uuid::from_u128(6),
            amount: 20_000,
            currency: Currency::Htg,
            method: PayoutMethod::MobileMoney,
            destination: "+509 3700 0000".to_string(),
            status,
            decline_reason: None,
            failure_reason: None,
            payment_reference: None,
            receipt_url: None,
            scheduled_for: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn mark_paid(reference: &str, receipt: &str) -> PayoutAction {
        PayoutAction::MarkPaid {
            payment_reference: reference.to_string(),
            receipt_url: receipt.to_string(),
        }
    }

    #[test]
    fn happy_path_reaches_completed_with_audit_trail() {
        let admin = Uuid::from_u128(1);
        let now = Utc::now();
        let (approved, first) =
            transition(&payout(PayoutStatus::Pending), PayoutAction::Approve, admin, now)
                .expect("approve");
        let (processing, _) =
            transition(&approved, PayoutAction::StartProcessing, admin, now).expect("process");
        let (paid, last) = transition(
            &processing,
            mark_paid("MC-4471", "https://files.example/r.pdf"),
            admin,
            now,
        )
        .expect("paid");

        assert_eq!(first.from_status, PayoutStatus::Pending);
        assert_eq!(first.to_status, PayoutStatus::Approved);
        assert_eq!(paid.status, PayoutStatus::Completed);
        assert_eq!(paid.payment_reference.as_deref(), Some("MC-4471"));
        assert_eq!(paid.completed_at, Some(now));
        assert_eq!(last.to_status, PayoutStatus::Completed);
    }

    #[test]
    fn mark_paid_requires_reference_and_receipt() {
        let admin = Uuid::from_u128(1);
        let approved = payout(PayoutStatus::Approved);
        assert_eq!(
            transition(&approved, mark_paid(" ", "https://r"), admin, Utc::now()).unwrap_err(),
            PayoutError::MissingField("payment reference")
        );
        assert_eq!(
            transition(&approved, mark_paid("REF", ""), admin, Utc::now()).unwrap_err(),
            PayoutError::MissingField("receipt url")
        );
    }

    #[test]
    fn pending_cannot_be_marked_paid() {
        let err = transition(
            &payout(PayoutStatus::Pending),
            mark_paid("REF", "https://r"),
            Uuid::from_u128(1),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PayoutError::InvalidTransition {
                action: "mark-paid",
                from: PayoutStatus::Pending
            }
        );
    }

    #[test]
    fn terminal_states_accept_no_action() {
        for status in [
            PayoutStatus::Completed,
            PayoutStatus::Declined,
            PayoutStatus::Failed,
        ] {
            for action in [
                PayoutAction::Approve,
                PayoutAction::StartProcessing,
                PayoutAction::Fail { reason: "x".to_string() },
                PayoutAction::Decline { reason: "x".to_string() },
                mark_paid("REF", "https://r"),
            ] {
                assert!(transition(&payout(status), action, Uuid::nil(), Utc::now()).is_err());
            }
        }
    }

    #[test]
    fn decline_records_reason() {
        let (declined, audit) = transition(
            &payout(PayoutStatus::Pending),
            PayoutAction::Decline { reason: "bank details mismatch".to_string() },
            Uuid::from_u128(1),
            Utc::now(),
        )
        .expect("decline");
        assert_eq!(declined.decline_reason.as_deref(), Some("bank details mismatch"));
        assert_eq!(audit.note.as_deref(), Some("bank details mismatch"));
        assert!(transition(
            &payout(PayoutStatus::Approved),
            PayoutAction::Decline { reason: "late".to_string() },
            Uuid::from_u128(1),
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn request_checks_minimum_and_balance() {
        let request = PayoutRequest {
            amount: 6000,
            currency: Currency::Htg,
            method: PayoutMethod::Bank,
            destination: "Unibank 001".to_string(),
            scheduled_for: None,
        };
        assert!(validate_payout_request(&request, 5000, 10_000).is_ok());
        assert_eq!(
            validate_payout_request(&request, 7000, 10_000),
            Err(PayoutError::BelowMinimum { minimum: 7000 })
        );
        assert_eq!(
            validate_payout_request(&request, 5000, 4000),
            Err(PayoutError::InsufficientBalance { available: 4000 })
        );
    }
}
