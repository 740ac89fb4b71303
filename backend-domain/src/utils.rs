use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn round_to_minor(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

pub fn basis_points_of(amount: i64, bps: u32) -> i64 {
    let scaled = i128::from(amount) * i128::from(bps);
    let rounded = if scaled >= 0 {
        (scaled + 5_000) / 10_000
    } else {
        (scaled - 5_000) / 10_000
    };
    rounded as i64
}

pub fn sign_hmac_sha256(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| anyhow!("hmac init failed: {err}"))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_hmac_sha256(secret: &str, payload: &str, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_points_round_half_up() {
        assert_eq!(basis_points_of(10_000, 1000), 1000);
        assert_eq!(basis_points_of(10_000, 290), 290);
        assert_eq!(basis_points_of(15, 1000), 2);
        assert_eq!(basis_points_of(14, 1000), 1);
        assert_eq!(basis_points_of(0, 290), 0);
    }

    #[test]
    fn round_to_minor_uses_midpoint_away_from_zero() {
        assert_eq!(round_to_minor(Decimal::new(25, 1)), 3);
        assert_eq!(round_to_minor(Decimal::new(24, 1)), 2);
        assert_eq!(round_to_minor(Decimal::new(-25, 1)), -3);
    }

    #[test]
    fn hmac_signature_round_trips() {
        let signature = sign_hmac_sha256("secret", "payload").expect("sign");
        assert_eq!(signature.len(), 64);
        assert!(verify_hmac_sha256("secret", "payload", &signature));
        assert!(!verify_hmac_sha256("other", "payload", &signature));
        assert!(!verify_hmac_sha256("secret", "payload", "zz"));
    }
}
