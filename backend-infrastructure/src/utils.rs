use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use time::OffsetDateTime;

pub fn chrono_to_offset(at: DateTime<Utc>) -> OffsetDateTime {
    let nanos = i128::from(at.timestamp_millis()).saturating_mul(1_000_000);
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn major_to_minor(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

pub fn minor_to_major(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_major_and_minor_units() {
        assert_eq!(major_to_minor(Decimal::new(65005, 2)), Some(65005));
        assert_eq!(major_to_minor(Decimal::new(1234567, 4)), Some(12346));
        assert_eq!(minor_to_major(250), Decimal::new(250, 2));
    }

    #[test]
    fn converts_timestamps_to_millisecond_precision() {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_000_000).expect("ts");
        let converted = chrono_to_offset(at);
        assert_eq!(converted.unix_timestamp(), 1_700_000_000);
        assert_eq!(converted.millisecond(), 123);
    }
}
