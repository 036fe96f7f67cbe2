//! Relative time intervals, as stored in a template's `ValidityPeriod` and
//! `RenewalOverlap` values.
//!
//! Windows stores these as a little-endian `i64` count of 100-nanosecond
//! ticks. Relative intervals are negative by convention.

use chrono::TimeDelta;

use crate::TemplateError;

/// The number of 100-nanosecond ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// The encoded length of a period.
pub const PERIOD_LEN: usize = 8;

/// Decodes a relative period into a duration with whole-second precision.
///
/// Only the first [`PERIOD_LEN`] bytes are read. The sign is not validated:
/// a non-negative tick count (which doesn't follow the relative-interval
/// convention) decodes to a negative or zero duration.
pub fn decode_period(bytes: &[u8]) -> Result<TimeDelta, TemplateError> {
    let Some(raw) = bytes.first_chunk::<PERIOD_LEN>() else {
        return Err(TemplateError::MalformedPeriod { len: bytes.len() });
    };

    let ticks = i64::from_le_bytes(*raw);
    if ticks > 0 {
        tracing::debug!(ticks, "period is not a negative relative interval");
    }

    // Truncates toward zero. `i64::MIN / -10_000_000` can't overflow.
    Ok(TimeDelta::seconds(ticks / -TICKS_PER_SECOND))
}

/// Encodes a duration as a relative period, dropping sub-second precision.
pub fn encode_period(period: TimeDelta) -> [u8; PERIOD_LEN] {
    let ticks = period.num_seconds().saturating_mul(-TICKS_PER_SECOND);
    ticks.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_decode_one_year() {
        // 365 days: -315,360,000,000,000 ticks
        let raw = b"\x00\x40\x39\x87\x2E\xE1\xFE\xFF";
        assert_eq!(decode_period(raw).unwrap(), TimeDelta::days(365));
    }

    #[test]
    fn test_decode_six_weeks() {
        let raw = b"\x00\x80\xA6\x0A\xFF\xDE\xFF\xFF";
        assert_eq!(decode_period(raw).unwrap(), TimeDelta::weeks(6));
    }

    #[test]
    fn test_decode_zero() {
        assert_eq!(decode_period(&[0; 8]).unwrap(), TimeDelta::zero());
    }

    #[test]
    fn test_decode_positive_ticks() {
        let raw = (10 * TICKS_PER_SECOND).to_le_bytes();
        assert_eq!(decode_period(&raw).unwrap(), TimeDelta::seconds(-10));
    }

    #[test]
    fn test_decode_truncates() {
        // -1.5s and +1.5s both truncate toward zero
        let raw = (-15_000_000i64).to_le_bytes();
        assert_eq!(decode_period(&raw).unwrap(), TimeDelta::seconds(1));

        let raw = 15_000_000i64.to_le_bytes();
        assert_eq!(decode_period(&raw).unwrap(), TimeDelta::seconds(-1));
    }

    #[test]
    fn test_decode_extreme() {
        let raw = i64::MIN.to_le_bytes();
        assert_eq!(
            decode_period(&raw).unwrap(),
            TimeDelta::seconds(i64::MIN / -TICKS_PER_SECOND)
        );
    }

    #[test]
    fn test_decode_short() {
        assert!(matches!(
            decode_period(b"\x00\x40\x39\x87\x2E\xE1\xFE"),
            Err(TemplateError::MalformedPeriod { len: 7 })
        ));
        assert!(matches!(
            decode_period(&[]),
            Err(TemplateError::MalformedPeriod { len: 0 })
        ));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut raw = encode_period(TimeDelta::days(2)).to_vec();
        raw.extend_from_slice(b"\xFF\xFF");
        assert_eq!(decode_period(&raw).unwrap(), TimeDelta::days(2));
    }

    proptest! {
        #[test]
        fn test_decode_matches_tick_division(ticks: i64) {
            let decoded = decode_period(&ticks.to_le_bytes()).unwrap();
            prop_assert_eq!(decoded.num_seconds(), ticks / -TICKS_PER_SECOND);
        }

        #[test]
        fn test_encode_roundtrip(seconds in -(i64::MAX / TICKS_PER_SECOND)..=(i64::MAX / TICKS_PER_SECOND)) {
            let period = TimeDelta::seconds(seconds);
            prop_assert_eq!(decode_period(&encode_period(period)).unwrap(), period);
        }
    }
}
