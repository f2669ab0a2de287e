//! Rate change detector.
//!
//! Compares a freshly fetched quote with the last stored observation and
//! reports every pair whose relative movement reached the alert threshold.

use crate::{RateObservation, RatePair, RateQuote};
use rust_decimal::Decimal;
use std::fmt;

/// Default alert threshold: 5% relative movement.
pub const DEFAULT_ALERT_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Header line of the alert sent to subscribers.
pub const ALERT_HEADER: &str = "⚠ Significant exchange rate change:";

/// A pair whose rate moved at least the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateChange {
    pub pair: RatePair,
    pub old: Decimal,
    pub new: Decimal,
    /// `|new - old| / old`
    pub relative_diff: Decimal,
}

impl RateChange {
    /// Relative movement in percent, rounded half-even to 2 places.
    /// Saturates at `Decimal::MAX`.
    pub fn percent(&self) -> Decimal {
        self.relative_diff
            .checked_mul(Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::MAX)
            .round_dp(2)
    }
}

impl fmt::Display for RateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} changed by {:.2}%", self.pair, self.percent())
    }
}

/// `|new - old| / old`, or zero when `old` is zero.
///
/// A movement too large to represent saturates at `Decimal::MAX`, which is
/// above any threshold.
pub fn relative_diff(old: Decimal, new: Decimal) -> Decimal {
    if old.is_zero() {
        return Decimal::ZERO;
    }
    new.checked_sub(old)
        .and_then(|delta| delta.abs().checked_div(old.abs()))
        .unwrap_or(Decimal::MAX)
}

/// Detect pairs that moved by at least `threshold` since `previous`.
///
/// Pure: no I/O. Pairs are reported in [`RatePair::ALL`] order.
pub fn detect_changes(
    previous: &RateObservation,
    current: &RateQuote,
    threshold: Decimal,
) -> Vec<RateChange> {
    RatePair::ALL
        .iter()
        .filter_map(|&pair| {
            let old = previous.rate(pair);
            let new = current.rate(pair);
            let diff = relative_diff(old, new);
            // A zero previous rate yields a zero diff and never alerts,
            // even with a zero threshold.
            if old.is_zero() || diff < threshold {
                return None;
            }
            Some(RateChange {
                pair,
                old,
                new,
                relative_diff: diff,
            })
        })
        .collect()
}

/// Human-readable description for each change.
pub fn describe_changes(changes: &[RateChange]) -> Vec<String> {
    changes.iter().map(ToString::to_string).collect()
}

/// Compose the subscriber alert, one change per line.
/// Returns None when there is nothing to report.
pub fn compose_alert(changes: &[RateChange]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }
    let mut msg = String::from(ALERT_HEADER);
    for line in describe_changes(changes) {
        msg.push('\n');
        msg.push_str(&line);
    }
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn observation(usd_to_rub: Decimal, usd_to_kzt: Decimal, rub_to_kzt: Decimal) -> RateObservation {
        RateObservation {
            id: 1,
            usd_to_rub,
            usd_to_kzt,
            rub_to_kzt,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_threshold_is_five_percent() {
        assert_eq!(DEFAULT_ALERT_THRESHOLD, dec!(0.05));
    }

    #[test]
    fn test_relative_diff() {
        assert_eq!(relative_diff(dec!(100), dec!(105)), dec!(0.05));
        assert_eq!(relative_diff(dec!(100), dec!(95)), dec!(0.05));
        assert_eq!(relative_diff(dec!(0), dec!(95)), Decimal::ZERO);
    }

    #[test]
    fn test_usd_rub_jump_also_moves_cross_rate() {
        let previous = observation(dec!(90.00), dec!(450.00), dec!(5.0));
        let current = RateQuote::from_usd(dec!(95.00), dec!(450.00)).unwrap();

        let changes = detect_changes(&previous, &current, DEFAULT_ALERT_THRESHOLD);

        // RUB→KZT moves 5.0 -> 4.73684211, about 5.26%, so it alerts too
        assert_eq!(
            describe_changes(&changes),
            vec![
                "USD→RUB changed by 5.56%".to_string(),
                "RUB→KZT changed by 5.26%".to_string(),
            ]
        );
    }

    #[test]
    fn test_only_usd_rub_when_cross_rate_is_stable() {
        let previous = observation(dec!(90.00), dec!(450.00), dec!(4.73684211));
        let current = RateQuote::from_usd(dec!(95.00), dec!(450.00)).unwrap();

        let changes = detect_changes(&previous, &current, DEFAULT_ALERT_THRESHOLD);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].pair, RatePair::UsdRub);
        assert_eq!(changes[0].new, dec!(95.00));
        assert_eq!(changes[0].to_string(), "USD→RUB changed by 5.56%");
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let previous = observation(dec!(100), dec!(400), dec!(4));
        let current = RateQuote {
            usd_to_rub: dec!(105),
            usd_to_kzt: dec!(400),
            rub_to_kzt: dec!(4),
        };

        let at = detect_changes(&previous, &current, dec!(0.05));
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].to_string(), "USD→RUB changed by 5.00%");

        let above = detect_changes(&previous, &current, dec!(0.0500001));
        assert!(above.is_empty());
    }

    #[test]
    fn test_decrease_is_reported_as_absolute_change() {
        let previous = observation(dec!(100), dec!(400), dec!(4));
        let current = RateQuote {
            usd_to_rub: dec!(100),
            usd_to_kzt: dec!(360),
            rub_to_kzt: dec!(4),
        };

        let changes = detect_changes(&previous, &current, DEFAULT_ALERT_THRESHOLD);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new, dec!(360));
        assert_eq!(changes[0].to_string(), "USD→KZT changed by 10.00%");
    }

    #[test]
    fn test_zero_previous_rate_never_alerts() {
        let previous = observation(dec!(0), dec!(0), dec!(0));
        let current = RateQuote::from_usd(dec!(95), dec!(450)).unwrap();

        assert!(detect_changes(&previous, &current, DEFAULT_ALERT_THRESHOLD).is_empty());
        assert!(detect_changes(&previous, &current, Decimal::ZERO).is_empty());
    }

    #[test]
    fn test_threshold_property_over_grid() {
        let old = dec!(80);
        let thresholds = [dec!(0.01), dec!(0.025), dec!(0.05), dec!(0.1)];
        let news = [dec!(79), dec!(80), dec!(82), dec!(84), dec!(88), dec!(72), dec!(90)];

        for threshold in thresholds {
            for new in news {
                let previous = observation(old, dec!(400), dec!(5));
                let current = RateQuote {
                    usd_to_rub: new,
                    usd_to_kzt: dec!(400),
                    rub_to_kzt: dec!(5),
                };
                let changes = detect_changes(&previous, &current, threshold);
                let expected = (new - old).abs() / old >= threshold;
                assert_eq!(!changes.is_empty(), expected, "old={old} new={new} t={threshold}");
            }
        }
    }

    #[test]
    fn test_compose_alert() {
        assert_eq!(compose_alert(&[]), None);

        let previous = observation(dec!(90.00), dec!(450.00), dec!(4.73684211));
        let current = RateQuote::from_usd(dec!(95.00), dec!(450.00)).unwrap();
        let changes = detect_changes(&previous, &current, DEFAULT_ALERT_THRESHOLD);

        assert_eq!(
            compose_alert(&changes).unwrap(),
            "⚠ Significant exchange rate change:\nUSD→RUB changed by 5.56%"
        );
    }

    #[test]
    fn test_unrepresentable_move_saturates_and_alerts() {
        let tiny = dec!(0.0000000000000000000001);
        let huge = dec!(79228162514264337593543950);
        assert_eq!(relative_diff(tiny, huge), Decimal::MAX);

        let previous = observation(tiny, dec!(400), dec!(4));
        let current = RateQuote {
            usd_to_rub: huge,
            usd_to_kzt: dec!(400),
            rub_to_kzt: dec!(4),
        };
        let changes = detect_changes(&previous, &current, DEFAULT_ALERT_THRESHOLD);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].relative_diff, Decimal::MAX);
        assert_eq!(changes[0].percent(), Decimal::MAX);
    }
}
