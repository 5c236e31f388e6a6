#![forbid(unsafe_code)]

//! Fractional `sort_order` positions inside a board column.

pub const SORT_ORDER_STEP: f64 = 65535.0;

/// Position for an item appended after `last`.
pub fn after_last(last: Option<f64>) -> f64 {
    match last {
        Some(value) => value + SORT_ORDER_STEP,
        None => SORT_ORDER_STEP,
    }
}

/// Position strictly between two neighbours (average of both when both
/// exist). `None` means the float gap is exhausted and the column needs
/// renumbering.
pub fn between(lower: Option<f64>, upper: Option<f64>) -> Option<f64> {
    let candidate = match (lower, upper) {
        (None, None) => SORT_ORDER_STEP,
        (Some(lower), None) => lower + SORT_ORDER_STEP,
        (None, Some(upper)) => upper - SORT_ORDER_STEP,
        (Some(lower), Some(upper)) => lower + (upper - lower) / 2.0,
    };
    let fits = candidate.is_finite()
        && lower.is_none_or(|lower| candidate > lower)
        && upper.is_none_or(|upper| candidate < upper);
    fits.then_some(candidate)
}

/// Evenly spaced positions for a column of `count` items.
pub fn renumbered(count: usize) -> Vec<f64> {
    (1..=count).map(|i| i as f64 * SORT_ORDER_STEP).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_between_neighbours() {
        assert_eq!(between(Some(65535.0), Some(131070.0)), Some(98302.5));
        assert_eq!(between(None, None), Some(SORT_ORDER_STEP));
        assert_eq!(between(Some(10.0), None), Some(10.0 + SORT_ORDER_STEP));
        assert_eq!(between(None, Some(10.0)), Some(10.0 - SORT_ORDER_STEP));
    }

    #[test]
    fn repeated_bisection_eventually_reports_exhaustion() {
        let lower = 1.0;
        let mut upper = 2.0;
        let mut steps = 0;
        while let Some(mid) = between(Some(lower), Some(upper)) {
            assert!(mid > lower && mid < upper);
            upper = mid;
            steps += 1;
            assert!(steps < 200, "bisection never exhausted");
        }
        assert!(steps > 40);
    }

    #[test]
    fn equal_neighbours_have_no_gap() {
        assert_eq!(between(Some(5.0), Some(5.0)), None);
    }

    #[test]
    fn renumbering_uses_the_default_step() {
        assert_eq!(renumbered(3), vec![65535.0, 131070.0, 196605.0]);
        assert_eq!(after_last(None), 65535.0);
        assert_eq!(after_last(Some(65535.0)), 131070.0);
    }
}
