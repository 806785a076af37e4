//! Leveling curve.
//!
//! `threshold(level) = floor(100 * level^1.5)` is the XP cost of advancing
//! from `level` to `level + 1`. The same function answers both "can the
//! user level up" and "how much XP does this step drain".

/// Hard level cap. Surplus XP is retained past it but never drained.
pub const MAX_LEVEL: u32 = 100;

const BASE: f64 = 100.0;
const EXPONENT: f64 = 1.5;

/// XP required to advance from `level` (>= 1) to the next level.
///
/// Pure and total; deterministic for every valid level.
pub fn threshold(level: u32) -> i64 {
    (BASE * f64::from(level).powf(EXPONENT)).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_values() {
        assert_eq!(threshold(1), 100);
        assert_eq!(threshold(2), 282);
        assert_eq!(threshold(3), 519);
        assert_eq!(threshold(4), 800);
        assert_eq!(threshold(5), 1118);
        assert_eq!(threshold(10), 3162);
    }

    #[test]
    fn test_threshold_monotonic() {
        for level in 1..MAX_LEVEL {
            assert!(threshold(level) < threshold(level + 1));
        }
    }
}
