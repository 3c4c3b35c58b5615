//! Utility functions for report generation

/// Round to 2 decimal digits.
///
/// Rounds the exact binary value rather than `value * 100`, so inputs such as
/// 70.005 (stored just below the tie) round down instead of being pushed over
/// it by the multiplication.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Percentage of `part` in `total`, 0 when `total` is 0
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Whole-number display of a metric value, truncating toward zero
pub fn whole(value: f64) -> i64 {
    value.trunc() as i64
}

/// Display a float keeping one decimal for whole values ("80.0", "12.34")
pub fn display_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Horizontal rule used between console report sections
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}
