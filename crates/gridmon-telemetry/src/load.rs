/// Hourly demand multipliers approximating a realistic daily load curve:
/// overnight trough, morning ramp to a late-morning peak, afternoon dip,
/// and an evening peak that declines toward midnight.
const LOAD_CURVE: [f64; 24] = [
    0.6, 0.55, 0.5, 0.5, 0.55, 0.65, // 0-5: overnight low
    0.75, 0.85, 0.9, 0.95, 1.0, 1.0, // 6-11: morning peak
    0.95, 0.9, 0.85, 0.8, 0.85, 0.95, // 12-17: afternoon
    1.0, 0.95, 0.85, 0.75, 0.7, 0.65, // 18-23: evening peak declining
];

/// Diurnal load factor for the given hour of day.
///
/// Out-of-range hours fall back to 0.7 rather than panicking.
///
/// # Examples
///
/// ```
/// use gridmon_telemetry::load::load_factor;
///
/// assert_eq!(load_factor(10), 1.0);
/// assert_eq!(load_factor(2), 0.5);
/// assert_eq!(load_factor(99), 0.7);
/// ```
pub fn load_factor(hour: u32) -> f64 {
    LOAD_CURVE.get(hour as usize).copied().unwrap_or(0.7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_peaks_and_troughs() {
        assert_eq!(load_factor(10), 1.0);
        assert_eq!(load_factor(18), 1.0);
        assert_eq!(load_factor(3), 0.5);
        assert_eq!(load_factor(23), 0.65);
    }

    #[test]
    fn out_of_range_hour_uses_fallback() {
        assert_eq!(load_factor(24), 0.7);
        assert_eq!(load_factor(u32::MAX), 0.7);
    }
}
