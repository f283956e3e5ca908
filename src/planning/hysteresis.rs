// src/planning/hysteresis.rs

/// Two-threshold debounce on a gap measurement.
///
/// An obstacle that was blocking keeps blocking until the gap opens past
/// `safe_distance + buffer`; one that was clear only starts blocking once
/// the gap closes below `safe_distance - buffer`.
pub fn hysteresis_filter(gap: f64, safe_distance: f64, buffer: f64, was_blocking: bool) -> bool {
    if was_blocking {
        gap < safe_distance + buffer
    } else {
        gap < safe_distance - buffer
    }
}
