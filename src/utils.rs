use std::time::Duration;

/// Render a duration with two decimals and an automatic unit, e.g. `1.94ms` or `2.34s`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Warn when `elapsed` is over `threshold`. Returns whether it was.
pub fn warn_if_slow(elapsed: Duration, threshold: Duration, label: &str) -> bool {
    let slow = elapsed > threshold;
    if slow {
        tracing::warn!(
            duration = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "slow operation: {label}"
        );
    }
    slow
}
