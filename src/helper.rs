use std::time::Duration;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Converts fractional milliseconds into a duration, truncating below nanosecond precision.
///
/// Returns `None` for negative or non-finite values, or values too large to represent.
pub fn millis_to_duration(millis: f64) -> Option<Duration> {
    if !millis.is_finite() || millis < 0.0 {
        return None;
    }

    let nanos = millis * NANOS_PER_MILLI;
    if nanos >= u64::MAX as f64 {
        return None;
    }

    Some(Duration::from_nanos(nanos as u64))
}

/// Parses a positive interval given in fractional seconds.
///
/// Returns `None` for anything that isn't a number, or that can't be represented as a non-zero
/// duration.
pub fn parse_interval(secs: &str) -> Option<Duration> {
    let secs = secs.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok().filter(|interval| *interval > Duration::ZERO)
}

/// Converts a duration into fractional milliseconds.
pub fn duration_as_millis_f64(d: Duration) -> f64 { d.as_nanos() as f64 / NANOS_PER_MILLI }
