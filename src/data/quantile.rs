use crate::helper::duration_as_millis_f64;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

/// A quantile that has both the raw value and a human-friendly display label.
///
/// A quantile of `0.99` is labelled `p99`, and `0.999` is labelled `p999`.  The two ends of the
/// scale, `0.0` and `1.0`, are labelled `min` and `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantile(f64, String);

impl Quantile {
    /// Creates a new `Quantile` from a floating-point value, clamped between 0.0 and 1.0.
    pub fn new(quantile: f64) -> Quantile {
        let clamped = quantile.max(0.0).min(1.0);
        let display = clamped * 100.0;

        let raw_label = format!("{}", clamped);
        let label = match raw_label.as_str() {
            "0" => "min".to_string(),
            "1" => "max".to_string(),
            _ => {
                let raw = format!("p{}", display);
                raw.replace(".", "")
            },
        };

        Quantile(clamped, label)
    }

    pub fn label(&self) -> &str { self.1.as_str() }

    pub fn value(&self) -> f64 { self.0 }
}

/// Parses a slice of floating-point values into a vector of `Quantile`s.
pub fn parse_quantiles(quantiles: &[f64]) -> Vec<Quantile> { quantiles.iter().map(|q| Quantile::new(*q)).collect() }

/// The quantiles reported for every timer: p50, p90, p95 and p99.
pub fn default_quantiles() -> Vec<Quantile> { parse_quantiles(&[0.5, 0.9, 0.95, 0.99]) }

/// Sorts `samples` in place and estimates the given quantile.
///
/// The arrival order of `samples` is lost.
pub fn quantile(samples: &mut [Duration], q: f64) -> Duration {
    samples.sort_unstable();
    quantile_sorted(samples, q)
}

/// Estimates the given quantile of already-sorted samples.
///
/// Linearly interpolates between the two closest ranks, truncating to whole nanoseconds.  An
/// empty slice yields a zero duration,
/// and a single sample is returned as-is for any `q`.
pub fn quantile_sorted(sorted: &[Duration], q: f64) -> Duration {
    let len = sorted.len();
    match len {
        0 => Duration::from_nanos(0),
        1 => sorted[0],
        _ => {
            let q = q.max(0.0).min(1.0);
            let exact_idx = q * (len - 1) as f64;
            let left_idx = exact_idx.floor() as usize;
            if left_idx >= len - 1 {
                return sorted[len - 1];
            }

            let right_weight = exact_idx - left_idx as f64;
            let left_weight = 1.0 - right_weight;
            let left = sorted[left_idx].as_nanos() as f64;
            let right = sorted[left_idx + 1].as_nanos() as f64;

            Duration::from_nanos((left * left_weight + right * right_weight) as u64)
        },
    }
}

/// Quantile summary of a single timer's samples.
///
/// Serializes as a map from quantile label to fractional milliseconds, e.g. `{"p50": 1.5}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSummary {
    count: usize,
    measurements: Vec<(Quantile, Duration)>,
}

impl TimerSummary {
    pub fn from_samples(mut samples: Vec<Duration>, quantiles: &[Quantile]) -> Self {
        samples.sort_unstable();

        let measurements = quantiles
            .iter()
            .map(|q| (q.clone(), quantile_sorted(&samples, q.value())))
            .collect();

        TimerSummary {
            count: samples.len(),
            measurements,
        }
    }

    /// Number of samples summarized.
    pub fn count(&self) -> usize { self.count }

    /// Gets the estimate for the quantile with the given label, such as `p99`.
    pub fn get(&self, label: &str) -> Option<Duration> {
        self.measurements
            .iter()
            .find(|(q, _)| q.label() == label)
            .map(|(_, value)| *value)
    }

    pub fn measurements(&self) -> &[(Quantile, Duration)] { &self.measurements }
}

impl Serialize for TimerSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.measurements.len()))?;
        for (q, value) in &self.measurements {
            map.serialize_entry(q.label(), &duration_as_millis_f64(*value))?;
        }
        map.end()
    }
}
