use super::MetricMap;
use std::time::Duration;

/// A point-in-time view of metric data.
///
/// Snapshots own their maps outright: either a detached generation from a flush, or a deep copy
/// of the live one.  Nothing else holds a reference to them, so they never change after creation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    counters: MetricMap<i64>,
    gauges: MetricMap<i64>,
    timers: MetricMap<Vec<Duration>>,
}

impl Snapshot {
    pub(crate) fn new(counters: MetricMap<i64>, gauges: MetricMap<i64>, timers: MetricMap<Vec<Duration>>) -> Self {
        Snapshot {
            counters,
            gauges,
            timers,
        }
    }

    /// Gets the counter value for the given metric name.
    ///
    /// Returns `None` if the name had no counter updates in this snapshot.
    pub fn count(&self, key: &str) -> Option<i64> { self.counters.get(key).cloned() }

    /// Gets the gauge value for the given metric name.
    ///
    /// Returns `None` if the name had no gauge updates in this snapshot.
    pub fn gauge(&self, key: &str) -> Option<i64> { self.gauges.get(key).cloned() }

    /// Gets the timer samples, in arrival order, for the given metric name.
    pub fn timer(&self, key: &str) -> Option<&[Duration]> { self.timers.get(key).map(|s| s.as_slice()) }

    pub fn counters(&self) -> &MetricMap<i64> { &self.counters }

    pub fn gauges(&self) -> &MetricMap<i64> { &self.gauges }

    pub fn timers(&self) -> &MetricMap<Vec<Duration>> { &self.timers }

    /// Whether this snapshot holds no metrics at all.
    pub fn is_empty(&self) -> bool { self.counters.is_empty() && self.gauges.is_empty() && self.timers.is_empty() }

    /// Consumes the snapshot, returning the counters, gauges and timers maps.
    pub fn into_parts(self) -> (MetricMap<i64>, MetricMap<i64>, MetricMap<Vec<Duration>>) {
        (self.counters, self.gauges, self.timers)
    }
}
