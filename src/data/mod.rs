use fnv::FnvBuildHasher;
use hashbrown::HashMap;

pub mod counter;
pub mod gauge;
pub mod quantile;
pub mod snapshot;
pub mod timer;

pub(crate) use self::{counter::Counter, gauge::Gauge, timer::Timer};
pub use self::{
    quantile::{default_quantiles, parse_quantiles, quantile, quantile_sorted, Quantile, TimerSummary},
    snapshot::Snapshot,
};

/// Mapping from metric name to its aggregated value.
pub type MetricMap<V> = HashMap<String, V, FnvBuildHasher>;

/// The live set of collections currently being written to.
///
/// Counters, gauges and timers are independent namespaces: the same name may appear in all three.
#[derive(Default)]
pub(crate) struct Generation {
    pub counters: Counter,
    pub gauges: Gauge,
    pub timers: Timer,
}

impl Generation {
    /// Hands the backing maps over to a snapshot without copying them.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot::new(
            self.counters.into_inner(),
            self.gauges.into_inner(),
            self.timers.into_inner(),
        )
    }

    /// Deep-copies the backing maps into a snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.counters.data().clone(),
            self.gauges.data().clone(),
            self.timers.data().clone(),
        )
    }
}
