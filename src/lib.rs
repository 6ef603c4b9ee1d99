//! A statsd-compatible metrics aggregation daemon.
//!
//! A [`Server`] reads statsd datagrams (`<name>:<value>|<type>`, newline-separated) off a UDP
//! socket and aggregates them into [`Metrics`]: counters (`c`) are summed, gauges (`g`) keep the
//! last value, and timers (`ms`) keep every sample.  Consumers periodically call
//! [`Metrics::flush_and_snapshot`] to take everything collected so far and start over, or
//! [`Metrics::snapshot`] to look without resetting.
//!
//! ```no_run
//! let handle = hotstatsd::start("127.0.0.1:8125").expect("failed to start statsd server");
//! handle.metrics().add_on_update(|| println!("packet processed"));
//!
//! let snapshot = handle.metrics().flush_and_snapshot();
//! println!("requests: {:?}", snapshot.count("requests"));
//! ```
mod configuration;
mod data;
mod helper;
mod metrics;
mod printer;
mod protocol;
mod recorder;
mod server;
#[cfg(feature = "web")]
pub mod web;

pub use self::{
    configuration::{Configuration, MAX_PACKET_SIZE},
    data::{
        default_quantiles, parse_quantiles, quantile, quantile_sorted, MetricMap, Quantile, Snapshot, TimerSummary,
    },
    helper::{duration_as_millis_f64, millis_to_duration, parse_interval},
    metrics::{Metrics, PacketError},
    printer::Printer,
    protocol::{next_record, parse_int, parse_millis, parse_name, split_token, Field, MetricType, ProtocolError, Record},
    recorder::{window_key, Recorder, WindowSnapshot},
    server::{start, Handle, Server},
};
