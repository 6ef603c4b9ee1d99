use crate::data::{default_quantiles, parse_quantiles, Quantile, Snapshot, TimerSummary};
use chrono::{DateTime, DurationRound, TimeZone, Utc};
use log::info;
use parking_lot::RwLock;
use serde::Serialize;
use std::{collections::BTreeMap, fmt, time::Duration};

const WINDOW_KEY_FORMAT: &str = "%H:%M:%S";

/// Flushed metrics for one window, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    /// Position of this window in the recorder's history.
    pub index: usize,

    /// Start of the window, formatted as `HH:MM:SS`.
    #[serde(rename = "key")]
    pub time: String,

    pub counters: BTreeMap<String, i64>,
    pub gauges: BTreeMap<String, i64>,
    pub timers: BTreeMap<String, TimerSummary>,
}

impl WindowSnapshot {
    /// Converts a snapshot, summarizing each timer's samples at the given quantiles.
    pub fn from_snapshot(index: usize, time: String, snapshot: Snapshot, quantiles: &[Quantile]) -> Self {
        let (counters, gauges, timers) = snapshot.into_parts();
        let timers = timers
            .into_iter()
            .map(|(name, samples)| (name, TimerSummary::from_samples(samples, quantiles)))
            .collect();

        WindowSnapshot {
            index,
            time,
            counters: counters.into_iter().collect(),
            gauges: gauges.into_iter().collect(),
            timers,
        }
    }
}

/// Formats the start of the window containing `now` as `HH:MM:SS`, in `now`'s time zone.
///
/// Windows are aligned to the Unix epoch rather than to local midnight.  A zero window leaves
/// `now` as-is.
pub fn window_key<Tz>(now: DateTime<Tz>, window: Duration) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let span = match chrono::Duration::from_std(window) {
        Ok(span) if span > chrono::Duration::zero() => span,
        _ => return now.format(WINDOW_KEY_FORMAT).to_string(),
    };

    match now.with_timezone(&Utc).duration_trunc(span) {
        Ok(start) => start.with_timezone(&now.timezone()).format(WINDOW_KEY_FORMAT).to_string(),
        Err(_) => now.format(WINDOW_KEY_FORMAT).to_string(),
    }
}

/// History of windowed snapshots.
///
/// Every window's snapshot is kept for the life of the recorder, and can be read back a page at
/// a time by index.
pub struct Recorder {
    quantiles: Vec<Quantile>,
    history: RwLock<Vec<WindowSnapshot>>,
}

impl Default for Recorder {
    fn default() -> Self { Recorder::new() }
}

impl Recorder {
    /// Creates an empty recorder, summarizing timers at p50, p90, p95 and p99.
    pub fn new() -> Recorder {
        Recorder {
            quantiles: default_quantiles(),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Sets the quantiles used to summarize timers.
    pub fn quantiles(mut self, quantiles: &[f64]) -> Self {
        self.quantiles = parse_quantiles(quantiles);
        self
    }

    /// Appends a snapshot under the given time key, returning its index.
    pub fn record(&self, time: String, snapshot: Snapshot) -> usize {
        let mut history = self.history.write();
        let index = history.len();
        history.push(WindowSnapshot::from_snapshot(index, time, snapshot, &self.quantiles));
        index
    }

    /// Number of windows recorded so far.
    pub fn len(&self) -> usize { self.history.read().len() }

    pub fn is_empty(&self) -> bool { self.history.read().is_empty() }

    /// Gets up to `max` windows starting at index `from`.
    ///
    /// When more than `max` windows are available, the most recent ones are returned.  A `from`
    /// outside of the history starts from the beginning instead.
    pub fn page(&self, from: i64, max: usize) -> Vec<WindowSnapshot> {
        let history = self.history.read();

        let start = if from < 0 || from as u64 > history.len() as u64 {
            info!("moving start {} to be within range [0, {}]", from, history.len());
            0
        } else {
            from as usize
        };

        let page = &history[start..];
        let page = if page.len() > max { &page[page.len() - max..] } else { page };
        page.to_vec()
    }

    /// Renders a page of windows as a JSON array.
    pub fn render_json(&self, from: i64, max: usize) -> serde_json::Result<String> {
        serde_json::to_string(&self.page(from, max))
    }
}
