use crate::data::Snapshot;
use std::{
    collections::BTreeMap,
    io::{self, Write},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NothingPrinted,
    EmptyPrinted,
    StatsPrinted,
}

/// Renders flushed snapshots as text.
///
/// Consecutive empty snapshots are collapsed: the first prints `Metrics: no new metrics.` and
/// each one after it only prints a `.`, until metrics show up again.
pub struct Printer {
    suppress_empty: bool,
    state: State,
}

impl Default for Printer {
    fn default() -> Self { Printer::new() }
}

impl Printer {
    pub fn new() -> Printer {
        Printer {
            suppress_empty: true,
            state: State::NothingPrinted,
        }
    }

    /// Sets whether empty snapshots are collapsed.
    ///
    /// Defaults to `true`.  When disabled, empty snapshots are printed in full.
    pub fn suppress_empty(mut self, suppress_empty: bool) -> Self {
        self.suppress_empty = suppress_empty;
        self
    }

    /// Writes the snapshot to `out`.
    pub fn print<W: Write>(&mut self, out: &mut W, snapshot: &Snapshot) -> io::Result<()> {
        if self.suppress_empty && snapshot.is_empty() {
            if self.state == State::EmptyPrinted {
                write!(out, ".")?;
            } else {
                write!(out, "Metrics: no new metrics.")?;
            }
            self.state = State::EmptyPrinted;
            return out.flush();
        }

        if self.state == State::EmptyPrinted {
            writeln!(out)?;
            writeln!(out)?;
        }
        self.state = State::StatsPrinted;

        let counters: BTreeMap<_, _> = snapshot.counters().iter().collect();
        let gauges: BTreeMap<_, _> = snapshot.gauges().iter().collect();
        let timers: BTreeMap<_, _> = snapshot.timers().iter().collect();

        writeln!(out, "Metrics:")?;
        writeln!(out, "  Counters ({})", counters.len())?;
        for (name, value) in counters {
            writeln!(out, "    {:>15}: {:>6}", name, value)?;
        }
        writeln!(out, "  Gauges   ({})", gauges.len())?;
        for (name, value) in gauges {
            writeln!(out, "    {:>15}: {:>6}", name, value)?;
        }
        writeln!(out, "  Timers   ({})", timers.len())?;
        for (name, samples) in timers {
            writeln!(out, "    {:>15}: {:?}", name, samples)?;
        }
        writeln!(out)?;
        out.flush()
    }
}
