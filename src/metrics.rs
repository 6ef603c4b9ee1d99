use crate::{
    data::{Generation, MetricMap, Snapshot},
    protocol::{current_record, next_record, parse_int, parse_millis, parse_name, Field, MetricType, ProtocolError},
};
use parking_lot::RwLock;
use std::{error, fmt, mem, sync::Arc, time::Duration};

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Error from processing a packet, identifying the record that stopped processing.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketError {
    /// The offending record, up to the next newline.
    pub record: String,

    /// Number of records in the packet that were applied before the failing one.
    pub applied: usize,

    /// Why the record was rejected.
    pub error: ProtocolError,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "record {:?} (after {} applied): {}", self.record, self.applied, self.error)
    }
}

impl error::Error for PacketError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> { Some(&self.error) }
}

struct Inner {
    generation: Generation,
    on_update: Vec<Callback>,
}

/// All the metrics collected by a statsd server.
///
/// `Metrics` is shared between the ingestion loop, which writes to it, and any number of readers
/// that take snapshots or flush it.  A single readers-writer lock guards the live generation and
/// the update callbacks, and is never held while a callback runs.
pub struct Metrics {
    inner: RwLock<Inner>,
}

impl Default for Metrics {
    fn default() -> Self { Metrics::new() }
}

impl Metrics {
    /// Creates an empty set of metrics.
    pub fn new() -> Metrics {
        Metrics {
            inner: RwLock::new(Inner {
                generation: Generation::default(),
                on_update: Vec::new(),
            }),
        }
    }

    /// Adds `value` to the counter `name`.
    ///
    /// Integer values are used as-is; decimal values are truncated toward zero.
    pub fn apply_counter(&self, name: &[u8], value: &[u8]) -> Result<(), ProtocolError> {
        let delta = parse_int(MetricType::Counter, value)?;
        let name = parse_name(name)?;

        self.inner.write().generation.counters.update(name, delta);
        Ok(())
    }

    /// Sets the gauge `name` to `value`, following the same parsing rules as counters.
    pub fn apply_gauge(&self, name: &[u8], value: &[u8]) -> Result<(), ProtocolError> {
        let value = parse_int(MetricType::Gauge, value)?;
        let name = parse_name(name)?;

        self.inner.write().generation.gauges.update(name, value);
        Ok(())
    }

    /// Appends a sample of `value` milliseconds to the timer `name`.
    pub fn apply_timer(&self, name: &[u8], value: &[u8]) -> Result<(), ProtocolError> {
        let sample = parse_millis(value)?;
        let name = parse_name(name)?;

        self.inner.write().generation.timers.update(name, sample);
        Ok(())
    }

    /// Validates a tokenized record and applies it according to its type tag.
    pub fn dispatch(&self, name: &[u8], value: &[u8], kind: &[u8]) -> Result<(), ProtocolError> {
        if name.is_empty() {
            return Err(ProtocolError::MissingField(Field::Name));
        }
        if value.is_empty() {
            return Err(ProtocolError::MissingField(Field::Value));
        }

        match MetricType::from_tag(kind)? {
            MetricType::Counter => self.apply_counter(name, value),
            MetricType::Gauge => self.apply_gauge(name, value),
            MetricType::Timer => self.apply_timer(name, value),
        }
    }

    /// Applies every record in `packet`, in order.
    ///
    /// Processing stops at the first record that fails; records before it stay applied.  Returns
    /// the number of records applied.
    pub fn process_packet(&self, packet: &[u8]) -> Result<usize, PacketError> {
        let mut remaining = packet;
        let mut applied = 0;

        while !remaining.is_empty() {
            let result = next_record(remaining).and_then(|(record, rest)| {
                self.dispatch(record.name, record.value, record.kind)?;
                Ok(rest)
            });

            match result {
                Ok(rest) => {
                    applied += 1;
                    remaining = rest;
                },
                Err(error) => {
                    return Err(PacketError {
                        record: String::from_utf8_lossy(current_record(remaining)).into_owned(),
                        applied,
                        error,
                    })
                },
            }
        }

        Ok(applied)
    }

    /// Returns a copy of all the counters.
    pub fn counters(&self) -> MetricMap<i64> { self.inner.read().generation.counters.data().clone() }

    /// Returns a copy of all the gauges.
    pub fn gauges(&self) -> MetricMap<i64> { self.inner.read().generation.gauges.data().clone() }

    /// Returns a copy of all the timers.
    pub fn timers(&self) -> MetricMap<Vec<Duration>> { self.inner.read().generation.timers.data().clone() }

    /// Current value of the counter `name`, or zero if it has no value in this generation.
    pub fn counter(&self, name: &str) -> i64 { self.inner.read().generation.counters.value(name) }

    /// Current value of the gauge `name`.
    pub fn gauge(&self, name: &str) -> Option<i64> { self.inner.read().generation.gauges.value(name) }

    /// Copy of the samples recorded so far for the timer `name`.
    pub fn timer(&self, name: &str) -> Option<Vec<Duration>> {
        self.inner.read().generation.timers.samples(name).map(|s| s.to_vec())
    }

    /// Takes a snapshot of all the metrics and starts a fresh, empty generation.
    ///
    /// The live maps are handed to the snapshot rather than copied.
    pub fn flush_and_snapshot(&self) -> Snapshot {
        let generation = mem::take(&mut self.inner.write().generation);
        generation.into_snapshot()
    }

    /// Takes a snapshot of all the metrics without resetting them.
    pub fn snapshot(&self) -> Snapshot { self.inner.read().generation.to_snapshot() }

    /// Registers a callback that is invoked after each packet is processed.
    ///
    /// Callbacks run on the ingestion thread, in registration order, and cannot be removed.
    pub fn add_on_update<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.write().on_update.push(Arc::new(f));
    }

    /// Invokes every registered update callback.
    pub fn notify(&self) {
        let callbacks = self.inner.read().on_update.clone();
        for callback in &callbacks {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;
    use crate::protocol::{Field, MetricType, ProtocolError};
    use std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    fn process_all(metrics: &Metrics, packets: &[&str]) -> usize {
        packets
            .iter()
            .filter(|packet| metrics.process_packet(packet.as_bytes()).is_err())
            .count()
    }

    #[test]
    fn test_process_single_counter() {
        let metrics = Metrics::new();
        assert_eq!(metrics.process_packet(b"counter1:1|c"), Ok(1));

        let snapshot = metrics.flush_and_snapshot();
        assert_eq!(snapshot.count("counter1"), Some(1));
        assert!(snapshot.gauges().is_empty());
        assert!(snapshot.timers().is_empty());
    }

    #[test]
    fn test_process_malformed_packets() {
        let cases: &[(&str, ProtocolError)] = &[
            ("counter1|c:1", ProtocolError::DelimiterNotFound(b'|')),
            ("counter1|c", ProtocolError::DelimiterNotFound(b':')),
            ("counter1:1", ProtocolError::DelimiterNotFound(b'|')),
            ("counter1:1|", ProtocolError::UnknownType(String::new())),
            (":1|c", ProtocolError::MissingField(Field::Name)),
            ("c:|c", ProtocolError::MissingField(Field::Value)),
            ("c:1|h", ProtocolError::UnknownType("h".to_owned())),
        ];

        for (packet, expected) in cases {
            let metrics = Metrics::new();
            let err = metrics.process_packet(packet.as_bytes()).unwrap_err();
            assert_eq!(&err.error, expected, "packet {:?}", packet);
            assert_eq!(err.applied, 0);
            assert_eq!(err.record, *packet);
            assert!(metrics.flush_and_snapshot().is_empty(), "packet {:?} changed state", packet);
        }
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let metrics = Metrics::new();

        for packet in [&b"req\xff:1|c"[..], &b"req\xfe:1|c"[..]] {
            let err = metrics.process_packet(packet).unwrap_err();
            assert_eq!(err.applied, 0);
            assert!(matches!(err.error, ProtocolError::InvalidName(_)), "got {:?}", err.error);
        }
        assert!(metrics.counters().is_empty());

        let err = metrics.process_packet(b"ok:1|c
bad\xff:2|g
t1:1|ms").unwrap_err();
        assert_eq!(err.applied, 1);
        assert!(matches!(err.error, ProtocolError::InvalidName(_)));

        let snapshot = metrics.flush_and_snapshot();
        assert_eq!(snapshot.count("ok"), Some(1));
        assert!(snapshot.gauges().is_empty());
        assert!(snapshot.timers().is_empty());
    }

    #[test]
    fn test_process_multi_record_packet() {
        let metrics = Metrics::new();
        assert_eq!(metrics.process_packet(b"c1:1|c\nc1:2|c\nc1:9|c\nc1:5|g"), Ok(4));

        let snapshot = metrics.flush_and_snapshot();
        assert_eq!(snapshot.counters().len(), 1);
        assert_eq!(snapshot.count("c1"), Some(12));
        assert_eq!(snapshot.gauge("c1"), Some(5));
    }

    #[test]
    fn test_process_multiple_packets() {
        let metrics = Metrics::new();
        let failures = process_all(&metrics, &["counter1:1|c", "counter1:3|c", "counter1:5|g\nt1:10|ms\n"]);
        assert_eq!(failures, 0);

        let snapshot = metrics.flush_and_snapshot();
        assert_eq!(snapshot.count("counter1"), Some(4));
        assert_eq!(snapshot.gauge("counter1"), Some(5));
        assert_eq!(snapshot.timer("t1"), Some(&[Duration::from_millis(10)][..]));
    }

    #[test]
    fn test_process_aborts_after_first_error() {
        let metrics = Metrics::new();
        let err = metrics.process_packet(b"c1:1|c\nbad").unwrap_err();
        assert_eq!(err.applied, 1);
        assert_eq!(err.record, "bad");
        assert_eq!(err.error, ProtocolError::DelimiterNotFound(b':'));

        let err = metrics.process_packet(b"c1:1|c\nc2:x|c\nc3:1|c").unwrap_err();
        assert_eq!(err.applied, 1);
        assert_eq!(err.record, "c2:x|c");
        match err.error {
            ProtocolError::Parse { kind, .. } => assert_eq!(kind, MetricType::Counter),
            other => panic!("expected parse error, got {:?}", other),
        }

        let snapshot = metrics.flush_and_snapshot();
        assert_eq!(snapshot.count("c1"), Some(2));
        assert_eq!(snapshot.count("c2"), None);
        assert_eq!(snapshot.count("c3"), None);
    }

    #[test]
    fn test_process_empty_packet() {
        let metrics = Metrics::new();
        assert_eq!(metrics.process_packet(b""), Ok(0));
        assert!(metrics.snapshot().is_empty());
    }

    #[test]
    fn test_apply_counter() {
        let cases: &[(&[&str], i64, bool)] = &[
            (&["1"], 1, false),
            (&["1", "2", "3"], 6, false),
            (&["1.0"], 1, false),
            (&["2.7", "-0.5"], 2, false),
            (&["abc"], 0, true),
            (&["1", "abc", "9"], 10, true),
        ];

        for (values, expected, want_err) in cases {
            let metrics = Metrics::new();
            let mut failed = false;
            for value in values.iter() {
                failed |= metrics.apply_counter(b"counter1", value.as_bytes()).is_err();
            }
            assert_eq!(failed, *want_err, "values {:?}", values);
            assert_eq!(metrics.counter("counter1"), *expected, "values {:?}", values);
        }
    }

    #[test]
    fn test_apply_gauge() {
        let cases: &[(&[&str], Option<i64>, bool)] = &[
            (&["1"], Some(1), false),
            (&["1", "2", "3"], Some(3), false),
            (&["1.9"], Some(1), false),
            (&["abc"], None, true),
            (&["1", "abc", "9"], Some(9), true),
        ];

        for (values, expected, want_err) in cases {
            let metrics = Metrics::new();
            let mut failed = false;
            for value in values.iter() {
                failed |= metrics.apply_gauge(b"g1", value.as_bytes()).is_err();
            }
            assert_eq!(failed, *want_err, "values {:?}", values);
            assert_eq!(metrics.gauge("g1"), *expected, "values {:?}", values);
            assert_eq!(metrics.gauges().get("g1").cloned(), *expected);
        }
    }

    #[test]
    fn test_apply_timer() {
        let metrics = Metrics::new();
        for value in &["1.35", "abc", "9.123456789", "2"] {
            let _ = metrics.apply_timer(b"t1", value.as_bytes());
        }

        let expected = vec![
            Duration::from_micros(1350),
            Duration::from_nanos(9_123_456),
            Duration::from_millis(2),
        ];
        assert_eq!(metrics.timer("t1"), Some(expected.clone()));
        assert_eq!(metrics.timers().get("t1"), Some(&expected));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let metrics = Metrics::new();
        assert_eq!(metrics.process_packet(b"x:1|c\nx:2|g\nx:3|ms"), Ok(3));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.count("x"), Some(1));
        assert_eq!(snapshot.gauge("x"), Some(2));
        assert_eq!(snapshot.timer("x"), Some(&[Duration::from_millis(3)][..]));
    }

    #[test]
    fn test_getters_return_copies() {
        let metrics = Metrics::new();
        metrics.apply_counter(b"c1", b"1").unwrap();

        let mut counters = metrics.counters();
        counters.insert("c1".to_owned(), 100);
        counters.insert("c2".to_owned(), 5);

        assert_eq!(metrics.counter("c1"), 1);
        assert_eq!(metrics.counters().len(), 1);
    }

    #[test]
    fn test_flush_resets() {
        let metrics = Metrics::new();
        metrics.process_packet(b"c1:5|c\ng1:3|g").unwrap();

        let first = metrics.flush_and_snapshot();
        assert_eq!(first.count("c1"), Some(5));

        let second = metrics.flush_and_snapshot();
        assert!(second.is_empty());

        metrics.process_packet(b"c1:1|c").unwrap();
        assert_eq!(metrics.flush_and_snapshot().count("c1"), Some(1));
    }

    #[test]
    fn test_snapshot_does_not_disturb_flush() {
        let metrics = Metrics::new();
        metrics.process_packet(b"c1:5|c\ng1:3|g\nt1:1.5|ms").unwrap();

        let copy = metrics.snapshot();
        let flushed = metrics.flush_and_snapshot();
        assert_eq!(copy, flushed);
        assert_eq!(flushed.timer("t1"), Some(&[Duration::from_micros(1500)][..]));
    }

    #[test]
    fn test_flush_is_atomic_with_concurrent_writers() {
        const RECORDS: i64 = 20_000;

        let metrics = Arc::new(Metrics::new());
        let written = Arc::new(AtomicBool::new(false));

        let writer = {
            let metrics = Arc::clone(&metrics);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                for _ in 0..RECORDS {
                    metrics.process_packet(b"c1:1|c").unwrap();
                }
                written.store(true, Ordering::SeqCst);
            })
        };

        let reader = {
            let metrics = Arc::clone(&metrics);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                while !written.load(Ordering::SeqCst) {
                    let count = metrics.snapshot().count("c1").unwrap_or(0);
                    assert!((0..=RECORDS).contains(&count));
                }
            })
        };

        let mut total = 0;
        while !written.load(Ordering::SeqCst) {
            total += metrics.flush_and_snapshot().count("c1").unwrap_or(0);
        }
        writer.join().unwrap();
        reader.join().unwrap();

        total += metrics.flush_and_snapshot().count("c1").unwrap_or(0);
        assert_eq!(total, RECORDS);
    }

    #[test]
    fn test_notify_calls_in_order() {
        let metrics = Arc::new(Metrics::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&calls);
        metrics.add_on_update(move || {
            assert_eq!(first.fetch_add(1, Ordering::SeqCst) % 2, 0);
        });
        let second = Arc::clone(&calls);
        metrics.add_on_update(move || {
            assert_eq!(second.fetch_add(1, Ordering::SeqCst) % 2, 1);
        });

        metrics.notify();
        metrics.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_callback_can_query_store() {
        let metrics = Arc::new(Metrics::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let reader = Arc::clone(&metrics);
        let sink = Arc::clone(&seen);
        metrics.add_on_update(move || {
            sink.store(reader.counter("c1") as usize, Ordering::SeqCst);
        });

        metrics.process_packet(b"c1:7|c").unwrap();
        metrics.notify();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
