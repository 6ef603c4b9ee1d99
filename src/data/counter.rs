use super::MetricMap;

/// Cumulative integer metrics.
#[derive(Default)]
pub(crate) struct Counter {
    data: MetricMap<i64>,
}

impl Counter {
    /// Adds `delta` to the counter, creating it at zero first if it doesn't exist.
    ///
    /// Accumulation wraps on overflow.
    pub fn update(&mut self, key: &str, delta: i64) {
        match self.data.get_mut(key) {
            Some(entry) => *entry = entry.wrapping_add(delta),
            None => {
                let _ = self.data.insert(key.to_owned(), delta);
            },
        }
    }

    pub fn value(&self, key: &str) -> i64 { *self.data.get(key).unwrap_or(&0) }

    pub fn data(&self) -> &MetricMap<i64> { &self.data }

    pub fn into_inner(self) -> MetricMap<i64> { self.data }
}

#[cfg(test)]
mod tests {
    use super::Counter;

    #[test]
    fn test_counter_missing_value() {
        let counter = Counter::default();
        assert_eq!(counter.value("foo"), 0);
        assert!(counter.data().is_empty());
    }

    #[test]
    fn test_counter_simple_update() {
        let mut counter = Counter::default();
        counter.update("foo", 42);
        assert_eq!(counter.value("foo"), 42);
    }

    #[test]
    fn test_counter_accumulates() {
        let mut counter = Counter::default();
        counter.update("foo", 1);
        counter.update("foo", 2);
        counter.update("foo", -5);
        counter.update("bar", 9);

        assert_eq!(counter.value("foo"), -2);
        assert_eq!(counter.value("bar"), 9);
        assert_eq!(counter.data().len(), 2);
    }

    #[test]
    fn test_counter_wraps() {
        let mut counter = Counter::default();
        counter.update("foo", i64::max_value());
        counter.update("foo", 1);
        assert_eq!(counter.value("foo"), i64::min_value());
    }
}
