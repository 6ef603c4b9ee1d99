use super::MetricMap;

/// Last-write-wins integer metrics.
#[derive(Default)]
pub(crate) struct Gauge {
    data: MetricMap<i64>,
}

impl Gauge {
    pub fn update(&mut self, key: &str, value: i64) {
        match self.data.get_mut(key) {
            Some(entry) => *entry = value,
            None => {
                let _ = self.data.insert(key.to_owned(), value);
            },
        }
    }

    pub fn value(&self, key: &str) -> Option<i64> { self.data.get(key).cloned() }

    pub fn data(&self) -> &MetricMap<i64> { &self.data }

    pub fn into_inner(self) -> MetricMap<i64> { self.data }
}

#[cfg(test)]
mod tests {
    use super::Gauge;

    #[test]
    fn test_gauge_missing_value() {
        let gauge = Gauge::default();
        assert_eq!(gauge.value("foo"), None);
    }

    #[test]
    fn test_gauge_last_write_wins() {
        let mut gauge = Gauge::default();
        gauge.update("foo", 1);
        gauge.update("foo", 2);
        gauge.update("foo", 3);

        assert_eq!(gauge.value("foo"), Some(3));
        assert_eq!(gauge.data().len(), 1);
    }
}
