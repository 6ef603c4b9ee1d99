use super::MetricMap;
use std::time::Duration;

/// Timing samples, kept in arrival order.
#[derive(Default)]
pub(crate) struct Timer {
    data: MetricMap<Vec<Duration>>,
}

impl Timer {
    pub fn update(&mut self, key: &str, sample: Duration) {
        match self.data.get_mut(key) {
            Some(samples) => samples.push(sample),
            None => {
                let _ = self.data.insert(key.to_owned(), vec![sample]);
            },
        }
    }

    pub fn samples(&self, key: &str) -> Option<&[Duration]> { self.data.get(key).map(|s| s.as_slice()) }

    pub fn data(&self) -> &MetricMap<Vec<Duration>> { &self.data }

    pub fn into_inner(self) -> MetricMap<Vec<Duration>> { self.data }
}
