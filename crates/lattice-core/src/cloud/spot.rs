//! Spot price history for one availability zone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::SpotPriceSample;

/// Samples sorted by time; each price holds until the next sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotPriceSeries {
    samples: Vec<SpotPriceSample>,
}

impl SpotPriceSeries {
    pub fn new(mut samples: Vec<SpotPriceSample>) -> Self {
        samples.retain(|s| s.price.is_finite() && s.price >= 0.0);
        samples.sort_by_key(|s| s.at);
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SpotPriceSample] {
        &self.samples
    }

    /// Most recent sample: the "current" spot price.
    pub fn latest(&self) -> Option<SpotPriceSample> {
        self.samples.last().copied()
    }

    /// Price in effect at `at` (the last sample at or before it).
    pub fn price_at(&self, at: DateTime<Utc>) -> Option<f64> {
        let idx = self.samples.partition_point(|s| s.at <= at);
        idx.checked_sub(1).map(|i| self.samples[i].price)
    }

    /// Dollars spent running one instance over `[start, end)`.
    ///
    /// Time before the first sample is not priced. `None` if the range is
    /// empty or entirely before the history.
    pub fn cost_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
        if end <= start {
            return None;
        }

        let mut total = 0.0;
        let mut priced = false;
        for (i, sample) in self.samples.iter().enumerate() {
            let from = sample.at.max(start);
            let until = self
                .samples
                .get(i + 1)
                .map_or(end, |next| next.at.min(end));
            if until <= from {
                continue;
            }
            let hours = (until - from).num_milliseconds() as f64 / 3_600_000.0;
            total += sample.price * hours;
            priced = true;
        }
        priced.then_some(total)
    }

    /// Time-weighted hourly price over `[start, end)`.
    pub fn average_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
        let cost = self.cost_between(start, end)?;
        let first = self.samples.first()?.at.max(start);
        let hours = (end - first).num_milliseconds() as f64 / 3_600_000.0;
        (hours > 0.0).then(|| cost / hours)
    }
}
