//! Private state of stateful function tokens
//!
//! Each stateful token owns one of these structures for the lifetime of the
//! compiled expression. Two occurrences of the same function never share
//! history.

use crate::date::{self, CalendarUnit};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Hard ceiling on retained samples when an upstream variable stalls
pub const DEFAULT_HISTORY_LIMIT: usize = 100_000;

/// Summary statistic computed over a retained history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Average,
    Max,
    Min,
    Median,
    Total,
    StdDev,
}

/// One retained observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Bounded history of finite samples with running Σx and Σx²
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<Sample>,
    sum: f64,
    sum_sq: f64,
    limit: usize,
    cap_warned: bool,
}

impl SampleHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            sum: 0.0,
            sum_sq: 0.0,
            limit: limit.max(1),
            cap_warned: false,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Append in arrival order; non-finite values are not retained
    pub fn push_back(&mut self, sample: Sample) -> bool {
        if !sample.value.is_finite() {
            return false;
        }
        self.samples.push_back(sample);
        self.account(sample.value);
        self.enforce_limit();
        true
    }

    /// Insert keeping timestamp order; equal timestamps keep arrival order
    pub fn insert_ordered(&mut self, sample: Sample) -> bool {
        if !sample.value.is_finite() {
            return false;
        }
        let at = self
            .samples
            .partition_point(|s| s.timestamp <= sample.timestamp);
        self.samples.insert(at, sample);
        self.account(sample.value);
        self.enforce_limit();
        true
    }

    /// Evict the `count` oldest samples
    ///
    /// Σx and Σx² are rebuilt from what remains. Subtracting an evicted
    /// outlier would cancel the smaller samples still retained.
    pub fn evict_front(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
        self.resync();
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    /// Keep only the newest `count` samples
    pub fn truncate_to(&mut self, count: usize) {
        self.evict_front(self.samples.len().saturating_sub(count));
    }

    /// Statistic over the retained samples; NaN when nothing is retained
    pub fn evaluate(&self, stat: Statistic) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        let n = self.samples.len() as f64;
        match stat {
            Statistic::Total => self.sum,
            Statistic::Average => self.sum / n,
            Statistic::Max => self
                .samples
                .iter()
                .map(|s| s.value)
                .fold(f64::NEG_INFINITY, f64::max),
            Statistic::Min => self
                .samples
                .iter()
                .map(|s| s.value)
                .fold(f64::INFINITY, f64::min),
            Statistic::Median => {
                let mut sorted: Vec<f64> = self.samples.iter().map(|s| s.value).collect();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            },
            // Population standard deviation from the running sums
            Statistic::StdDev => {
                let variance = (self.sum_sq - self.sum * self.sum / n) / n;
                variance.max(0.0).sqrt()
            },
        }
    }

    fn account(&mut self, value: f64) {
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn resync(&mut self) {
        let (sum, sum_sq) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(sum, sum_sq), s| (sum + s.value, sum_sq + s.value * s.value));
        self.sum = sum;
        self.sum_sq = sum_sq;
    }

    fn enforce_limit(&mut self) {
        if self.samples.len() <= self.limit {
            return;
        }
        if !self.cap_warned {
            warn!(
                limit = self.limit,
                "history limit reached, evicting oldest samples"
            );
            self.cap_warned = true;
        }
        self.truncate_to(self.limit);
    }
}

/// Count-windowed history: keeps the last N samples
#[derive(Debug, Clone)]
pub struct CountWindow {
    history: SampleHistory,
}

impl CountWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            history: SampleHistory::new(limit),
        }
    }

    /// Add a sample and slide the window; `count <= 0` keeps everything
    pub fn add(&mut self, sample: Sample, count: i64) -> &SampleHistory {
        self.history.push_back(sample);
        if count > 0 {
            self.history
                .truncate_to(usize::try_from(count).unwrap_or(usize::MAX));
        }
        &self.history
    }
}

/// Eviction boundary of a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Evict when the age is strictly greater than the range
    Exclusive,
    /// Evict when the age is greater than or equal to the range
    Inclusive,
}

impl Boundary {
    fn evicts(self, age: i64, range: i64) -> bool {
        match self {
            Self::Exclusive => age > range,
            Self::Inclusive => age >= range,
        }
    }
}

/// Time-windowed history: keeps samples within `range` of the newest one
#[derive(Debug, Clone)]
pub struct TimeWindow {
    history: SampleHistory,
    boundary: Boundary,
}

impl TimeWindow {
    pub fn new(boundary: Boundary, limit: usize) -> Self {
        Self {
            history: SampleHistory::new(limit),
            boundary,
        }
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Add a sample and evict by age; the newest sample is always retained
    pub fn add(&mut self, sample: Sample, range: i64) -> &SampleHistory {
        self.history.insert_ordered(sample);
        let range = range.max(0);
        if let Some(newest) = self.history.newest().map(|s| s.timestamp) {
            // the newest sample is never evicted
            let expired = self
                .history
                .samples
                .iter()
                .take(self.history.len().saturating_sub(1))
                .take_while(|s| self.boundary.evicts(newest.saturating_sub(s.timestamp), range))
                .count();
            self.history.evict_front(expired);
        }
        &self.history
    }
}

/// History discarded at calendar boundaries or on a caller-supplied flag
#[derive(Debug, Clone)]
pub struct ResetWindow {
    history: SampleHistory,
}

impl ResetWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            history: SampleHistory::new(limit),
        }
    }

    /// Clear when `sample` falls outside the calendar unit of the newest retained sample
    pub fn add_calendar(&mut self, sample: Sample, unit: Option<CalendarUnit>) -> &SampleHistory {
        if let (Some(unit), Some(newest)) = (unit, self.history.newest()) {
            if !date::same_period(unit, newest.timestamp, sample.timestamp) {
                debug!(?unit, discarded = self.history.len(), "calendar reset");
                self.history.clear();
            }
        }
        self.history.push_back(sample);
        &self.history
    }

    /// Clear first when `reset` is set
    pub fn add_flagged(&mut self, sample: Sample, reset: bool) -> &SampleHistory {
        if reset {
            debug!(discarded = self.history.len(), "flag reset");
            self.history.clear();
        }
        self.history.push_back(sample);
        &self.history
    }
}

/// Time integral state (rectangle rule over record timestamps)
#[derive(Debug, Clone, Default)]
pub struct IntegrateState {
    last_ts: Option<i64>,
    accumulated: f64,
}

impl IntegrateState {
    /// Accumulate `value * dt_seconds * factor`; the first sample returns 0
    pub fn update(&mut self, sample: Sample, factor: f64) -> f64 {
        if !sample.value.is_finite() {
            return self.accumulated;
        }
        let Some(last_ts) = self.last_ts else {
            self.last_ts = Some(sample.timestamp);
            return 0.0;
        };
        let dt = seconds_between(last_ts, sample.timestamp);
        if dt <= 0.0 {
            return self.accumulated;
        }
        let delta = sample.value * dt * factor;
        self.accumulated += delta;
        self.last_ts = Some(sample.timestamp);
        debug!(
            value = sample.value,
            dt = dt,
            delta = delta,
            accumulated = self.accumulated,
            "integrate"
        );
        self.accumulated
    }
}

/// Rate of change state (per second)
#[derive(Debug, Clone, Default)]
pub struct RateOfChangeState {
    last: Option<Sample>,
}

impl RateOfChangeState {
    pub fn update(&mut self, sample: Sample) -> f64 {
        if !sample.value.is_finite() {
            return f64::NAN;
        }
        let rate = match self.last {
            Some(last) => {
                let dt = seconds_between(last.timestamp, sample.timestamp);
                if dt > 0.0 {
                    (sample.value - last.value) / dt
                } else {
                    0.0
                }
            },
            None => 0.0,
        };
        self.last = Some(sample);
        rate
    }
}

/// Difference from the previous finite sample
#[derive(Debug, Clone, Default)]
pub struct DeltaState {
    last: Option<f64>,
}

impl DeltaState {
    pub fn update(&mut self, value: f64) -> f64 {
        if !value.is_finite() {
            return f64::NAN;
        }
        let delta = self.last.map_or(0.0, |last| value - last);
        self.last = Some(value);
        delta
    }
}

fn seconds_between(from: i64, to: i64) -> f64 {
    (i128::from(to) - i128::from(from)) as f64 / date::NANOS_PER_SECOND as f64
}
