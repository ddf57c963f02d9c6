//! Sliding Window Aggregation of Sensor Samples
//!
//! ## Overview
//!
//! Devices sample once per tick but publish once per interval. In between,
//! samples collect in a fixed-capacity ring; at publish time the ring is
//! summarized into min/max/avg for both channels and then logically emptied.
//!
//! ## Design Rationale
//!
//! ### Overwrite, don't queue
//!
//! When publishing stalls (broker down, publish rejected) the window keeps
//! filling. Once full, each new sample overwrites the oldest one, so memory
//! stays fixed under sustained operation and the next successful publish
//! reports the most recent `capacity` samples.
//!
//! ### Reset without clearing
//!
//! `reset()` only zeroes `count`. Stale samples stay physically in the
//! buffer and are overwritten by later pushes; nothing reads past `count`.
//!
//! ```text
//! capacity = 5, after 7 pushes (values 1..=7):
//! ┌───┬───┬───┬───┬───┐
//! │ 6 │ 7 │ 3 │ 4 │ 5 │   physical slots
//! └───┴───┴───┴───┴───┘
//!           ↑
//!           write_pos = 2 (oldest valid sample)
//!
//! logical view: [3, 4, 5, 6, 7], count = 5
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use carbonlink_core::aggregator::{Sample, SlidingAggregator};
//!
//! let mut window = SlidingAggregator::new(15);
//! window.push(Sample::new(420.0, 45.0, 1_000));
//! window.push(Sample::new(480.0, 47.0, 2_000));
//!
//! let report = window.summarize().unwrap();
//! assert_eq!(report.sample_count, 2);
//! assert_eq!(report.max_co2, 480.0);
//! ```

use alloc::vec::Vec;

use crate::errors::AggregateError;
use crate::time::Timestamp;
use crate::traits::Reading;

/// One timestamped sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// CO2 concentration in ppm
    pub co2: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Monotonic time the sample was taken
    pub timestamp: Timestamp,
}

impl Sample {
    /// Build a sample from raw values
    pub const fn new(co2: f32, humidity: f32, timestamp: Timestamp) -> Self {
        Self {
            co2,
            humidity,
            timestamp,
        }
    }

    /// Stamp a sensor reading with the tick time
    pub const fn from_reading(reading: Reading, timestamp: Timestamp) -> Self {
        Self::new(reading.co2, reading.humidity, timestamp)
    }

    /// The reading without its timestamp
    pub const fn reading(&self) -> Reading {
        Reading::new(self.co2, self.humidity)
    }
}

/// Statistics over the valid samples of a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateReport {
    /// Mean CO2 (ppm)
    pub avg_co2: f32,
    /// Highest CO2 (ppm)
    pub max_co2: f32,
    /// Lowest CO2 (ppm)
    pub min_co2: f32,
    /// Mean humidity (%)
    pub avg_humidity: f32,
    /// Highest humidity (%)
    pub max_humidity: f32,
    /// Lowest humidity (%)
    pub min_humidity: f32,
    /// Number of samples summarized
    pub sample_count: usize,
}

/// Fixed-capacity ring of samples with on-demand statistics
///
/// ## Internal Invariants
///
/// - `write_pos < capacity`
/// - `count <= capacity`
/// - valid samples are the `count` slots ending just before `write_pos`
#[derive(Debug, Clone)]
pub struct SlidingAggregator {
    slots: Vec<Sample>,
    capacity: usize,
    write_pos: usize,
    count: usize,
}

impl SlidingAggregator {
    /// Create an empty window holding up to `capacity` samples
    ///
    /// A zero capacity is bumped to one; [`DeviceConfig::validate`](crate::DeviceConfig::validate)
    /// rejects it before it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
            count: 0,
        }
    }

    /// Insert a sample, overwriting the oldest one when full
    pub fn push(&mut self, sample: Sample) {
        if self.write_pos < self.slots.len() {
            self.slots[self.write_pos] = sample;
        } else {
            // First lap: physical storage grows up to capacity once
            self.slots.push(sample);
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;

        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// Summarize the valid samples
    ///
    /// Fails with [`AggregateError::EmptyWindow`] after construction or a
    /// reset, until the next push.
    pub fn summarize(&self) -> Result<AggregateReport, AggregateError> {
        if self.count == 0 {
            return Err(AggregateError::EmptyWindow);
        }

        let mut co2_sum = 0.0f64;
        let mut humidity_sum = 0.0f64;
        let mut max_co2 = f32::MIN;
        let mut min_co2 = f32::MAX;
        let mut max_humidity = f32::MIN;
        let mut min_humidity = f32::MAX;

        for sample in self.iter() {
            co2_sum += f64::from(sample.co2);
            humidity_sum += f64::from(sample.humidity);
            max_co2 = max_co2.max(sample.co2);
            min_co2 = min_co2.min(sample.co2);
            max_humidity = max_humidity.max(sample.humidity);
            min_humidity = min_humidity.min(sample.humidity);
        }

        let n = self.count as f64;
        Ok(AggregateReport {
            avg_co2: (co2_sum / n) as f32,
            max_co2,
            min_co2,
            avg_humidity: (humidity_sum / n) as f32,
            max_humidity,
            min_humidity,
            sample_count: self.count,
        })
    }

    /// Logically empty the window
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Number of valid samples
    pub fn len(&self) -> usize {
        self.count
    }

    /// No valid samples
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Window holds `capacity` valid samples
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Maximum number of samples kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed valid sample
    pub fn latest(&self) -> Option<&Sample> {
        if self.is_empty() {
            return None;
        }
        let idx = if self.write_pos == 0 {
            self.capacity - 1
        } else {
            self.write_pos - 1
        };
        self.slots.get(idx)
    }

    /// Iterate over valid samples from oldest to newest
    pub fn iter(&self) -> WindowIter<'_> {
        WindowIter {
            window: self,
            index: 0,
        }
    }

    /// Map a logical index (0 = oldest valid) to its slot
    ///
    /// The oldest valid sample sits `count` slots behind the write position:
    ///
    /// ```text
    /// physical = (write_pos + capacity - count + index) % capacity
    /// ```
    fn get(&self, index: usize) -> Option<&Sample> {
        if index >= self.count {
            return None;
        }
        let start = (self.write_pos + self.capacity - self.count) % self.capacity;
        self.slots.get((start + index) % self.capacity)
    }
}

/// Iterator over the valid samples of a window
pub struct WindowIter<'a> {
    window: &'a SlidingAggregator,
    index: usize,
}

impl<'a> Iterator for WindowIter<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.window.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.window.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
