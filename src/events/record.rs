//! Scalar Record - one logged value of one tag at one step

use chrono::{DateTime, Utc};

/// A single scalar data point read from a run.
///
/// Records keep the order in which the reader produced them. Several records
/// of the same run may share a `(tag, step)` pair; the alignment engine
/// decides what to do with them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    tag: String,
    step: i64,
    wall_time: f64,
    value: f64,
}

impl ScalarRecord {
    /// Create a new scalar record stamped with the current wall time.
    ///
    /// # Arguments
    ///
    /// * `tag` - Scalar name (e.g., "train/loss")
    /// * `step` - Training step the value was logged at
    /// * `value` - Logged value
    #[must_use]
    pub fn new(tag: impl Into<String>, step: i64, value: f64) -> Self {
        Self::builder(tag, step, value).build()
    }

    /// Create a builder for a record with an explicit wall time.
    #[must_use]
    pub fn builder(tag: impl Into<String>, step: i64, value: f64) -> ScalarRecordBuilder {
        ScalarRecordBuilder::new(tag, step, value)
    }

    /// Get the tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Get the step.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Get the wall time in seconds since the Unix epoch.
    #[must_use]
    pub const fn wall_time(&self) -> f64 {
        self.wall_time
    }

    /// Get the value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}

/// Builder for `ScalarRecord`.
#[derive(Debug)]
pub struct ScalarRecordBuilder {
    tag: String,
    step: i64,
    wall_time: f64,
    value: f64,
}

impl ScalarRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(tag: impl Into<String>, step: i64, value: f64) -> Self {
        Self {
            tag: tag.into(),
            step,
            wall_time: unix_seconds(Utc::now()),
            value,
        }
    }

    /// Set the wall time (seconds since the Unix epoch).
    #[must_use]
    pub const fn wall_time(mut self, wall_time: f64) -> Self {
        self.wall_time = wall_time;
        self
    }

    /// Build the `ScalarRecord`.
    #[must_use]
    pub fn build(self) -> ScalarRecord {
        ScalarRecord {
            tag: self.tag,
            step: self.step,
            wall_time: self.wall_time,
            value: self.value,
        }
    }
}

/// Seconds since the Unix epoch with microsecond resolution, as stored in events.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn unix_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1e6
}
