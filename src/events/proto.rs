//! TensorBoard `Event` protobuf subset
//!
//! Only the fields needed for scalars are declared. prost skips unknown
//! fields on decode, so graphs, histograms, images and tensors pass through
//! untouched. `oneof` members are declared as optional fields, which is
//! wire-compatible for a single member.

/// `tensorflow.Event`
#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    /// Seconds since the Unix epoch
    #[prost(double, tag = "1")]
    pub wall_time: f64,
    /// Global step of the event
    #[prost(int64, tag = "2")]
    pub step: i64,
    /// File header, e.g. "brain.Event:2"
    #[prost(string, optional, tag = "3")]
    pub file_version: Option<String>,
    /// Logged summary values
    #[prost(message, optional, tag = "5")]
    pub summary: Option<Summary>,
}

/// `tensorflow.Summary`
#[derive(Clone, PartialEq, prost::Message)]
pub struct Summary {
    /// Values logged in one event
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<SummaryValue>,
}

/// `tensorflow.Summary.Value`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SummaryValue {
    /// Scalar tag
    #[prost(string, tag = "1")]
    pub tag: String,
    /// Scalar payload; `None` for non-scalar summaries
    #[prost(float, optional, tag = "2")]
    pub simple_value: Option<f32>,
}

impl Event {
    /// Event carrying one scalar.
    #[must_use]
    pub fn scalar(wall_time: f64, step: i64, tag: impl Into<String>, value: f32) -> Self {
        Self {
            wall_time,
            step,
            file_version: None,
            summary: Some(Summary {
                value: vec![SummaryValue {
                    tag: tag.into(),
                    simple_value: Some(value),
                }],
            }),
        }
    }
}
