//! Mean ± std envelope

use crate::reduce::Series;
use crate::{Error, Result};

/// Upper and lower bound of the mean ± std band of one tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// `mean + std` per step
    pub upper: Series,
    /// `mean - std` per step
    pub lower: Series,
}

impl Envelope {
    /// Compute the band from a tag's mean and std series.
    ///
    /// # Errors
    ///
    /// Returns error if the two series are not indexed by the same steps
    pub fn new(mean: &Series, std: &Series) -> Result<Self> {
        if mean.steps() != std.steps() {
            return Err(Error::Configuration(
                "mean and std series are not indexed by the same steps".to_string(),
            ));
        }
        let (upper, lower): (Vec<f64>, Vec<f64>) = mean
            .values()
            .iter()
            .zip(std.values())
            .map(|(m, s)| (m + s, m - s))
            .unzip();
        Ok(Self {
            upper: Series::new(mean.steps().to_vec(), upper)?,
            lower: Series::new(mean.steps().to_vec(), lower)?,
        })
    }
}

/// Directory-safe form of a tag.
pub(crate) fn tag_dir_name(tag: &str) -> String {
    tag.replace('/', "_")
}
