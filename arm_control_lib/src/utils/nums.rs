//! Scalar-or-array inputs and their broadcast to fixed-length vectors.

use crate::error::{ControllerError, Result};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// A loosely typed numeric input, as it arrives from configuration files or
/// callers that pass either one gain for every joint or one gain per joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nums {
    Scalar(f64),
    Array(Vec<f64>),
    Text(String),
}

impl From<f64> for Nums {
    fn from(value: f64) -> Self {
        Nums::Scalar(value)
    }
}

impl From<i32> for Nums {
    fn from(value: i32) -> Self {
        Nums::Scalar(f64::from(value))
    }
}

impl From<Vec<f64>> for Nums {
    fn from(values: Vec<f64>) -> Self {
        Nums::Array(values)
    }
}

impl From<&[f64]> for Nums {
    fn from(values: &[f64]) -> Self {
        Nums::Array(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Nums {
    fn from(values: [f64; N]) -> Self {
        Nums::Array(values.to_vec())
    }
}

impl From<&DVector<f64>> for Nums {
    fn from(values: &DVector<f64>) -> Self {
        Nums::Array(values.iter().copied().collect())
    }
}

impl From<&str> for Nums {
    fn from(text: &str) -> Self {
        Nums::Text(text.to_string())
    }
}

impl From<String> for Nums {
    fn from(text: String) -> Self {
        Nums::Text(text)
    }
}

/// Broadcast `nums` into a vector of length `dim`.
///
/// A scalar fills all `dim` entries. An array is passed through as-is and its
/// length is *not* checked against `dim`; callers that need an exact length
/// must check it themselves. Text is rejected with
/// [`ControllerError::InvalidInputType`].
pub fn nums2array(nums: impl Into<Nums>, dim: usize) -> Result<DVector<f64>> {
    match nums.into() {
        Nums::Text(text) => Err(ControllerError::InvalidInputType(text)),
        Nums::Array(values) => Ok(DVector::from_vec(values)),
        Nums::Scalar(value) => Ok(DVector::from_element(dim, value)),
    }
}
