use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};

/// Indexes into the backend's joint, `qpos` and `qvel` arrays that belong to
/// one controlled arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointIndexes {
    pub joints: Vec<usize>,
    pub qpos: Vec<usize>,
    pub qvel: Vec<usize>,
}

impl JointIndexes {
    /// Index sets for a chain whose joints, positions and velocities all
    /// share the same contiguous numbering.
    pub fn contiguous(range: std::ops::Range<usize>) -> Self {
        let indexes: Vec<usize> = range.collect();
        Self {
            joints: indexes.clone(),
            qpos: indexes.clone(),
            qvel: indexes,
        }
    }

    /// Number of controlled joints.
    pub fn dim(&self) -> usize {
        self.joints.len()
    }

    /// Check the three index sets against each other and against the sizes of
    /// the backend's position (`nq`) and velocity (`nv`) arrays.
    pub fn validate(&self, nq: usize, nv: usize) -> Result<()> {
        if self.joints.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "joint index set is empty".to_string(),
            ));
        }
        if self.qpos.len() != self.joints.len() {
            return Err(ControllerError::dimension(
                "qpos index set",
                self.joints.len(),
                self.qpos.len(),
            ));
        }
        if self.qvel.len() != self.joints.len() {
            return Err(ControllerError::dimension(
                "qvel index set",
                self.joints.len(),
                self.qvel.len(),
            ));
        }

        let bounds = [
            ("joint", &self.joints, nv),
            ("qpos", &self.qpos, nq),
            ("qvel", &self.qvel, nv),
        ];
        for (what, indexes, len) in bounds {
            if let Some(&index) = indexes.iter().find(|&&i| i >= len) {
                return Err(ControllerError::IndexOutOfRange { what, index, len });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_indexes() {
        let indexes = JointIndexes::contiguous(2..5);
        assert_eq!(indexes.joints, vec![2, 3, 4]);
        assert_eq!(indexes.dim(), 3);
        assert!(indexes.validate(5, 5).is_ok());
    }

    #[test]
    fn test_out_of_range_index() {
        let indexes = JointIndexes::contiguous(0..7);
        let err = indexes.validate(9, 6).unwrap_err();
        assert_eq!(
            err,
            ControllerError::IndexOutOfRange {
                what: "joint",
                index: 6,
                len: 6
            }
        );
    }

    #[test]
    fn test_mismatched_sets() {
        let mut indexes = JointIndexes::contiguous(0..3);
        indexes.qvel.pop();
        assert!(matches!(
            indexes.validate(3, 3),
            Err(ControllerError::DimensionMismatch { what: "qvel index set", .. })
        ));
    }
}
