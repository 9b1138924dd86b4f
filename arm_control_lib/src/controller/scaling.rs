use crate::error::{ControllerError, Result};
use crate::types::{clamp_elementwise, ControlRange};
use nalgebra::DVector;
use std::cell::OnceCell;

#[derive(Debug, Clone)]
struct AffineTransform {
    scale: DVector<f64>,
    input_mid: DVector<f64>,
    output_mid: DVector<f64>,
}

/// Clamp-then-rescale mapping from a controller's input range onto its
/// output range.
///
/// The affine coefficients are derived on first use and reused afterwards;
/// the ranges never change once the scaler exists.
#[derive(Debug, Clone)]
pub struct ActionScaler {
    range: ControlRange,
    transform: OnceCell<AffineTransform>,
}

impl ActionScaler {
    pub fn new(range: ControlRange) -> Self {
        Self {
            range,
            transform: OnceCell::new(),
        }
    }

    pub fn range(&self) -> &ControlRange {
        &self.range
    }

    pub fn control_dim(&self) -> usize {
        self.range.dim()
    }

    /// `(input_min, input_max)`.
    pub fn control_limits(&self) -> (&DVector<f64>, &DVector<f64>) {
        (&self.range.input_min, &self.range.input_max)
    }

    fn transform(&self) -> &AffineTransform {
        self.transform.get_or_init(|| {
            let range = &self.range;
            let output_span = (&range.output_max - &range.output_min).abs();
            let input_span = (&range.input_max - &range.input_min).abs();
            AffineTransform {
                // zero-width inputs collapse to the output midpoint
                scale: output_span.zip_map(&input_span, |out, inp| {
                    if inp > 0.0 {
                        out / inp
                    } else {
                        0.0
                    }
                }),
                input_mid: (&range.input_max + &range.input_min) / 2.0,
                output_mid: (&range.output_max + &range.output_min) / 2.0,
            }
        })
    }

    /// Clamp `action` to the input range, then map it onto the output range.
    pub fn scale_action(&self, action: &DVector<f64>) -> Result<DVector<f64>> {
        if action.len() != self.control_dim() {
            return Err(ControllerError::dimension(
                "action",
                self.control_dim(),
                action.len(),
            ));
        }

        let transform = self.transform();
        let clamped = clamp_elementwise(action, &self.range.input_min, &self.range.input_max);
        Ok((clamped - &transform.input_mid).component_mul(&transform.scale) + &transform.output_mid)
    }
}
