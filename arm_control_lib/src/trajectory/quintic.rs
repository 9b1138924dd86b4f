use nalgebra::Vector3;

/// Normalised quintic (minimum-jerk) blend and its time derivatives at one
/// instant of a segment.
///
/// `position` rises from 0 at `t = 0` to 1 at `t = duration`; `velocity` and
/// `acceleration` vanish at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuinticBlend {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

impl QuinticBlend {
    /// Evaluate at elapsed time `t` of a segment lasting `duration` (> 0).
    pub fn at(t: f64, duration: f64) -> Self {
        let tf = duration;
        let tf3 = tf.powi(3);

        let position = (6.0 * t.powi(5) / tf.powi(2) - 15.0 * t.powi(4) / tf
            + 10.0 * t.powi(3))
            / tf3;
        let velocity = (30.0 * t.powi(4) / tf.powi(2) - 60.0 * t.powi(3) / tf
            + 30.0 * t.powi(2))
            / tf3;
        let acceleration =
            (120.0 * t.powi(3) / tf.powi(2) - 180.0 * t.powi(2) / tf + 60.0 * t) / tf3;

        Self {
            position,
            velocity,
            acceleration,
        }
    }

    /// Apply the blend component-wise between `initial` and `target`,
    /// returning `(position, velocity, acceleration)`.
    pub fn interpolate(
        &self,
        initial: &Vector3<f64>,
        target: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let delta = target - initial;
        (
            delta * self.position + initial,
            delta * self.velocity,
            delta * self.acceleration,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_boundary_conditions() {
        for &duration in &[0.1, 1.0, 2.0, 3.7, 25.0] {
            let start = QuinticBlend::at(0.0, duration);
            assert_eq!(start.position, 0.0);
            assert_eq!(start.velocity, 0.0);
            assert_eq!(start.acceleration, 0.0);

            let end = QuinticBlend::at(duration, duration);
            assert!((end.position - 1.0).abs() < 1e-9, "duration {duration}");
            assert!(end.velocity.abs() < 1e-9, "duration {duration}");
            assert!(end.acceleration.abs() < 1e-9, "duration {duration}");
        }
    }

    #[test]
    fn test_interpolated_endpoints() {
        let initial = Vector3::new(0.3, -1.2, 4.0);
        let target = Vector3::new(-2.0, 0.5, 4.5);
        let duration = 1.7;

        let (p0, v0, a0) = QuinticBlend::at(0.0, duration).interpolate(&initial, &target);
        assert_abs_diff_eq!(p0, initial, epsilon = 1e-9);
        assert_abs_diff_eq!(v0, Vector3::zeros(), epsilon = 1e-9);
        assert_abs_diff_eq!(a0, Vector3::zeros(), epsilon = 1e-9);

        let (p1, v1, a1) = QuinticBlend::at(duration, duration).interpolate(&initial, &target);
        assert_abs_diff_eq!(p1, target, epsilon = 1e-9);
        assert_abs_diff_eq!(v1, Vector3::zeros(), epsilon = 1e-9);
        assert_abs_diff_eq!(a1, Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_midpoint_symmetry() {
        let mid = QuinticBlend::at(1.0, 2.0);
        assert_eq!(mid.position, 0.5);
        assert!(mid.acceleration.abs() < 1e-12);

        let before = QuinticBlend::at(0.9, 2.0);
        let after = QuinticBlend::at(1.1, 2.0);
        assert!(mid.velocity > before.velocity);
        assert!(mid.velocity > after.velocity);
        // peak velocity of the minimum-jerk profile is 15 / (8 T)
        assert!((mid.velocity - 15.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_blend_is_monotonic() {
        let duration = 2.0;
        let mut previous = QuinticBlend::at(0.0, duration).position;
        for step in 1..=100 {
            let current = QuinticBlend::at(duration * step as f64 / 100.0, duration).position;
            assert!(current >= previous);
            previous = current;
        }
    }
}
