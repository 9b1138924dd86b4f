use super::{OrientationPlan, QuinticBlend};
use crate::error::{ControllerError, Result};
use crate::types::{OrientationMethod, TrajectoryPoint, ViaPoint};
use crate::utils::{euler2mat, rotation_from_vector};
use nalgebra::{Matrix3, Vector3};

/// Slack for queries that land a rounding error before the segment start.
const START_TOLERANCE: f64 = 1e-12;

/// One point-to-point minimum-jerk motion, fixed once built and evaluated
/// against absolute simulation time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySegment {
    initial_position: Vector3<f64>,
    final_position: Vector3<f64>,
    initial_orientation: Matrix3<f64>,
    final_orientation: Matrix3<f64>,
    orientation: OrientationPlan,
    duration: f64,
    start_time: f64,
}

impl TrajectorySegment {
    /// Plan a segment from the given initial pose to `target`, starting at
    /// absolute time `start_time` and lasting `duration` seconds.
    pub fn new(
        method: OrientationMethod,
        initial_position: Vector3<f64>,
        initial_orientation: Matrix3<f64>,
        target: &ViaPoint,
        duration: f64,
        start_time: f64,
    ) -> Result<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ControllerError::InvalidDuration(duration));
        }

        let orientation = match method {
            OrientationMethod::Euler => {
                OrientationPlan::euler_from_matrices(&initial_orientation, &target.orientation)
            }
            OrientationMethod::Rotation => {
                OrientationPlan::rotation(&initial_orientation, &target.orientation)
            }
        };

        Ok(Self {
            initial_position,
            final_position: target.position,
            initial_orientation,
            final_orientation: target.orientation,
            orientation,
            duration,
            start_time,
        })
    }

    /// Replace the initial Euler angles, e.g. with the last reference of the
    /// previous segment. Rotation plans are left untouched.
    pub fn with_initial_euler(mut self, euler: Vector3<f64>) -> Self {
        if let OrientationPlan::Euler { initial, .. } = &mut self.orientation {
            *initial = euler;
        }
        self
    }

    pub fn initial_position(&self) -> &Vector3<f64> {
        &self.initial_position
    }

    pub fn final_position(&self) -> &Vector3<f64> {
        &self.final_position
    }

    pub fn initial_orientation(&self) -> &Matrix3<f64> {
        &self.initial_orientation
    }

    pub fn final_orientation(&self) -> &Matrix3<f64> {
        &self.final_orientation
    }

    pub fn orientation_plan(&self) -> &OrientationPlan {
        &self.orientation
    }

    pub fn method(&self) -> OrientationMethod {
        self.orientation.method()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn is_finished(&self, time: f64) -> bool {
        time >= self.end_time()
    }

    /// Evaluate the reference at absolute simulation time `time`.
    ///
    /// Times past the end hold the final pose with zero velocity.
    pub fn evaluate(&self, time: f64) -> Result<TrajectoryPoint> {
        let elapsed = time - self.start_time;
        if elapsed < -START_TOLERANCE {
            return Err(ControllerError::QueryBeforeStart {
                time,
                start: self.start_time,
            });
        }
        let elapsed = elapsed.clamp(0.0, self.duration);

        let blend = QuinticBlend::at(elapsed, self.duration);
        let (position, velocity, acceleration) =
            blend.interpolate(&self.initial_position, &self.final_position);
        let (orientation, angular_velocity) = self.orientation.evaluate(&blend);

        Ok(TrajectoryPoint {
            time,
            elapsed,
            position,
            orientation,
            velocity,
            angular_velocity,
            acceleration,
        })
    }

    /// Rotation matrix described by `point.orientation` for this segment's
    /// method.
    pub fn reference_rotation(&self, point: &TrajectoryPoint) -> Matrix3<f64> {
        match self.orientation {
            OrientationPlan::Euler { .. } => euler2mat(&point.orientation),
            OrientationPlan::Rotation { .. } | OrientationPlan::Stationary => {
                rotation_from_vector(&point.orientation) * self.final_orientation
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight_line(method: OrientationMethod, start_time: f64) -> TrajectorySegment {
        TrajectorySegment::new(
            method,
            Vector3::zeros(),
            Matrix3::identity(),
            &ViaPoint::new(Vector3::new(1.0, 0.0, 0.0), Matrix3::identity()),
            2.0,
            start_time,
        )
        .unwrap()
    }

    #[test]
    fn test_midpoint_of_unit_move() {
        let t0 = 3.25;
        let segment = straight_line(OrientationMethod::Rotation, t0);

        let mid = segment.evaluate(t0 + 1.0).unwrap();
        assert_eq!(mid.position.x, 0.5);
        assert_eq!(mid.elapsed, 1.0);

        let before = segment.evaluate(t0 + 0.95).unwrap();
        let after = segment.evaluate(t0 + 1.05).unwrap();
        assert!(mid.velocity.x > before.velocity.x);
        assert!(mid.velocity.x > after.velocity.x);
    }

    #[test]
    fn test_endpoints_hold_exactly() {
        let segment = straight_line(OrientationMethod::Euler, 0.0);

        let start = segment.evaluate(0.0).unwrap();
        assert_eq!(start.position, Vector3::zeros());
        assert_eq!(start.velocity, Vector3::zeros());

        let end = segment.evaluate(2.0).unwrap();
        assert_abs_diff_eq!(end.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(end.velocity, Vector3::zeros(), epsilon = 1e-9);
        assert_abs_diff_eq!(end.acceleration, Vector3::zeros(), epsilon = 1e-9);
        assert!(segment.is_finished(2.0));
    }

    #[test]
    fn test_query_past_end_holds_target() {
        let segment = straight_line(OrientationMethod::Euler, 0.0);
        let late = segment.evaluate(10.0).unwrap();
        assert_eq!(late.elapsed, 2.0);
        assert_abs_diff_eq!(late.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_query_before_start_is_rejected() {
        let segment = straight_line(OrientationMethod::Euler, 5.0);
        assert!(matches!(
            segment.evaluate(4.0),
            Err(ControllerError::QueryBeforeStart { .. })
        ));
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let via = ViaPoint::new(Vector3::x(), Matrix3::identity());
        for duration in [0.0, -1.0, f64::NAN] {
            let result = TrajectorySegment::new(
                OrientationMethod::Euler,
                Vector3::zeros(),
                Matrix3::identity(),
                &via,
                duration,
                0.0,
            );
            assert!(matches!(result, Err(ControllerError::InvalidDuration(_))));
        }
    }

    #[test]
    fn test_rotation_reference_starts_at_initial_and_ends_at_target() {
        let initial = euler2mat(&Vector3::new(0.1, -0.2, 0.4));
        let target = ViaPoint::new(Vector3::zeros(), euler2mat(&Vector3::new(0.5, 0.3, -0.6)));
        let segment = TrajectorySegment::new(
            OrientationMethod::Rotation,
            Vector3::zeros(),
            initial,
            &target,
            1.5,
            0.0,
        )
        .unwrap();

        let start = segment.evaluate(0.0).unwrap();
        assert_abs_diff_eq!(segment.reference_rotation(&start), initial, epsilon = 1e-9);

        let end = segment.evaluate(1.5).unwrap();
        assert_abs_diff_eq!(segment.reference_rotation(&end), target.orientation, epsilon = 1e-9);
    }

    #[test]
    fn test_initial_euler_override() {
        let segment = straight_line(OrientationMethod::Euler, 0.0)
            .with_initial_euler(Vector3::new(0.2, 0.0, 0.0));
        let start = segment.evaluate(0.0).unwrap();
        assert_eq!(start.orientation, Vector3::new(0.2, 0.0, 0.0));
    }
}
