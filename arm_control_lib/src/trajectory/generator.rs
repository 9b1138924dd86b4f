use super::TrajectorySegment;
use crate::error::{ControllerError, Result};
use crate::types::{OrientationMethod, TrajectoryPoint, ViaPoint};
use nalgebra::{Matrix3, Vector3};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Where a new segment takes its initial condition from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStart {
    /// Use the pose measured on the backend.
    Fresh,
    /// Take the planar (x, y) position, and for the Euler method the
    /// orientation, from the last evaluated reference point so the handoff
    /// between segments stays continuous.
    Continue,
}

/// Builds minimum-jerk segments and records every evaluated reference point.
///
/// The history is append-only and unbounded unless a `history_limit` is set,
/// in which case only the most recent points are kept. Continuity only ever
/// needs the last point.
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    method: OrientationMethod,
    round_final_orientation: bool,
    history_limit: Option<usize>,
    active: Option<TrajectorySegment>,
    segments_built: usize,
    history: VecDeque<TrajectoryPoint>,
}

impl TrajectoryGenerator {
    pub fn new(method: OrientationMethod) -> Self {
        Self {
            method,
            round_final_orientation: false,
            history_limit: None,
            active: None,
            segments_built: 0,
            history: VecDeque::new(),
        }
    }

    /// Keep at most `limit` evaluated points (at least one is always kept).
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit.map(|l| l.max(1));
        self
    }

    /// Snap target orientation matrices to integer entries before planning.
    pub fn with_rounded_final_orientation(mut self, round: bool) -> Self {
        self.round_final_orientation = round;
        self
    }

    pub fn method(&self) -> OrientationMethod {
        self.method
    }

    /// Plan the next segment towards `target`.
    ///
    /// `current_position`/`current_orientation` are the end-effector pose as
    /// read from the backend at `start_time`.
    pub fn build_segment(
        &mut self,
        current_position: Vector3<f64>,
        current_orientation: Matrix3<f64>,
        target: &ViaPoint,
        duration: f64,
        start_time: f64,
        start: SegmentStart,
    ) -> Result<&TrajectorySegment> {
        let target = if self.round_final_orientation {
            ViaPoint::new(target.position, target.orientation.map(f64::round))
        } else {
            target.clone()
        };

        let previous = match start {
            SegmentStart::Fresh => None,
            SegmentStart::Continue => {
                let last = self.history.back();
                if last.is_none() {
                    warn!("Continuity requested but no reference point recorded yet; starting fresh");
                }
                last
            }
        };

        let mut initial_position = current_position;
        if let Some(last) = previous {
            initial_position.x = last.position.x;
            initial_position.y = last.position.y;
        }

        let mut segment = TrajectorySegment::new(
            self.method,
            initial_position,
            current_orientation,
            &target,
            duration,
            start_time,
        )?;
        if let (Some(last), OrientationMethod::Euler) = (previous, self.method) {
            segment = segment.with_initial_euler(last.orientation);
        }

        self.segments_built += 1;
        info!(
            "Built {} segment #{}: ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3}) over {:.3}s from t={:.4}",
            self.method,
            self.segments_built,
            initial_position.x,
            initial_position.y,
            initial_position.z,
            target.position.x,
            target.position.y,
            target.position.z,
            duration,
            start_time
        );

        Ok(self.active.insert(segment))
    }

    /// Evaluate the active segment at absolute time `time` and append the
    /// result to the history.
    pub fn next_desired_point(&mut self, time: f64) -> Result<TrajectoryPoint> {
        let segment = self.active.as_ref().ok_or(ControllerError::NoActiveSegment)?;
        let point = segment.evaluate(time)?;

        debug!(
            "Reference at t={:.4} (elapsed {:.4}): pos=({:.4}, {:.4}, {:.4})",
            time, point.elapsed, point.position.x, point.position.y, point.position.z
        );

        self.history.push_back(point.clone());
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }

        Ok(point)
    }

    pub fn active_segment(&self) -> Option<&TrajectorySegment> {
        self.active.as_ref()
    }

    /// Number of segments built so far.
    pub fn segments_built(&self) -> usize {
        self.segments_built
    }

    pub fn history(&self) -> &VecDeque<TrajectoryPoint> {
        &self.history
    }

    pub fn last_point(&self) -> Option<&TrajectoryPoint> {
        self.history.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::euler2mat;
    use approx::assert_abs_diff_eq;

    fn via(x: f64, y: f64, z: f64) -> ViaPoint {
        ViaPoint::new(Vector3::new(x, y, z), Matrix3::identity())
    }

    #[test]
    fn test_point_before_build_fails() {
        let mut generator = TrajectoryGenerator::new(OrientationMethod::Euler);
        assert_eq!(
            generator.next_desired_point(0.0).unwrap_err(),
            ControllerError::NoActiveSegment
        );
    }

    #[test]
    fn test_history_grows_with_every_evaluation() {
        let mut generator = TrajectoryGenerator::new(OrientationMethod::Rotation);
        generator
            .build_segment(
                Vector3::zeros(),
                Matrix3::identity(),
                &via(1.0, 0.0, 0.0),
                2.0,
                0.0,
                SegmentStart::Fresh,
            )
            .unwrap();

        for step in 0..5 {
            generator.next_desired_point(step as f64 * 0.1).unwrap();
        }
        assert_eq!(generator.history().len(), 5);
        assert_eq!(generator.last_point().unwrap().time, 0.4);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut generator =
            TrajectoryGenerator::new(OrientationMethod::Euler).with_history_limit(Some(3));
        generator
            .build_segment(
                Vector3::zeros(),
                Matrix3::identity(),
                &via(1.0, 0.0, 0.0),
                1.0,
                0.0,
                SegmentStart::Fresh,
            )
            .unwrap();

        for step in 0..10 {
            generator.next_desired_point(step as f64 * 0.1).unwrap();
        }
        assert_eq!(generator.history().len(), 3);
        assert!((generator.history()[0].time - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_continuation_takes_planar_position_from_history() {
        let mut generator = TrajectoryGenerator::new(OrientationMethod::Euler);
        generator
            .build_segment(
                Vector3::zeros(),
                Matrix3::identity(),
                &via(1.0, 2.0, 0.5),
                1.0,
                0.0,
                SegmentStart::Fresh,
            )
            .unwrap();
        let last = generator.next_desired_point(0.6).unwrap();

        // measured pose differs from the reference in every axis
        let measured = Vector3::new(9.0, 9.0, 0.25);
        let segment = generator
            .build_segment(
                measured,
                euler2mat(&Vector3::new(0.3, 0.0, 0.0)),
                &via(0.0, 0.0, 0.0),
                1.0,
                0.6,
                SegmentStart::Continue,
            )
            .unwrap()
            .clone();

        assert_eq!(segment.initial_position().x, last.position.x);
        assert_eq!(segment.initial_position().y, last.position.y);
        assert_eq!(segment.initial_position().z, 0.25);

        let start = segment.evaluate(0.6).unwrap();
        assert_abs_diff_eq!(start.orientation, last.orientation, epsilon = 1e-12);
        assert_eq!(generator.segments_built(), 2);
    }

    #[test]
    fn test_continuation_without_history_starts_fresh() {
        let mut generator = TrajectoryGenerator::new(OrientationMethod::Euler);
        let segment = generator
            .build_segment(
                Vector3::new(0.1, 0.2, 0.3),
                Matrix3::identity(),
                &via(1.0, 0.0, 0.0),
                1.0,
                0.0,
                SegmentStart::Continue,
            )
            .unwrap();
        assert_eq!(*segment.initial_position(), Vector3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_rounded_target_orientation() {
        let mut generator = TrajectoryGenerator::new(OrientationMethod::Rotation)
            .with_rounded_final_orientation(true);
        let nearly_identity = euler2mat(&Vector3::new(0.01, -0.02, 0.015));
        let segment = generator
            .build_segment(
                Vector3::zeros(),
                Matrix3::identity(),
                &ViaPoint::new(Vector3::x(), nearly_identity),
                1.0,
                0.0,
                SegmentStart::Fresh,
            )
            .unwrap();
        assert_eq!(*segment.final_orientation(), Matrix3::identity());
    }
}
