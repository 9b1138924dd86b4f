//! Rotation helpers in the static `sxyz` (roll, pitch, yaw) convention.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Below this norm a rotation vector is treated as "no rotation".
pub const ROTATION_EPSILON: f64 = 1e-6;

/// `cos(pitch)` below this counts as gimbal lock in [`mat2euler`].
const GIMBAL_LOCK_EPSILON: f64 = 4.0 * f64::EPSILON;

/// Extract static-frame `xyz` Euler angles `(roll, pitch, yaw)` from a
/// rotation matrix. Only at gimbal lock proper (`cos(pitch)` within a few
/// ulps of zero) is the yaw pinned to zero.
pub fn mat2euler(rotation: &Matrix3<f64>) -> Vector3<f64> {
    let cy = (rotation[(0, 0)].powi(2) + rotation[(1, 0)].powi(2)).sqrt();

    if cy > GIMBAL_LOCK_EPSILON {
        Vector3::new(
            rotation[(2, 1)].atan2(rotation[(2, 2)]),
            (-rotation[(2, 0)]).atan2(cy),
            rotation[(1, 0)].atan2(rotation[(0, 0)]),
        )
    } else {
        Vector3::new(
            (-rotation[(1, 2)]).atan2(rotation[(1, 1)]),
            (-rotation[(2, 0)]).atan2(cy),
            0.0,
        )
    }
}

/// Inverse of [`mat2euler`]: `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn euler2mat(euler: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_euler_angles(euler.x, euler.y, euler.z).into_inner()
}

/// Rotation vector (axis * angle, world frame) taking `initial` onto `target`,
/// i.e. `log(target * initialᵀ)`.
///
/// Inputs that are not exactly orthonormal (rounded via-points, integrated
/// orientations) are projected onto the nearest rotation first.
pub fn relative_rotation_vector(initial: &Matrix3<f64>, target: &Matrix3<f64>) -> Vector3<f64> {
    let relative = Rotation3::from_matrix(&(target * initial.transpose()));
    UnitQuaternion::from_rotation_matrix(&relative).scaled_axis()
}

/// Split a rotation vector into its magnitude and unit axis.
///
/// Callers must special-case vectors shorter than [`ROTATION_EPSILON`].
pub fn axis_magnitude(rotation_vector: &Vector3<f64>) -> (f64, Vector3<f64>) {
    let magnitude = rotation_vector.norm();
    (magnitude, rotation_vector / magnitude)
}

/// Rotation matrix for a world-frame rotation vector.
pub fn rotation_from_vector(rotation_vector: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(*rotation_vector).into_inner()
}

/// Map Euler-angle rates into an angular velocity in the end-effector frame,
/// using the Euler angles of the current end-effector orientation.
pub fn euler_rate_to_body_angular_velocity(
    ee_ori_mat: &Matrix3<f64>,
    euler_rate: &Vector3<f64>,
) -> Vector3<f64> {
    let euler = mat2euler(ee_ori_mat);
    let (phi, theta) = (euler.x, euler.y);

    #[rustfmt::skip]
    let rate_map = Matrix3::new(
        1.0, 0.0,        theta.sin(),
        0.0, phi.cos(), -theta.cos() * phi.sin(),
        0.0, phi.sin(),  theta.cos() * phi.cos(),
    );

    rate_map * euler_rate
}

/// Same as [`euler_rate_to_body_angular_velocity`], rotated into the world frame.
pub fn euler_rate_to_world_angular_velocity(
    ee_ori_mat: &Matrix3<f64>,
    euler_rate: &Vector3<f64>,
) -> Vector3<f64> {
    ee_ori_mat * euler_rate_to_body_angular_velocity(ee_ori_mat, euler_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_euler_round_trip_away_from_gimbal_lock() {
        let euler = Vector3::new(0.3, -0.4, 1.2);
        let recovered = mat2euler(&euler2mat(&euler));
        assert_abs_diff_eq!(recovered, euler, epsilon = 1e-12);
    }

    #[test]
    fn test_gimbal_lock_pins_yaw() {
        let euler = Vector3::new(0.2, std::f64::consts::FRAC_PI_2, 0.0);
        let recovered = mat2euler(&euler2mat(&euler));
        assert_eq!(recovered.z, 0.0);
        assert!((recovered.y - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_yaw_recovered_close_to_gimbal_lock() {
        let euler = Vector3::new(0.2, std::f64::consts::FRAC_PI_2 - 1e-9, 0.5);
        let recovered = mat2euler(&euler2mat(&euler));
        assert_abs_diff_eq!(recovered, euler, epsilon = 1e-6);
    }

    #[test]
    fn test_relative_rotation_about_z() {
        let initial = Matrix3::identity();
        let target = euler2mat(&Vector3::new(0.0, 0.0, 0.3));
        let rotvec = relative_rotation_vector(&initial, &target);
        assert_abs_diff_eq!(rotvec, Vector3::new(0.0, 0.0, 0.3), epsilon = 1e-9);

        let (magnitude, axis) = axis_magnitude(&rotvec);
        assert!((magnitude - 0.3).abs() < 1e-9);
        assert_abs_diff_eq!(axis, Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    fn test_relative_rotation_of_identical_frames_is_zero() {
        let frame = euler2mat(&Vector3::new(0.5, 0.1, -2.0));
        let rotvec = relative_rotation_vector(&frame, &frame);
        assert!(rotvec.norm() < ROTATION_EPSILON);
    }

    #[test]
    fn test_rotation_vector_reconstructs_target() {
        let initial = euler2mat(&Vector3::new(0.1, 0.2, 0.3));
        let target = euler2mat(&Vector3::new(-0.4, 0.0, 1.0));
        let rotvec = relative_rotation_vector(&initial, &target);
        let rebuilt = rotation_from_vector(&rotvec) * initial;
        assert_abs_diff_eq!(rebuilt, target, epsilon = 1e-9);
    }

    #[test]
    fn test_euler_rate_mapping_at_identity() {
        let rate = Vector3::new(0.1, -0.2, 0.3);
        let body = euler_rate_to_body_angular_velocity(&Matrix3::identity(), &rate);
        assert_abs_diff_eq!(body, rate, epsilon = 1e-12);
        let world = euler_rate_to_world_angular_velocity(&Matrix3::identity(), &rate);
        assert_abs_diff_eq!(world, rate, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_rate_mapping_at_general_orientation() {
        let (phi, theta) = (0.4_f64, -0.3_f64);
        let ee_ori_mat = euler2mat(&Vector3::new(phi, theta, 0.7));
        let rate = Vector3::new(0.5, -0.25, 0.8);

        let expected_body = Vector3::new(
            rate.x + theta.sin() * rate.z,
            phi.cos() * rate.y - theta.cos() * phi.sin() * rate.z,
            phi.sin() * rate.y + theta.cos() * phi.cos() * rate.z,
        );
        let body = euler_rate_to_body_angular_velocity(&ee_ori_mat, &rate);
        assert_abs_diff_eq!(body, expected_body, epsilon = 1e-12);

        let world = euler_rate_to_world_angular_velocity(&ee_ori_mat, &rate);
        assert_abs_diff_eq!(world, ee_ori_mat * expected_body, epsilon = 1e-12);
    }
}
