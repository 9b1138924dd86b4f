use nalgebra::{DMatrix, DVector, Matrix3, Matrix3xX, Matrix6xX, Vector3};

/// Kinematic and dynamic state of one arm, as read from the backend at the
/// last cache refresh. Every joint-sized quantity has `N` = number of
/// controlled joints.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicSnapshot {
    /// End-effector site position in world coordinates.
    pub ee_pos: Vector3<f64>,
    /// End-effector site orientation in world coordinates.
    pub ee_ori_mat: Matrix3<f64>,
    /// End-effector linear velocity.
    pub ee_pos_vel: Vector3<f64>,
    /// End-effector angular velocity.
    pub ee_ori_vel: Vector3<f64>,
    pub joint_pos: DVector<f64>,
    pub joint_vel: DVector<f64>,
    /// Positional Jacobian (3 x N).
    pub j_pos: Matrix3xX<f64>,
    /// Rotational Jacobian (3 x N).
    pub j_ori: Matrix3xX<f64>,
    /// `j_pos` stacked on top of `j_ori` (6 x N).
    pub j_full: Matrix6xX<f64>,
    /// Principal submatrix of the backend mass matrix (N x N).
    pub mass_matrix: DMatrix<f64>,
}

impl KinematicSnapshot {
    pub fn zeros(joint_dim: usize) -> Self {
        Self {
            ee_pos: Vector3::zeros(),
            ee_ori_mat: Matrix3::identity(),
            ee_pos_vel: Vector3::zeros(),
            ee_ori_vel: Vector3::zeros(),
            joint_pos: DVector::zeros(joint_dim),
            joint_vel: DVector::zeros(joint_dim),
            j_pos: Matrix3xX::zeros(joint_dim),
            j_ori: Matrix3xX::zeros(joint_dim),
            j_full: Matrix6xX::zeros(joint_dim),
            mass_matrix: DMatrix::zeros(joint_dim, joint_dim),
        }
    }

    pub fn joint_dim(&self) -> usize {
        self.joint_pos.len()
    }
}
