//! 解耦笛卡尔质点模型
//!
//! 六个虚拟关节分别对应末端的三个平移和三个旋转自由度（无耦合、无重力）。
//! 每个子步把钳位误差当作虚拟弹簧的伸长量：
//!
//! ```text
//! effort   = stiffness * error - damping * velocity
//! velocity += effort / mass * dt
//! pose     += velocity * dt          (旋转部分按轴角增量左乘)
//! ```
//!
//! 关节位置为 `[x, y, z, rx, ry, rz]`，其中旋转部分是末端姿态的轴角向量。

use cartesian_core::frame::Frame;
use cartesian_core::motion_error::MotionError;
use cartesian_core::solver::{ForwardDynamicsSolver, JointMotion};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 虚拟关节数
pub const JOINT_COUNT: usize = 6;

/// 仿真求解器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// 积分结果出现 NaN / Inf
    #[error("Simulation diverged at step {step}")]
    Diverged { step: u64 },

    /// 时间步长为零
    #[error("Invalid integration period: {0:?}")]
    InvalidPeriod(Duration),
}

/// 质点模型参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimParams {
    /// 虚拟质量（平移与旋转共用）
    pub mass: f64,
    /// 虚拟弹簧刚度
    pub stiffness: f64,
    /// 阻尼系数
    pub damping: f64,
}

impl Default for SimParams {
    /// 临界阻尼：`damping = 2 * sqrt(stiffness * mass)`
    fn default() -> Self {
        SimParams {
            mass: 1.0,
            stiffness: 25.0,
            damping: 10.0,
        }
    }
}

/// 仿真正动力学求解器
#[derive(Debug, Clone)]
pub struct SimulatedSolver {
    params: SimParams,
    pose: Frame,
    linear_velocity: Vector3<f64>,
    angular_velocity: Vector3<f64>,
    motion: JointMotion,
    steps: u64,
}

impl SimulatedSolver {
    /// 在给定初始位姿创建，速度为零
    pub fn new(initial: Frame, params: SimParams) -> Self {
        let mut solver = SimulatedSolver {
            params,
            pose: initial,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            motion: JointMotion::zeros(JOINT_COUNT),
            steps: 0,
        };
        solver.sync_joint_positions();
        solver
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// 已执行的积分步数
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// 末端线速度和角速度
    pub fn twist(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.linear_velocity, self.angular_velocity)
    }

    fn sync_joint_positions(&mut self) {
        let p = self.pose.position;
        let r = self.pose.rotation.scaled_axis();
        self.motion.positions.copy_from_slice(&[p.x, p.y, p.z, r.x, r.y, r.z]);
    }
}

impl ForwardDynamicsSolver for SimulatedSolver {
    type Error = SimError;

    fn end_effector_pose(&self) -> Frame {
        self.pose
    }

    fn advance(&mut self, error: &MotionError, period: Duration) -> Result<(), SimError> {
        if period.is_zero() {
            return Err(SimError::InvalidPeriod(period));
        }
        let dt = period.as_secs_f64();
        let SimParams {
            mass,
            stiffness,
            damping,
        } = self.params;

        let force = error.translation() * stiffness - self.linear_velocity * damping;
        let torque = error.rotation() * stiffness - self.angular_velocity * damping;

        // 半隐式欧拉：先更新速度，再用新速度更新位姿
        self.linear_velocity += force / mass * dt;
        self.angular_velocity += torque / mass * dt;

        let mut next = self.pose;
        next.position += self.linear_velocity * dt;
        next.rotation = UnitQuaternion::from_scaled_axis(self.angular_velocity * dt) * next.rotation;

        self.steps += 1;
        if !next.is_finite() {
            tracing::error!(step = self.steps, "Simulated solver produced a non-finite pose");
            return Err(SimError::Diverged { step: self.steps });
        }
        self.pose = next;

        let v = self.linear_velocity;
        let w = self.angular_velocity;
        self.motion.velocities.copy_from_slice(&[v.x, v.y, v.z, w.x, w.y, w.z]);
        self.motion
            .efforts
            .copy_from_slice(&[force.x, force.y, force.z, torque.x, torque.y, torque.z]);
        self.sync_joint_positions();
        Ok(())
    }

    fn joint_motion(&self) -> &JointMotion {
        &self.motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: Duration = Duration::from_millis(20);

    #[test]
    fn test_zero_error_keeps_pose_at_rest() {
        let start = Frame::from_position_rpy(Vector3::new(0.1, 0.2, 0.3), 0.1, 0.0, 0.0);
        let mut solver = SimulatedSolver::new(start, SimParams::default());
        for _ in 0..10 {
            solver.advance(&MotionError::zero(), DT).unwrap();
        }
        assert_eq!(solver.end_effector_pose(), start);
        assert_eq!(solver.steps(), 10);
        assert!(solver.joint_motion().velocities.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_joint_positions_mirror_pose() {
        let start = Frame::from_translation(0.5, -0.5, 1.0);
        let solver = SimulatedSolver::new(start, SimParams::default());
        assert_eq!(solver.joint_motion().positions, vec![0.5, -0.5, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_translation_error_accelerates_along_error() {
        let mut solver = SimulatedSolver::new(Frame::identity(), SimParams::default());
        let error = MotionError::from_parts(Vector3::new(0.2, 0.0, 0.0), Vector3::zeros());
        solver.advance(&error, DT).unwrap();

        // v = k * e / m * dt = 25 * 0.2 * 0.02
        let (linear, angular) = solver.twist();
        assert_relative_eq!(linear.x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(solver.end_effector_pose().position.x, 0.002, epsilon = 1e-12);
        assert_eq!(angular, Vector3::zeros());
        assert_relative_eq!(solver.joint_motion().efforts[0], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_error_turns_about_axis() {
        let mut solver = SimulatedSolver::new(Frame::identity(), SimParams::default());
        let error = MotionError::from_parts(Vector3::zeros(), Vector3::new(0.0, 0.0, 0.5));
        solver.advance(&error, DT).unwrap();

        let rotation = solver.end_effector_pose().rotation;
        let axis = rotation.axis().unwrap();
        assert_relative_eq!(axis.z, 1.0, epsilon = 1e-12);
        assert!(rotation.angle() > 0.0);
        assert_relative_eq!(solver.joint_motion().positions[5], rotation.angle(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let mut solver = SimulatedSolver::new(Frame::identity(), SimParams::default());
        assert_eq!(
            solver.advance(&MotionError::zero(), Duration::ZERO),
            Err(SimError::InvalidPeriod(Duration::ZERO))
        );
        assert_eq!(solver.steps(), 0);
    }

    #[test]
    fn test_divergence_is_reported() {
        let params = SimParams {
            mass: 0.0,
            ..SimParams::default()
        };
        let mut solver = SimulatedSolver::new(Frame::identity(), params);
        let error = MotionError::from_parts(Vector3::new(0.1, 0.0, 0.0), Vector3::zeros());

        assert_eq!(solver.advance(&error, DT), Err(SimError::Diverged { step: 1 }));
        assert_eq!(solver.end_effector_pose(), Frame::identity());
    }

    #[test]
    fn test_params_from_toml() {
        let params: SimParams = toml::from_str("stiffness = 100.0\ndamping = 20.0\n").unwrap();
        assert_eq!(params.mass, 1.0);
        assert_eq!(params.stiffness, 100.0);
        assert_eq!(params.damping, 20.0);
    }
}
