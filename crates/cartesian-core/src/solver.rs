//! 正动力学求解器边界
//!
//! 求解器是不透明的外部协作者。控制核心只依赖两个操作：
//!
//! - 读取当前末端位姿（[`end_effector_pose`](ForwardDynamicsSolver::end_effector_pose)）
//! - 给定笛卡尔误差和时间步推进关节状态（[`advance`](ForwardDynamicsSolver::advance)）
//!
//! 推进后的关节状态通过 [`joint_motion`](ForwardDynamicsSolver::joint_motion) 只读借出，
//! 避免在实时路径上分配内存。

use crate::frame::Frame;
use crate::motion_error::MotionError;
use std::time::Duration;

/// 求解器内部关节模型的运动状态
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointMotion {
    /// 关节位置（rad 或 m）
    pub positions: Vec<f64>,
    /// 关节速度
    pub velocities: Vec<f64>,
    /// 关节力矩 / 力
    pub efforts: Vec<f64>,
}

impl JointMotion {
    /// 全零状态
    pub fn zeros(joint_count: usize) -> Self {
        JointMotion {
            positions: vec![0.0; joint_count],
            velocities: vec![0.0; joint_count],
            efforts: vec![0.0; joint_count],
        }
    }

    pub fn joint_count(&self) -> usize {
        self.positions.len()
    }
}

/// 正动力学求解器接口
pub trait ForwardDynamicsSolver {
    /// 求解器错误类型
    type Error: std::error::Error + Send + Sync + 'static;

    /// 当前末端位姿（基坐标系）
    fn end_effector_pose(&self) -> Frame;

    /// 用笛卡尔误差驱动内部模型前进 `period`
    fn advance(&mut self, error: &MotionError, period: Duration) -> Result<(), Self::Error>;

    /// 最近一次推进后的关节运动状态
    fn joint_motion(&self) -> &JointMotion;
}
