//! 硬件命令接口边界
//!
//! 核心只在每个外层周期结束时向硬件写入一次关节命令向量。
//! 命令语义（位置 / 力矩 / 速度）由硬件接口的命令模态决定，
//! 模态同时决定积分策略（见 [`IntegrationStrategy`](crate::integrator::IntegrationStrategy)）。

use crate::solver::JointMotion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 硬件命令模态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandModality {
    /// 关节位置命令
    Position,
    /// 关节速度命令
    Velocity,
    /// 关节力矩命令
    Effort,
}

impl CommandModality {
    /// 命令是否为速率量
    ///
    /// 速率命令只允许每个外层周期积分一步，重复子步会造成二次积分漂移。
    pub fn is_rate(self) -> bool {
        self == CommandModality::Velocity
    }

    /// 从求解器的关节运动中选出本模态对应的命令向量
    pub fn select(self, motion: &JointMotion) -> &[f64] {
        match self {
            CommandModality::Position => &motion.positions,
            CommandModality::Velocity => &motion.velocities,
            CommandModality::Effort => &motion.efforts,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandModality::Position => "position",
            CommandModality::Velocity => "velocity",
            CommandModality::Effort => "effort",
        }
    }
}

impl fmt::Display for CommandModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 硬件命令写入接口（外部协作者）
///
/// 实现者负责把每关节标量数组送到执行器。核心不读取硬件状态。
pub trait HardwareCommandWriter {
    /// 硬件接口错误类型
    type Error: std::error::Error + Send + Sync + 'static;

    /// 硬件接口接受的命令模态（固定，不随时间变化）
    fn modality(&self) -> CommandModality;

    /// 关节数
    fn joint_count(&self) -> usize;

    /// 写入一个周期的关节命令
    ///
    /// `commands.len()` 总是等于 [`joint_count`](Self::joint_count)。
    fn write_commands(&mut self, commands: &[f64]) -> Result<(), Self::Error>;
}
