//! 正动力学积分策略
//!
//! 把笛卡尔误差转换为关节运动：在一个外层控制周期内驱动求解器积分一个或多个内部子步。
//!
//! # 策略说明
//!
//! - **Iterative**: 位置 / 力矩命令。执行固定 `K` 个子步，每个子步都重新读取当前位姿、
//!   重新计算误差，让内部模型在一个外层周期内追上目标。
//! - **SingleStep**: 速度命令。每个外层周期只积分一步：速度本身已是速率量，
//!   重复子步会造成二次积分和漂移。
//!
//! 两种策略都使用固定的内部时间步 [`SUBSTEP_PERIOD`]，与外层周期无关。
//! 策略在配置阶段根据硬件命令模态选定一次，运行期间不变。

use crate::error::ConfigError;
use crate::frame::Frame;
use crate::hardware::CommandModality;
use crate::motion_error::{MotionError, compute_motion_error};
use crate::solver::ForwardDynamicsSolver;
use std::num::NonZeroU32;
use std::time::Duration;

/// 内部子步时间步长（与外层控制周期解耦，不可配置）
pub const SUBSTEP_PERIOD: Duration = Duration::from_millis(20);

/// 积分策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationStrategy {
    /// 每个外层周期执行 `substeps` 个子步
    Iterative { substeps: NonZeroU32 },
    /// 每个外层周期执行一个子步
    SingleStep,
}

impl IntegrationStrategy {
    /// 根据硬件命令模态选择策略
    ///
    /// 位置 / 力矩模态必须配置 `iterations`（大于 0）；速度模态忽略该值。
    pub fn for_modality(
        modality: CommandModality,
        iterations: Option<u32>,
    ) -> Result<Self, ConfigError> {
        if modality.is_rate() {
            if let Some(iterations) = iterations
                && iterations != 1
            {
                tracing::debug!(
                    "Ignoring iterations = {} for {} commands, integrating one step per cycle",
                    iterations,
                    modality
                );
            }
            return Ok(IntegrationStrategy::SingleStep);
        }

        let iterations = iterations.ok_or(ConfigError::MissingParameter("iterations"))?;
        let substeps = NonZeroU32::new(iterations).ok_or_else(|| ConfigError::InvalidParameter {
            name: "iterations",
            reason: format!("must be > 0 for {} commands", modality),
        })?;

        Ok(IntegrationStrategy::Iterative { substeps })
    }

    /// 每个外层周期的子步数
    pub fn substeps(&self) -> u32 {
        match self {
            IntegrationStrategy::Iterative { substeps } => substeps.get(),
            IntegrationStrategy::SingleStep => 1,
        }
    }

    pub fn is_iterative(&self) -> bool {
        matches!(self, IntegrationStrategy::Iterative { .. })
    }

    /// 执行一个外层周期的积分
    ///
    /// `target` 是本周期的目标快照，所有子步共用同一个快照。
    /// 返回最后一个子步使用的误差。求解器错误立即返回，不继续后续子步。
    pub fn integrate<S>(&self, solver: &mut S, target: &Frame) -> Result<MotionError, S::Error>
    where
        S: ForwardDynamicsSolver + ?Sized,
    {
        let mut error = MotionError::zero();
        for _ in 0..self.substeps() {
            let current = solver.end_effector_pose();
            error = compute_motion_error(&current, target);
            solver.advance(&error, SUBSTEP_PERIOD)?;
        }
        Ok(error)
    }
}
