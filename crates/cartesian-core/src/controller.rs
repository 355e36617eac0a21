//! 笛卡尔运动控制器
//!
//! 把流式输入的目标末端位姿转换为关节命令，每个外层控制周期闭环一次。
//!
//! # 每周期流程
//!
//! 1. 读取目标快照（每周期一次）
//! 2. 从求解器读取当前末端位姿，发布遥测
//! 3. 按积分策略执行 1 或 `K` 个子步（每个子步重新计算钳位误差）
//! 4. 按命令模态取出关节命令，写入硬件接口（每周期一次）
//!
//! # 生命周期
//!
//! - **激活** [`activate`](CartesianMotionController::activate)：读取当前位姿并以其播种目标，
//!   第一个周期误差为零，命令无跳变
//! - **运行** [`update`](CartesianMotionController::update)：由调用方的周期性实时上下文同步调用
//! - **去激活** [`deactivate`](CartesianMotionController::deactivate)：丢弃目标，停止写命令
//!
//! # 线程模型
//!
//! 控制器本身不创建线程、不做阻塞 IO。唯一的并发交互点是目标位姿写端
//! [`TargetPoseHandle`]，可以交给异步投递上下文使用。
//!
//! # 示例
//!
//! ```rust,ignore
//! let mut controller = CartesianMotionController::new(solver, writer, resolved)?;
//! let targets = controller.target_handle();
//! // 在订阅线程中: targets.set_target(&msg);
//!
//! controller.activate()?;
//! loop {
//!     controller.update()?;
//!     // 等待下一个周期
//! }
//! ```

use crate::config::ResolvedConfig;
use crate::error::{ConfigError, ControlError};
use crate::frame::Frame;
use crate::hardware::HardwareCommandWriter;
use crate::metrics::{ControllerMetrics, MetricsSnapshot};
use crate::motion_error::MotionError;
use crate::solver::ForwardDynamicsSolver;
use crate::target::{TargetPoseBuffer, TargetPoseHandle};
use crate::telemetry::{
    EndEffectorState, JointStateRelay, TelemetryMessage, TelemetrySink, publish_counted,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

/// 单个控制周期的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// 本周期使用的目标快照
    pub target: Frame,
    /// 周期开始时的当前位姿
    pub start_pose: Frame,
    /// 最后一个子步使用的误差
    pub error: MotionError,
    /// 执行的子步数
    pub substeps: u32,
}

/// 笛卡尔运动控制器
pub struct CartesianMotionController<S, W> {
    solver: S,
    writer: W,
    config: ResolvedConfig,
    target: TargetPoseBuffer,
    current: Frame,
    active: bool,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    metrics: Arc<ControllerMetrics>,
}

impl<S, W> CartesianMotionController<S, W>
where
    S: ForwardDynamicsSolver,
    W: HardwareCommandWriter,
{
    /// 创建控制器（未激活）
    ///
    /// 硬件接口的命令模态必须与配置一致，积分策略在此固定。
    pub fn new(solver: S, writer: W, config: ResolvedConfig) -> Result<Self, ConfigError> {
        if writer.modality() != config.command_modality {
            return Err(ConfigError::ModalityMismatch {
                configured: config.command_modality,
                actual: writer.modality(),
            });
        }

        if config.command_modality.is_rate() == config.strategy.is_iterative() {
            let reason = if config.command_modality.is_rate() {
                "integrate exactly one step per cycle"
            } else {
                "require iterative integration"
            };
            return Err(ConfigError::InvalidParameter {
                name: "iterations",
                reason: format!("{} commands {}", config.command_modality, reason),
            });
        }

        let metrics = Arc::new(ControllerMetrics::new());
        let target = TargetPoseBuffer::new(config.base_frame.clone(), metrics.clone());
        let current = solver.end_effector_pose();

        debug!(
            base_frame = %config.base_frame,
            modality = %config.command_modality,
            substeps = config.strategy.substeps(),
            "Cartesian motion controller configured"
        );

        Ok(Self {
            solver,
            writer,
            config,
            target,
            current,
            active: false,
            telemetry: None,
            metrics,
        })
    }

    /// 设置遥测发布端
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// 目标位姿写端（交给异步投递上下文）
    pub fn target_handle(&self) -> TargetPoseHandle {
        self.target.handle()
    }

    /// 关节状态转发器（未配置遥测时返回 `None`）
    pub fn joint_state_relay(&self) -> Option<JointStateRelay> {
        self.telemetry
            .as_ref()
            .map(|sink| JointStateRelay::new(sink.clone(), self.metrics.clone()))
    }

    /// 激活：以当前位姿播种目标
    pub fn activate(&mut self) -> Result<(), ControlError> {
        if self.active {
            return Err(ControlError::AlreadyActive);
        }

        self.current = self.solver.end_effector_pose();
        self.target.seed(self.current);
        self.active = true;

        info!(pose = %self.current, "Cartesian motion controller activated");
        Ok(())
    }

    /// 去激活：丢弃目标，之后的 `update` 返回 [`ControlError::NotActive`]
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.target.clear();
        info!("Cartesian motion controller deactivated");
    }

    /// 执行一个外层控制周期
    ///
    /// # 错误
    ///
    /// - [`ControlError::NotActive`]: 未激活
    /// - [`ControlError::Solver`]: 求解器故障（不重试，不写命令）
    /// - [`ControlError::CommandLength`] / [`ControlError::Hardware`]: 命令写入失败
    pub fn update(&mut self) -> Result<CycleReport, ControlError> {
        if !self.active {
            return Err(ControlError::NotActive);
        }
        let target = self.target.snapshot().ok_or(ControlError::NotActive)?;

        self.current = self.solver.end_effector_pose();
        let start_pose = self.current;
        self.publish_end_effector_state();

        let strategy = self.config.strategy;
        let error = strategy.integrate(&mut self.solver, &target).map_err(|e| {
            error!("Forward dynamics solver failed: {}", e);
            ControlError::solver(e)
        })?;
        self.current = self.solver.end_effector_pose();

        let commands = self.config.command_modality.select(self.solver.joint_motion());
        let expected = self.writer.joint_count();
        if commands.len() != expected {
            return Err(ControlError::CommandLength {
                expected,
                actual: commands.len(),
            });
        }
        self.writer.write_commands(commands).map_err(|e| {
            error!("Failed to write joint commands: {}", e);
            ControlError::hardware(e)
        })?;

        let substeps = strategy.substeps();
        self.metrics.cycles.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .solver_substeps
            .fetch_add(u64::from(substeps), Ordering::Relaxed);

        Ok(CycleReport {
            target,
            start_pose,
            error,
            substeps,
        })
    }

    fn publish_end_effector_state(&self) {
        if let Some(sink) = &self.telemetry {
            let state = EndEffectorState::new(
                &self.current,
                &self.config.flange_to_tool,
                &self.config.tool_to_stiffness,
            );
            publish_counted(sink.as_ref(), &self.metrics, TelemetryMessage::EndEffector(state));
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 最近一次从求解器读取的末端位姿
    pub fn current_frame(&self) -> Frame {
        self.current
    }

    /// 当前目标位姿（未激活时为 `None`）
    pub fn target_frame(&self) -> Option<Frame> {
        self.target.snapshot()
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 共享的指标计数器
    pub fn metrics_handle(&self) -> Arc<ControllerMetrics> {
        self.metrics.clone()
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// 拆回求解器和硬件接口
    pub fn into_parts(self) -> (S, W) {
        (self.solver, self.writer)
    }
}

impl<S, W> std::fmt::Debug for CartesianMotionController<S, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartesianMotionController")
            .field("config", &self.config)
            .field("current", &self.current)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
