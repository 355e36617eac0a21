//! Cartesian Motion Core - 笛卡尔运动控制核心
//!
//! 把流式输入的目标末端位姿转换为关节命令的实时控制核心：
//! 计算当前位姿与目标位姿之间的钳位六维误差，驱动正动力学求解器积分，
//! 再把关节运动写入硬件命令接口。
//!
//! # 架构设计
//!
//! - **位姿** (`frame`, `motion_error`): 位姿表示与钳位误差律
//! - **边界** (`solver`, `hardware`): 正动力学求解器和硬件命令接口两个外部协作者
//! - **积分** (`integrator`): 按命令模态选定的子步策略
//! - **交接** (`target`): 异步投递上下文到实时周期的单槽目标位姿通道
//! - **控制器** (`controller`): 激活握手与每周期流程
//! - **遥测** (`telemetry`, `metrics`): 末端状态记录、关节状态转发与运行指标
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use cartesian_core::prelude::*;
//!
//! let resolved = ControllerConfig::load_from_file("controller.toml")?.resolve()?;
//! let mut controller = CartesianMotionController::new(solver, writer, resolved)?;
//! controller.activate()?;
//! let report = controller.update()?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod hardware;
pub mod integrator;
pub mod metrics;
pub mod motion_error;
pub mod solver;
pub mod target;
pub mod telemetry;
pub mod throttle;

// Prelude 模块
pub mod prelude;

pub use config::{ControllerConfig, ResolvedConfig};
pub use controller::{CartesianMotionController, CycleReport};
pub use error::{BoxedError, ConfigError, ControlError};
pub use frame::{CartesianPose, Frame, PoseStamped, Position3D, Quaternion};
pub use hardware::{CommandModality, HardwareCommandWriter};
pub use integrator::{IntegrationStrategy, SUBSTEP_PERIOD};
pub use metrics::{ControllerMetrics, MetricsSnapshot};
pub use motion_error::{MAX_ANGLE, MAX_DISTANCE, MotionError, compute_motion_error};
pub use solver::{ForwardDynamicsSolver, JointMotion};
pub use target::{TargetPoseBuffer, TargetPoseHandle, TargetUpdate};
pub use telemetry::{
    ChannelTelemetry, EndEffectorState, JointState, JointStateRelay, TelemetryError,
    TelemetryMessage, TelemetrySink,
};
