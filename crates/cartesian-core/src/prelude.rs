//! 常用类型的统一导入
//!
//! ```rust
//! use cartesian_core::prelude::*;
//! ```

pub use crate::config::{ControllerConfig, ResolvedConfig};
pub use crate::controller::{CartesianMotionController, CycleReport};
pub use crate::error::{ConfigError, ControlError};
pub use crate::frame::{CartesianPose, Frame, PoseStamped, Position3D, Quaternion};
pub use crate::hardware::{CommandModality, HardwareCommandWriter};
pub use crate::integrator::IntegrationStrategy;
pub use crate::motion_error::{MotionError, compute_motion_error};
pub use crate::solver::{ForwardDynamicsSolver, JointMotion};
pub use crate::target::{TargetPoseHandle, TargetUpdate};
pub use crate::telemetry::{ChannelTelemetry, JointState, TelemetryMessage, TelemetrySink};
