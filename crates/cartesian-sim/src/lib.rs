//! Cartesian Sim - 仿真协作者
//!
//! 为 `cartesian-core` 提供两个外部协作者的参考实现，用于测试和命令行演示：
//!
//! - [`SimulatedSolver`]: 解耦的笛卡尔质点模型正动力学求解器
//! - [`RecordingWriter`]: 记录每周期关节命令的硬件接口

pub mod solver;
pub mod writer;

pub use solver::{SimError, SimParams, SimulatedSolver};
pub use writer::{RecordingWriter, WriterError};
