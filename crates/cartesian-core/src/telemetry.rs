//! 遥测输出
//!
//! - [`EndEffectorState`]: 末端位姿记录，16 元素列主序齐次变换
//! - [`JointStateRelay`]: 关节状态镜像，原样转发
//! - [`TelemetrySink`] / [`ChannelTelemetry`]: 发布边界，不阻塞实时周期
//!
//! # 记录布局
//!
//! ```text
//! idx:  0  4  8 12
//!       1  5  9 13
//!       2  6 10 14
//!       3  7 11 15
//! ```
//!
//! 平移位于 12-14；旋转块位于 0,1,2,4,5,6,8,9,10，按**转置**存放
//! （即存放内部旋转矩阵的逆）：`record[c * 4 + r] = R[(c, r)]`。
//! 3、7、11 为 0，15 为 1。三个变换字段使用同一布局。

use crate::frame::Frame;
use crate::metrics::ControllerMetrics;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use thiserror::Error;

/// 按记录布局编码位姿
pub fn transform_record(frame: &Frame) -> [f64; 16] {
    let rotation = frame.rotation.to_rotation_matrix();
    let m = rotation.matrix();

    let mut record = [0.0; 16];
    for c in 0..3 {
        for r in 0..3 {
            record[c * 4 + r] = m[(c, r)];
        }
    }
    record[12] = frame.position.x;
    record[13] = frame.position.y;
    record[14] = frame.position.z;
    record[15] = 1.0;
    record
}

/// 末端状态记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct EndEffectorState {
    /// 末端在基坐标系中的位姿
    pub O_T_EE: [f64; 16],
    /// 工具（末端）坐标系在法兰坐标系中的位姿
    pub F_T_EE: [f64; 16],
    /// 刚度坐标系在末端坐标系中的位姿
    pub EE_T_K: [f64; 16],
}

impl EndEffectorState {
    /// 由当前末端位姿和两个辅助变换构造
    ///
    /// 辅助变换来自配置（见 [`ResolvedConfig`](crate::config::ResolvedConfig)），不是计算得出的。
    pub fn new(current: &Frame, flange_to_tool: &Frame, tool_to_stiffness: &Frame) -> Self {
        EndEffectorState {
            O_T_EE: transform_record(current),
            F_T_EE: transform_record(flange_to_tool),
            EE_T_K: transform_record(tool_to_stiffness),
        }
    }

    /// 末端位置 `[x, y, z]`
    pub fn position(&self) -> [f64; 3] {
        [self.O_T_EE[12], self.O_T_EE[13], self.O_T_EE[14]]
    }
}

/// 关节状态镜像消息
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointState {
    pub names: Vec<String>,
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub efforts: Vec<f64>,
}

/// 遥测消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryMessage {
    EndEffector(EndEffectorState),
    JointState(JointState),
}

/// 遥测发布错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// 通道已满（消费端跟不上）
    #[error("Telemetry channel full")]
    Full,

    /// 消费端已断开
    #[error("Telemetry channel disconnected")]
    Disconnected,
}

/// 遥测发布接口
///
/// 实现必须不阻塞：实时周期中调用。
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, message: TelemetryMessage) -> Result<(), TelemetryError>;
}

/// 基于有界 crossbeam 通道的遥测发布
///
/// 通道满时丢弃新消息（`try_send`），不阻塞发布方。
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
    tx: Sender<TelemetryMessage>,
}

impl ChannelTelemetry {
    /// 创建容量为 `capacity` 的发布端和接收端
    pub fn bounded(capacity: usize) -> (Self, Receiver<TelemetryMessage>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (ChannelTelemetry { tx }, rx)
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn publish(&self, message: TelemetryMessage) -> Result<(), TelemetryError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => TelemetryError::Full,
            TrySendError::Disconnected(_) => TelemetryError::Disconnected,
        })
    }
}

/// 发布并计数丢弃
pub(crate) fn publish_counted(
    sink: &dyn TelemetrySink,
    metrics: &ControllerMetrics,
    message: TelemetryMessage,
) -> bool {
    match sink.publish(message) {
        Ok(()) => true,
        Err(e) => {
            metrics.telemetry_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Dropping telemetry message: {}", e);
            false
        },
    }
}

/// 关节状态转发器
///
/// 在异步投递上下文中使用：收到的关节状态不做任何修改，直接发布到遥测。
#[derive(Clone)]
pub struct JointStateRelay {
    sink: Arc<dyn TelemetrySink>,
    metrics: Arc<ControllerMetrics>,
}

impl JointStateRelay {
    pub fn new(sink: Arc<dyn TelemetrySink>, metrics: Arc<ControllerMetrics>) -> Self {
        Self { sink, metrics }
    }

    /// 转发一条关节状态，返回是否成功发布
    pub fn relay(&self, joint_state: JointState) -> bool {
        let published = publish_counted(
            self.sink.as_ref(),
            &self.metrics,
            TelemetryMessage::JointState(joint_state),
        );
        if published {
            self.metrics.joint_states_relayed.fetch_add(1, Ordering::Relaxed);
        }
        published
    }
}
