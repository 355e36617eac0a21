//! 目标位姿缓冲区
//!
//! 单槽、无阻塞的“写覆盖 / 读拷贝”交接通道：
//!
//! - **写端** [`TargetPoseHandle`]：在异步投递上下文中调用（外部位姿消息到达），
//!   参考坐标系匹配时原子地整体替换目标位姿
//! - **读端** [`TargetPoseBuffer`]：实时控制周期每个周期读取一次快照
//!
//! # 同步机制
//!
//! 使用 `ArcSwapOption` 发布目标位姿：
//! - 读取无锁（`load`），实时路径不会等待写端
//! - 写端每次发布一个新的 `Arc<Frame>`，只保留最新值，不排队
//! - 一个周期内多次到达的更新被合并，下一个周期只看到最后被接受的那一个
//!
//! # 拒绝语义
//!
//! 参考坐标系与配置的基坐标系不一致，或位姿消息无法转换（姿态四元数退化、位置非有限）时，
//! 更新被丢弃：状态不变，输出限流警告。对读端而言，被拒绝的更新与“没有更新”无法区分。

use crate::frame::{Frame, PoseStamped};
use crate::metrics::ControllerMetrics;
use crate::throttle::WarnThrottle;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// 拒绝警告的最小间隔
pub const REJECTION_WARN_INTERVAL: Duration = Duration::from_secs(3);

/// 目标位姿更新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetUpdate {
    /// 已接受，替换了存储的目标位姿
    Accepted,
    /// 参考坐标系不匹配或位姿无效，已丢弃
    Rejected,
}

impl TargetUpdate {
    pub fn is_accepted(self) -> bool {
        self == TargetUpdate::Accepted
    }
}

struct TargetSlot {
    pose: ArcSwapOption<Frame>,
    base_frame: String,
    throttle: WarnThrottle,
    metrics: Arc<ControllerMetrics>,
}

/// 目标位姿缓冲区（读端，由控制器持有）
///
/// 生命周期：激活时以当前位姿播种（[`seed`](Self::seed)），
/// 激活期间由写端更新，去激活时丢弃（[`clear`](Self::clear)）。
pub struct TargetPoseBuffer {
    slot: Arc<TargetSlot>,
}

impl TargetPoseBuffer {
    /// 创建空缓冲区
    ///
    /// # 参数
    ///
    /// - `base_frame`: 接受目标位姿的参考坐标系
    /// - `metrics`: 更新计数写入的指标
    pub fn new(base_frame: impl Into<String>, metrics: Arc<ControllerMetrics>) -> Self {
        Self {
            slot: Arc::new(TargetSlot {
                pose: ArcSwapOption::empty(),
                base_frame: base_frame.into(),
                throttle: WarnThrottle::new(REJECTION_WARN_INTERVAL),
                metrics,
            }),
        }
    }

    /// 创建写端句柄（可 Clone，可跨线程）
    pub fn handle(&self) -> TargetPoseHandle {
        TargetPoseHandle {
            slot: self.slot.clone(),
        }
    }

    /// 读取目标快照
    ///
    /// 每个控制周期只调用一次；返回值是拷贝，之后的写入不会影响它。
    /// 尚未播种或已清除时返回 `None`。
    pub fn snapshot(&self) -> Option<Frame> {
        self.slot.pose.load().as_deref().copied()
    }

    /// 以给定位姿播种目标（激活握手）
    pub fn seed(&self, frame: Frame) {
        self.slot.pose.store(Some(Arc::new(frame)));
    }

    /// 丢弃目标（去激活）
    pub fn clear(&self) {
        self.slot.pose.store(None);
    }

    pub fn base_frame(&self) -> &str {
        &self.slot.base_frame
    }
}

/// 目标位姿写端
///
/// 用于异步投递上下文（例如消息订阅回调）。所有方法都不阻塞读端。
#[derive(Clone)]
pub struct TargetPoseHandle {
    slot: Arc<TargetSlot>,
}

impl TargetPoseHandle {
    /// 提交带参考坐标系的目标位姿
    ///
    /// # 示例
    ///
    /// ```rust
    /// use cartesian_core::frame::{CartesianPose, Frame, PoseStamped, Position3D, Quaternion};
    /// use cartesian_core::metrics::ControllerMetrics;
    /// use cartesian_core::target::{TargetPoseBuffer, TargetUpdate};
    /// use std::sync::Arc;
    ///
    /// let buffer = TargetPoseBuffer::new("base_link", Arc::new(ControllerMetrics::new()));
    /// buffer.seed(Frame::identity());
    /// let handle = buffer.handle();
    ///
    /// let pose = CartesianPose::new(Position3D::new(0.5, 0.0, 0.2), Quaternion::IDENTITY);
    /// assert_eq!(handle.set_target(&PoseStamped::new("base_link", pose)), TargetUpdate::Accepted);
    /// assert_eq!(handle.set_target(&PoseStamped::new("world", pose)), TargetUpdate::Rejected);
    ///
    /// let degenerate = CartesianPose::new(Position3D::ZERO, Quaternion::new(0.0, 0.0, 0.0, 0.0));
    /// assert_eq!(handle.set_target(&PoseStamped::new("base_link", degenerate)), TargetUpdate::Rejected);
    /// assert_eq!(buffer.snapshot().unwrap().position.x, 0.5);
    /// ```
    pub fn set_target(&self, msg: &PoseStamped) -> TargetUpdate {
        if msg.frame_id != self.slot.base_frame {
            return self.reject_frame_id(&msg.frame_id);
        }
        match msg.pose.try_to_frame() {
            Some(frame) => self.store(frame),
            None => self.reject(|suppressed| {
                let q = msg.pose.orientation;
                tracing::warn!(
                    position = ?msg.pose.position,
                    orientation = ?(q.x, q.y, q.z, q.w),
                    suppressed,
                    "Got target pose with degenerate orientation or non-finite position"
                );
            }),
        }
    }

    /// 提交目标位姿（已转换为 [`Frame`]）
    pub fn set_target_frame(&self, frame: Frame, reference_frame: &str) -> TargetUpdate {
        if reference_frame != self.slot.base_frame {
            return self.reject_frame_id(reference_frame);
        }
        self.store(frame)
    }

    fn store(&self, frame: Frame) -> TargetUpdate {
        let slot = &*self.slot;
        slot.pose.store(Some(Arc::new(frame)));
        slot.metrics.target_updates_accepted.fetch_add(1, Ordering::Relaxed);
        TargetUpdate::Accepted
    }

    fn reject_frame_id(&self, reference_frame: &str) -> TargetUpdate {
        self.reject(|suppressed| {
            tracing::warn!(
                expected = %self.slot.base_frame,
                got = %reference_frame,
                suppressed,
                "Got target pose in wrong reference frame"
            );
        })
    }

    /// 计数并按限流窗口输出警告（`warn` 收到被抑制的条数）
    fn reject(&self, warn: impl FnOnce(u64)) -> TargetUpdate {
        let slot = &*self.slot;
        slot.metrics.target_updates_rejected.fetch_add(1, Ordering::Relaxed);
        if let Some(suppressed) = slot.throttle.check() {
            slot.metrics.rejection_warnings.fetch_add(1, Ordering::Relaxed);
            warn(suppressed);
        }
        TargetUpdate::Rejected
    }

    /// 最近一次被接受（或播种）的目标位姿
    pub fn latest(&self) -> Option<Frame> {
        self.slot.pose.load().as_deref().copied()
    }

    pub fn base_frame(&self) -> &str {
        &self.slot.base_frame
    }
}

impl std::fmt::Debug for TargetPoseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetPoseHandle")
            .field("base_frame", &self.slot.base_frame)
            .finish_non_exhaustive()
    }
}
