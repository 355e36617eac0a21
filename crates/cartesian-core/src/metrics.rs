//! 控制器运行指标
//!
//! 零开销的原子计数器，实时控制线程与异步投递线程都可以更新，任何线程都可以读取，
//! 不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制器实时指标
///
/// # 使用示例
///
/// ```rust
/// use cartesian_core::metrics::ControllerMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(ControllerMetrics::default());
/// metrics.cycles.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.cycles, 1);
/// ```
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// 完成的外层控制周期数
    pub cycles: AtomicU64,

    /// 求解器积分子步总数
    pub solver_substeps: AtomicU64,

    /// 被接受的目标位姿更新
    pub target_updates_accepted: AtomicU64,

    /// 因参考坐标系不匹配被拒绝的目标位姿更新
    pub target_updates_rejected: AtomicU64,

    /// 实际输出的拒绝警告数（受限流控制，小于等于拒绝数）
    pub rejection_warnings: AtomicU64,

    /// 转发的关节状态消息
    pub joint_states_relayed: AtomicU64,

    /// 因通道已满或断开而丢弃的遥测消息
    ///
    /// 如果这个值快速增长，说明遥测消费端跟不上控制频率。
    pub telemetry_dropped: AtomicU64,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 使用 `Ordering::Relaxed`，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            solver_substeps: self.solver_substeps.load(Ordering::Relaxed),
            target_updates_accepted: self.target_updates_accepted.load(Ordering::Relaxed),
            target_updates_rejected: self.target_updates_rejected.load(Ordering::Relaxed),
            rejection_warnings: self.rejection_warnings.load(Ordering::Relaxed),
            joint_states_relayed: self.joint_states_relayed.load(Ordering::Relaxed),
            telemetry_dropped: self.telemetry_dropped.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.solver_substeps.store(0, Ordering::Relaxed);
        self.target_updates_accepted.store(0, Ordering::Relaxed);
        self.target_updates_rejected.store(0, Ordering::Relaxed);
        self.rejection_warnings.store(0, Ordering::Relaxed);
        self.joint_states_relayed.store(0, Ordering::Relaxed);
        self.telemetry_dropped.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub solver_substeps: u64,
    pub target_updates_accepted: u64,
    pub target_updates_rejected: u64,
    pub rejection_warnings: u64,
    pub joint_states_relayed: u64,
    pub telemetry_dropped: u64,
}

impl MetricsSnapshot {
    /// 被拒绝更新占全部更新的比例
    pub fn rejection_ratio(&self) -> f64 {
        let total = self.target_updates_accepted + self.target_updates_rejected;
        if total == 0 {
            0.0
        } else {
            self.target_updates_rejected as f64 / total as f64
        }
    }
}
