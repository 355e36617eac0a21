//! Loop Runner - 固定频率控制循环
//!
//! - **精确定时**: 锚点调度 + `spin_sleep`，耗时操作自动从睡眠中扣除
//! - **超时处理**: 周期超时时重置锚点，不累积延迟
//! - **停止条件**: 达到周期数、收到 Ctrl+C 或控制器返回错误

use cartesian_core::controller::{CartesianMotionController, CycleReport};
use cartesian_core::error::ControlError;
use cartesian_core::hardware::HardwareCommandWriter;
use cartesian_core::solver::ForwardDynamicsSolver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// 最大周期数（None 表示运行到被中断）
    pub max_cycles: Option<u64>,

    /// 是否尝试把控制线程提升到最高优先级
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 500.0,
            max_cycles: None,
            realtime: false,
        }
    }
}

/// 循环结束时的统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub overruns: u64,
    pub elapsed: Duration,
    /// 最后一个周期的报告
    pub last: Option<CycleReport>,
}

/// 运行控制循环直到停止条件满足
///
/// `on_cycle` 在每个成功的周期之后调用。
pub fn run_loop<S, W, F>(
    controller: &mut CartesianMotionController<S, W>,
    config: &LoopConfig,
    running: &Arc<AtomicBool>,
    mut on_cycle: F,
) -> Result<LoopSummary, ControlError>
where
    S: ForwardDynamicsSolver,
    W: HardwareCommandWriter,
    F: FnMut(&CartesianMotionController<S, W>, &CycleReport),
{
    if config.realtime {
        raise_priority();
    }

    let period = Duration::from_secs_f64(1.0 / config.frequency_hz);
    let start = Instant::now();
    let mut next_tick = start + period;
    let mut summary = LoopSummary {
        cycles: 0,
        overruns: 0,
        elapsed: Duration::ZERO,
        last: None,
    };

    while running.load(Ordering::Acquire) {
        if let Some(max_cycles) = config.max_cycles
            && summary.cycles >= max_cycles
        {
            break;
        }

        let report = controller.update()?;
        on_cycle(controller, &report);
        summary.cycles += 1;
        summary.last = Some(report);

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
            next_tick += period;
        } else {
            summary.overruns += 1;
            tracing::debug!(
                "Control loop overrun by {:?} (period {:?})",
                now.duration_since(next_tick),
                period
            );
            next_tick = now + period;
        }
    }

    summary.elapsed = start.elapsed();
    if summary.overruns > 0 {
        warn!(
            "{} of {} cycles overran the {:?} period",
            summary.overruns, summary.cycles, period
        );
    }
    Ok(summary)
}

fn raise_priority() {
    use thread_priority::*;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => info!("Control thread priority set to MAX (realtime)"),
        Err(e) => warn!(
            "Failed to set control thread priority: {:?}. \
             On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
            e
        ),
    }
}
