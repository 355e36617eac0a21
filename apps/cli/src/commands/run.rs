//! run 命令
//!
//! 在仿真机械臂上运行控制器：
//!
//! - 控制线程：固定频率调用 `update()`，每周期转发一次仿真关节状态
//! - 投递线程：按脚本时间把目标位姿交给控制器（模拟消息订阅回调）
//! - 输出线程：把遥测消息以 JSON Lines 写到 stdout

use anyhow::{Context, Result, bail};
use cartesian_core::config::ControllerConfig;
use cartesian_core::controller::CartesianMotionController;
use cartesian_core::solver::ForwardDynamicsSolver;
use cartesian_core::target::TargetPoseHandle;
use cartesian_core::telemetry::{ChannelTelemetry, JointState, TelemetryMessage};
use cartesian_sim::solver::JOINT_COUNT;
use cartesian_sim::{RecordingWriter, SimulatedSolver};
use clap::Args;
use crossbeam_channel::Receiver;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::runner::{LoopConfig, run_loop};
use crate::script::{ScriptedTarget, TargetScript};

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 控制器配置文件（TOML）
    #[arg(short, long)]
    pub config: PathBuf,

    /// 目标位姿脚本（TOML）
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// 控制频率（Hz）
    #[arg(short, long, default_value_t = 500.0)]
    pub rate: f64,

    /// 运行的周期数（缺省时运行到 Ctrl+C）
    #[arg(short = 'n', long)]
    pub cycles: Option<u64>,

    /// 不输出遥测
    #[arg(long)]
    pub no_telemetry: bool,

    /// 遥测通道容量
    #[arg(long, default_value_t = 1024)]
    pub telemetry_capacity: usize,

    /// 提升控制线程优先级
    #[arg(long)]
    pub realtime: bool,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        if !(self.rate > 0.0 && self.rate.is_finite()) {
            bail!("Invalid rate: {} (must be > 0)", self.rate);
        }

        let resolved = ControllerConfig::load_from_file(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?
            .resolve()
            .context("Invalid controller configuration")?;
        let script = match &self.script {
            Some(path) => TargetScript::load(path)?,
            None => TargetScript::default(),
        };

        let solver = SimulatedSolver::new(script.start_frame(), script.sim);
        let writer = RecordingWriter::new(resolved.command_modality, JOINT_COUNT);
        let base_frame = resolved.base_frame.clone();
        let mut controller = CartesianMotionController::new(solver, writer, resolved)?;

        let printer = if self.no_telemetry {
            None
        } else {
            let (sink, rx) = ChannelTelemetry::bounded(self.telemetry_capacity);
            controller = controller.with_telemetry(Arc::new(sink));
            Some(spawn_printer(rx))
        };
        let relay = controller.joint_state_relay();

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::Release);
        })
        .context("Failed to install Ctrl+C handler")?;

        controller.activate()?;
        let feeder = spawn_feeder(
            controller.target_handle(),
            script.targets,
            base_frame,
            running.clone(),
        );

        let loop_config = LoopConfig {
            frequency_hz: self.rate,
            max_cycles: self.cycles,
            realtime: self.realtime,
        };
        let mut joint_state = JointState {
            names: (1..=JOINT_COUNT).map(|i| format!("joint{}", i)).collect(),
            ..Default::default()
        };
        let result = run_loop(&mut controller, &loop_config, &running, |ctrl, _| {
            if let Some(relay) = &relay {
                let motion = ctrl.solver().joint_motion();
                joint_state.positions.clone_from(&motion.positions);
                joint_state.velocities.clone_from(&motion.velocities);
                joint_state.efforts.clone_from(&motion.efforts);
                relay.relay(joint_state.clone());
            }
        });

        running.store(false, Ordering::Release);
        controller.deactivate();
        let metrics = controller.metrics();
        let final_pose = controller.current_frame();

        // 释放所有发布端，输出线程随通道断开退出
        drop(relay);
        drop(controller);
        if feeder.join().is_err() {
            warn!("Target feeder thread panicked");
        }
        if let Some(printer) = printer
            && printer.join().is_err()
        {
            warn!("Telemetry printer thread panicked");
        }

        let summary = result?;
        info!(
            cycles = summary.cycles,
            overruns = summary.overruns,
            elapsed = ?summary.elapsed,
            "Control loop finished"
        );
        info!(
            accepted = metrics.target_updates_accepted,
            rejected = metrics.target_updates_rejected,
            telemetry_dropped = metrics.telemetry_dropped,
            pose = %final_pose,
            "Controller metrics"
        );
        if let Some(last) = summary.last {
            info!(error = %last.error, target = %last.target, "Last cycle");
        }
        Ok(())
    }
}

/// 按脚本时间投递目标位姿
fn spawn_feeder(
    handle: TargetPoseHandle,
    targets: Vec<ScriptedTarget>,
    base_frame: String,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        for target in targets {
            let due = start + target.delay();
            while running.load(Ordering::Acquire) && Instant::now() < due {
                let remaining = due.saturating_duration_since(Instant::now());
                thread::sleep(remaining.min(Duration::from_millis(10)));
            }
            if !running.load(Ordering::Acquire) {
                return;
            }

            let msg = target.to_message(&base_frame);
            let update = handle.set_target(&msg);
            info!(at_ms = target.at_ms, frame_id = %msg.frame_id, ?update, "Delivered target pose");
        }
    })
}

/// 把遥测消息写为 JSON Lines
fn spawn_printer(rx: Receiver<TelemetryMessage>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdout = std::io::stdout();
        let mut out = std::io::BufWriter::new(stdout.lock());
        for message in rx {
            let written = serde_json::to_writer(&mut out, &message)
                .map_err(std::io::Error::from)
                .and_then(|_| out.write_all(b"\n"));
            if let Err(e) = written {
                warn!("Failed to write telemetry: {}", e);
                return;
            }
        }
        if let Err(e) = out.flush() {
            warn!("Failed to flush telemetry: {}", e);
        }
    })
}
