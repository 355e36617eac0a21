//! 控制器集成测试
//!
//! 用记录调用的测试求解器和硬件接口验证激活握手、子步策略、故障传播和遥测输出。

use cartesian_core::prelude::*;
use cartesian_core::telemetry::EndEffectorState;
use nalgebra::{UnitQuaternion, Vector3};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const JOINTS: usize = 6;

#[derive(Debug, thiserror::Error)]
#[error("jacobian became singular")]
struct SingularJacobian;

#[derive(Debug, thiserror::Error)]
#[error("actuator bus offline")]
struct BusOffline;

/// 测试求解器：位姿按 `gain * error * dt` 前进，关节运动直接取误差分量
struct MockSolver {
    pose: Frame,
    motion: JointMotion,
    gain: f64,
    advances: usize,
    errors: Vec<MotionError>,
    fail: bool,
}

impl MockSolver {
    fn at(pose: Frame) -> Self {
        Self {
            pose,
            motion: JointMotion::zeros(JOINTS),
            gain: 5.0,
            advances: 0,
            errors: Vec::new(),
            fail: false,
        }
    }
}

impl ForwardDynamicsSolver for MockSolver {
    type Error = SingularJacobian;

    fn end_effector_pose(&self) -> Frame {
        self.pose
    }

    fn advance(&mut self, error: &MotionError, period: Duration) -> Result<(), SingularJacobian> {
        if self.fail {
            return Err(SingularJacobian);
        }
        let dt = period.as_secs_f64();
        self.advances += 1;
        self.errors.push(*error);

        self.pose.position += error.translation() * self.gain * dt;
        self.pose.rotation =
            UnitQuaternion::from_scaled_axis(error.rotation() * self.gain * dt) * self.pose.rotation;

        for (i, e) in error.as_array().iter().enumerate() {
            self.motion.velocities[i] = *e;
            self.motion.positions[i] += *e * dt;
            self.motion.efforts[i] = 2.0 * *e;
        }
        Ok(())
    }

    fn joint_motion(&self) -> &JointMotion {
        &self.motion
    }
}

/// 测试硬件接口：记录每次写入
struct MockWriter {
    modality: CommandModality,
    joints: usize,
    writes: Vec<Vec<f64>>,
    fail: bool,
}

impl MockWriter {
    fn new(modality: CommandModality) -> Self {
        Self {
            modality,
            joints: JOINTS,
            writes: Vec::new(),
            fail: false,
        }
    }
}

impl HardwareCommandWriter for MockWriter {
    type Error = BusOffline;

    fn modality(&self) -> CommandModality {
        self.modality
    }

    fn joint_count(&self) -> usize {
        self.joints
    }

    fn write_commands(&mut self, commands: &[f64]) -> Result<(), BusOffline> {
        if self.fail {
            return Err(BusOffline);
        }
        self.writes.push(commands.to_vec());
        Ok(())
    }
}

fn iterative(k: u32) -> IntegrationStrategy {
    IntegrationStrategy::Iterative {
        substeps: NonZeroU32::new(k).unwrap(),
    }
}

fn start_pose() -> Frame {
    Frame::from_position_rpy(Vector3::new(0.3, 0.3, 0.3), 0.5, -0.5, 0.25)
}

fn assert_near_zero(error: &MotionError) {
    assert!(error.0.norm() < 1e-12, "{}", error);
}

fn controller(
    modality: CommandModality,
    strategy: IntegrationStrategy,
) -> CartesianMotionController<MockSolver, MockWriter> {
    CartesianMotionController::new(
        MockSolver::at(start_pose()),
        MockWriter::new(modality),
        ResolvedConfig::new("base_link", modality, strategy),
    )
    .unwrap()
}

#[test]
fn test_activation_produces_zero_error() {
    let mut ctrl = controller(CommandModality::Position, iterative(10));
    ctrl.activate().unwrap();

    assert_eq!(ctrl.target_frame(), Some(start_pose()));

    let report = ctrl.update().unwrap();
    assert_near_zero(&report.error);
    assert_eq!(report.target, start_pose());
    assert_eq!(report.start_pose, start_pose());
    assert_eq!(ctrl.solver().errors.len(), 10);
    ctrl.solver().errors.iter().for_each(assert_near_zero);

    // 零误差不移动末端，命令无跳变
    let moved = ctrl.current_frame().position - start_pose().position;
    assert!(moved.norm() < 1e-12);
    assert_eq!(ctrl.writer().writes.len(), 1);
    assert!(ctrl.writer().writes[0].iter().all(|c| c.abs() < 1e-12));
}

#[test]
fn test_iterative_modality_runs_k_substeps_and_writes_once() {
    let mut ctrl = controller(CommandModality::Position, iterative(10));
    ctrl.activate().unwrap();

    for _ in 0..3 {
        let report = ctrl.update().unwrap();
        assert_eq!(report.substeps, 10);
    }

    assert_eq!(ctrl.solver().advances, 30);
    assert_eq!(ctrl.writer().writes.len(), 3);

    let metrics = ctrl.metrics();
    assert_eq!(metrics.cycles, 3);
    assert_eq!(metrics.solver_substeps, 30);
}

#[test]
fn test_velocity_modality_runs_single_step() {
    let mut ctrl = controller(CommandModality::Velocity, IntegrationStrategy::SingleStep);
    ctrl.activate().unwrap();

    let target = Frame::new(
        start_pose().position + Vector3::new(0.1, 0.0, 0.0),
        start_pose().rotation,
    );
    ctrl.target_handle().set_target_frame(target, "base_link");

    let report = ctrl.update().unwrap();
    assert_eq!(report.substeps, 1);
    assert_eq!(ctrl.solver().advances, 1);

    // 速度命令取求解器的关节速度
    let written = &ctrl.writer().writes[0];
    approx::assert_relative_eq!(written[0], 0.1, epsilon = 1e-12);
    assert!(written[1..].iter().all(|c| c.abs() < 1e-12));
}

#[test]
fn test_effort_modality_writes_efforts() {
    let mut ctrl = controller(CommandModality::Effort, iterative(1));
    ctrl.activate().unwrap();
    let target = Frame::new(
        start_pose().position + Vector3::new(0.0, 0.0, -0.2),
        start_pose().rotation,
    );
    ctrl.target_handle().set_target_frame(target, "base_link");

    ctrl.update().unwrap();
    approx::assert_relative_eq!(ctrl.writer().writes[0][2], -0.4, epsilon = 1e-12);
}

#[test]
fn test_wrong_frame_update_is_ignored() {
    let mut ctrl = controller(CommandModality::Position, iterative(10));
    ctrl.activate().unwrap();
    let handle = ctrl.target_handle();

    let far = CartesianPose::new(Position3D::new(9.0, 9.0, 9.0), Quaternion::IDENTITY);
    assert_eq!(
        handle.set_target(&PoseStamped::new("wrong_frame", far)),
        TargetUpdate::Rejected
    );

    let report = ctrl.update().unwrap();
    assert_near_zero(&report.error);
    assert_eq!(report.target, start_pose());
    assert_eq!(ctrl.metrics().target_updates_rejected, 1);
}

#[test]
fn test_far_target_is_clamped_per_substep() {
    let mut ctrl = controller(CommandModality::Position, iterative(4));
    ctrl.activate().unwrap();

    let far = CartesianPose::new(Position3D::new(5.3, 0.3, 0.3), Quaternion::IDENTITY);
    assert!(ctrl.target_handle().set_target(&PoseStamped::new("base_link", far)).is_accepted());

    let report = ctrl.update().unwrap();
    assert_eq!(report.target.position, Vector3::new(5.3, 0.3, 0.3));
    for error in &ctrl.solver().errors {
        assert!(error.translation().norm() <= 1.0 + 1e-12);
        assert!(error.rotation().norm() <= 1.0 + 1e-12);
    }

    // 每个子步都从新位姿重新计算，末端单调接近目标
    let x = ctrl.current_frame().position.x;
    assert!(x > 0.3 && x < 5.3, "x = {}", x);
}

#[test]
fn test_one_target_snapshot_per_cycle() {
    let mut ctrl = controller(CommandModality::Position, iterative(3));
    ctrl.activate().unwrap();
    let handle = ctrl.target_handle();

    handle.set_target_frame(Frame::from_translation(0.4, 0.3, 0.3), "base_link");
    handle.set_target_frame(Frame::from_translation(0.5, 0.3, 0.3), "base_link");

    // 同一周期内的多个更新只看到最后一个
    let report = ctrl.update().unwrap();
    assert_eq!(report.target.position, Vector3::new(0.5, 0.3, 0.3));
}

#[test]
fn test_update_before_activation_is_replaced_by_seed() {
    let mut ctrl = controller(CommandModality::Position, iterative(2));
    ctrl.target_handle()
        .set_target_frame(Frame::from_translation(1.0, 1.0, 1.0), "base_link");

    ctrl.activate().unwrap();
    assert_eq!(ctrl.target_frame(), Some(start_pose()));
    assert_near_zero(&ctrl.update().unwrap().error);
}

#[test]
fn test_lifecycle_errors() {
    let mut ctrl = controller(CommandModality::Position, iterative(2));
    assert!(matches!(ctrl.update(), Err(ControlError::NotActive)));

    ctrl.activate().unwrap();
    assert!(ctrl.is_active());
    assert!(matches!(ctrl.activate(), Err(ControlError::AlreadyActive)));

    ctrl.deactivate();
    assert!(!ctrl.is_active());
    assert!(ctrl.target_frame().is_none());
    assert!(matches!(ctrl.update(), Err(ControlError::NotActive)));

    // 可以再次激活
    ctrl.activate().unwrap();
    ctrl.update().unwrap();
}

#[test]
fn test_solver_failure_propagates_without_write() {
    let mut solver = MockSolver::at(start_pose());
    solver.fail = true;
    let mut ctrl = CartesianMotionController::new(
        solver,
        MockWriter::new(CommandModality::Position),
        ResolvedConfig::new("base_link", CommandModality::Position, iterative(5)),
    )
    .unwrap();
    ctrl.activate().unwrap();

    let err = ctrl.update().unwrap_err();
    assert!(matches!(err, ControlError::Solver { .. }));
    assert!(err.to_string().contains("jacobian became singular"));
    assert!(ctrl.writer().writes.is_empty());
    assert_eq!(ctrl.metrics().cycles, 0);
}

#[test]
fn test_hardware_failure_propagates() {
    let mut writer = MockWriter::new(CommandModality::Position);
    writer.fail = true;
    let mut ctrl = CartesianMotionController::new(
        MockSolver::at(start_pose()),
        writer,
        ResolvedConfig::new("base_link", CommandModality::Position, iterative(2)),
    )
    .unwrap();
    ctrl.activate().unwrap();

    let err = ctrl.update().unwrap_err();
    assert!(matches!(err, ControlError::Hardware { .. }));
    assert!(err.is_collaborator_fault());
}

#[test]
fn test_command_length_mismatch() {
    let mut writer = MockWriter::new(CommandModality::Position);
    writer.joints = 7;
    let mut ctrl = CartesianMotionController::new(
        MockSolver::at(start_pose()),
        writer,
        ResolvedConfig::new("base_link", CommandModality::Position, iterative(2)),
    )
    .unwrap();
    ctrl.activate().unwrap();

    assert!(matches!(
        ctrl.update(),
        Err(ControlError::CommandLength {
            expected: 7,
            actual: 6
        })
    ));
    assert!(ctrl.writer().writes.is_empty());
}

#[test]
fn test_configuration_mismatches_are_rejected() {
    let result = CartesianMotionController::new(
        MockSolver::at(start_pose()),
        MockWriter::new(CommandModality::Velocity),
        ResolvedConfig::new("base_link", CommandModality::Position, iterative(10)),
    );
    assert!(matches!(result, Err(ConfigError::ModalityMismatch { .. })));

    let result = CartesianMotionController::new(
        MockSolver::at(start_pose()),
        MockWriter::new(CommandModality::Velocity),
        ResolvedConfig::new("base_link", CommandModality::Velocity, iterative(10)),
    );
    assert!(matches!(
        result,
        Err(ConfigError::InvalidParameter { name: "iterations", .. })
    ));

    let result = CartesianMotionController::new(
        MockSolver::at(start_pose()),
        MockWriter::new(CommandModality::Effort),
        ResolvedConfig::new("base_link", CommandModality::Effort, IntegrationStrategy::SingleStep),
    );
    assert!(matches!(
        result,
        Err(ConfigError::InvalidParameter { name: "iterations", .. })
    ));
}

#[test]
fn test_end_effector_telemetry_each_cycle() {
    let (sink, rx) = ChannelTelemetry::bounded(16);
    let mut config = ResolvedConfig::new("base_link", CommandModality::Position, iterative(3));
    config.flange_to_tool = Frame::from_translation(0.0, 0.0, 0.1034);

    let mut ctrl = CartesianMotionController::new(
        MockSolver::at(start_pose()),
        MockWriter::new(CommandModality::Position),
        config,
    )
    .unwrap()
    .with_telemetry(Arc::new(sink));
    ctrl.activate().unwrap();

    ctrl.update().unwrap();
    ctrl.update().unwrap();

    let messages: Vec<_> = rx.try_iter().collect();
    assert_eq!(messages.len(), 2);
    match &messages[0] {
        TelemetryMessage::EndEffector(state) => {
            let expected = EndEffectorState::new(
                &start_pose(),
                &Frame::from_translation(0.0, 0.0, 0.1034),
                &Frame::identity(),
            );
            assert_eq!(*state, expected);
            assert_eq!(state.F_T_EE[14], 0.1034);
        },
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_telemetry_drops_never_fail_the_cycle() {
    let (sink, rx) = ChannelTelemetry::bounded(1);
    drop(rx);
    let mut ctrl = controller(CommandModality::Position, iterative(2)).with_telemetry(Arc::new(sink));
    ctrl.activate().unwrap();

    ctrl.update().unwrap();
    ctrl.update().unwrap();
    assert_eq!(ctrl.metrics().telemetry_dropped, 2);
    assert_eq!(ctrl.writer().writes.len(), 2);
}

#[test]
fn test_joint_state_relay() {
    let ctrl = controller(CommandModality::Position, iterative(2));
    assert!(ctrl.joint_state_relay().is_none());

    let (sink, rx) = ChannelTelemetry::bounded(4);
    let ctrl = ctrl.with_telemetry(Arc::new(sink));
    let relay = ctrl.joint_state_relay().unwrap();

    let joint_state = JointState {
        names: (1..=6).map(|i| format!("joint{}", i)).collect(),
        positions: vec![0.1; 6],
        velocities: vec![0.0; 6],
        efforts: vec![-1.0; 6],
    };
    assert!(relay.relay(joint_state.clone()));
    assert_eq!(rx.try_recv().unwrap(), TelemetryMessage::JointState(joint_state));
    assert_eq!(ctrl.metrics().joint_states_relayed, 1);
}
