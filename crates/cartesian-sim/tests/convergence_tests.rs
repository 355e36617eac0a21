//! 闭环收敛测试
//!
//! 控制器驱动仿真求解器，验证两种积分策略都把末端带到目标位姿。

use cartesian_core::MAX_DISTANCE;
use cartesian_core::prelude::*;
use cartesian_sim::{RecordingWriter, SimParams, SimulatedSolver, solver::JOINT_COUNT};
use nalgebra::{UnitQuaternion, Vector3};
use std::num::NonZeroU32;

fn build(
    modality: CommandModality,
    strategy: IntegrationStrategy,
    start: Frame,
) -> CartesianMotionController<SimulatedSolver, RecordingWriter> {
    CartesianMotionController::new(
        SimulatedSolver::new(start, SimParams::default()),
        RecordingWriter::new(modality, JOINT_COUNT),
        ResolvedConfig::new("base_link", modality, strategy),
    )
    .unwrap()
}

fn distance(a: &Frame, b: &Frame) -> (f64, f64) {
    ((a.position - b.position).norm(), a.rotation.angle_to(&b.rotation))
}

fn target() -> PoseStamped {
    let rotation = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.8);
    PoseStamped::new(
        "base_link",
        CartesianPose::new(Position3D::new(0.6, -0.2, 0.5), Quaternion::from(rotation)),
    )
}

#[test]
fn test_iterative_position_control_converges() {
    let start = Frame::from_translation(0.3, 0.0, 0.4);
    let mut ctrl = build(
        CommandModality::Position,
        IntegrationStrategy::Iterative {
            substeps: NonZeroU32::new(10).unwrap(),
        },
        start,
    );
    ctrl.activate().unwrap();
    assert!(ctrl.target_handle().set_target(&target()).is_accepted());

    let goal = Frame::from(target().pose);
    for _ in 0..100 {
        ctrl.update().unwrap();
    }

    let (dp, da) = distance(&ctrl.current_frame(), &goal);
    assert!(dp < 1e-3, "position error {}", dp);
    assert!(da < 1e-3, "orientation error {}", da);

    // 位置命令就是仿真关节位置
    let last = ctrl.writer().last().unwrap();
    approx::assert_relative_eq!(last[0], ctrl.current_frame().position.x, epsilon = 1e-12);
    assert_eq!(ctrl.solver().steps(), 1000);
}

#[test]
fn test_single_step_velocity_control_converges() {
    let start = Frame::from_translation(0.3, 0.0, 0.4);
    let mut ctrl = build(CommandModality::Velocity, IntegrationStrategy::SingleStep, start);
    ctrl.activate().unwrap();
    ctrl.target_handle().set_target(&target());

    let goal = Frame::from(target().pose);
    for _ in 0..1000 {
        ctrl.update().unwrap();
    }

    let (dp, da) = distance(&ctrl.current_frame(), &goal);
    assert!(dp < 1e-3, "position error {}", dp);
    assert!(da < 1e-3, "orientation error {}", da);
    assert_eq!(ctrl.solver().steps(), 1000);
    assert_eq!(ctrl.writer().total_writes(), 1000);

    // 收敛后速度命令趋近于零
    assert!(ctrl.writer().last().unwrap().iter().all(|v| v.abs() < 1e-2));
}

#[test]
fn test_far_target_progresses_each_cycle() {
    let start = Frame::identity();
    let mut ctrl = build(
        CommandModality::Position,
        IntegrationStrategy::Iterative {
            substeps: NonZeroU32::new(5).unwrap(),
        },
        start,
    );
    ctrl.activate().unwrap();
    ctrl.target_handle()
        .set_target_frame(Frame::from_translation(10.0, 0.0, 0.0), "base_link");

    let mut last = 0.0;
    for _ in 0..20 {
        let report = ctrl.update().unwrap();
        assert!(report.error.translation().norm() <= MAX_DISTANCE + 1e-12);
        let x = ctrl.current_frame().position.x;
        assert!(x > last, "{} <= {}", x, last);
        last = x;
    }
}

#[test]
fn test_retarget_mid_motion() {
    let mut ctrl = build(
        CommandModality::Effort,
        IntegrationStrategy::Iterative {
            substeps: NonZeroU32::new(10).unwrap(),
        },
        Frame::identity(),
    );
    ctrl.activate().unwrap();
    let handle = ctrl.target_handle();

    handle.set_target_frame(Frame::from_translation(0.5, 0.0, 0.0), "base_link");
    for _ in 0..5 {
        ctrl.update().unwrap();
    }

    let second = Frame::new(
        Vector3::new(0.0, 0.4, 0.2),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5),
    );
    handle.set_target_frame(second, "base_link");
    for _ in 0..100 {
        ctrl.update().unwrap();
    }

    let (dp, da) = distance(&ctrl.current_frame(), &second);
    assert!(dp < 1e-3 && da < 1e-3, "dp = {}, da = {}", dp, da);
}

#[test]
fn test_hardware_disconnect_surfaces_as_control_error() {
    let mut writer = RecordingWriter::new(CommandModality::Position, JOINT_COUNT);
    writer.disconnect();
    let mut ctrl = CartesianMotionController::new(
        SimulatedSolver::new(Frame::identity(), SimParams::default()),
        writer,
        ResolvedConfig::new(
            "base_link",
            CommandModality::Position,
            IntegrationStrategy::Iterative {
                substeps: NonZeroU32::new(2).unwrap(),
            },
        ),
    )
    .unwrap();
    ctrl.activate().unwrap();

    let err = ctrl.update().unwrap_err();
    assert!(matches!(err, ControlError::Hardware { .. }));
    assert!(err.to_string().contains("disconnected"));
}
