//! 运动误差计算
//!
//! 将目标位姿与当前位姿之差转换为 6 维笛卡尔误差 `[dx, dy, dz, rx, ry, rz]`：
//! 前三维是平移误差，后三维是旋转误差的轴角（Rodrigues）向量。
//!
//! # 钳位
//!
//! 每个周期的误差幅值被钳位到 [`MAX_DISTANCE`] / [`MAX_ANGLE`]。剩余误差不会丢失：
//! 下一个周期从更接近目标的当前位姿重新计算。
//!
//! # 退化几何
//!
//! - 旋转差为零：轴取零向量，角度为 0
//! - 平移差为零：方向取零向量，距离为 0
//!
//! 两者都不是错误，计算对全部输入域都有定义。

use crate::frame::Frame;
use nalgebra::{UnitQuaternion, Vector3, Vector6};
use std::fmt;

/// 单周期最大旋转误差（弧度）
pub const MAX_ANGLE: f64 = 1.0;

/// 单周期最大平移误差（长度单位，通常为米）
pub const MAX_DISTANCE: f64 = 1.0;

/// 6 维笛卡尔运动误差
///
/// 每个周期（每个子步）重新计算，不跨周期保存。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionError(pub Vector6<f64>);

impl MotionError {
    pub fn zero() -> Self {
        MotionError(Vector6::zeros())
    }

    pub fn from_parts(translation: Vector3<f64>, rotation: Vector3<f64>) -> Self {
        MotionError(Vector6::new(
            translation.x,
            translation.y,
            translation.z,
            rotation.x,
            rotation.y,
            rotation.z,
        ))
    }

    /// 平移误差 `[dx, dy, dz]`
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.0[0], self.0[1], self.0[2])
    }

    /// 旋转误差（轴角向量）`[rx, ry, rz]`
    pub fn rotation(&self) -> Vector3<f64> {
        Vector3::new(self.0[3], self.0[4], self.0[5])
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl Default for MotionError {
    fn default() -> Self {
        MotionError::zero()
    }
}

impl From<MotionError> for [f64; 6] {
    fn from(error: MotionError) -> Self {
        error.as_array()
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.0;
        write!(
            f,
            "MotionError(t: ({:.4}, {:.4}, {:.4}), r: ({:.4}, {:.4}, {:.4}))",
            e[0], e[1], e[2], e[3], e[4], e[5]
        )
    }
}

/// 计算钳位后的运动误差（误差 = 目标 - 当前，表达在基坐标系中）
///
/// 1. 旋转差 `target.rotation * current.rotation⁻¹`
/// 2. 平移差 `target.position - current.position`
/// 3. 旋转差分解为单位轴 + `[0, π]` 内的角度
/// 4. 平移差分解为单位方向 + 非负距离
/// 5. 角度、距离分别钳位到 `±MAX_ANGLE`、`±MAX_DISTANCE`
/// 6. 轴 × 角度、方向 × 距离
///
/// # 示例
///
/// ```rust
/// use cartesian_core::frame::Frame;
/// use cartesian_core::motion_error::compute_motion_error;
///
/// let current = Frame::identity();
/// let target = Frame::from_translation(5.0, 0.0, 0.0);
///
/// // 距离 5 被钳位到 1，方向保持不变
/// let error = compute_motion_error(&current, &target);
/// assert_eq!(error.as_array(), [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
/// ```
pub fn compute_motion_error(current: &Frame, target: &Frame) -> MotionError {
    let rotation_delta = target.rotation * current.rotation.inverse();
    let translation_delta = target.position - current.position;

    let (axis, angle) = axis_angle(&rotation_delta);

    let (direction, distance) = direction_distance(&translation_delta);

    let angle = angle.clamp(-MAX_ANGLE, MAX_ANGLE);
    let distance = distance.clamp(-MAX_DISTANCE, MAX_DISTANCE);

    MotionError::from_parts(direction * distance, axis * angle)
}

/// 单位方向 + 非负距离；零向量（或非有限分量）返回零方向
///
/// 先按最大分量缩放再求模，分量超过 `sqrt(f64::MAX)` 时不会溢出为 `inf`。
fn direction_distance(delta: &Vector3<f64>) -> (Vector3<f64>, f64) {
    let scale = delta.amax();
    if !(scale.is_finite() && scale > 0.0) {
        return (Vector3::zeros(), 0.0);
    }
    let scaled = delta / scale;
    let norm = scaled.norm();
    (scaled / norm, norm * scale)
}

/// 单位轴 + `[0, π]` 内的角度；无旋转时返回零轴
///
/// 用 `atan2` 求角，单位旋转附近保持精度。
fn axis_angle(rotation: &UnitQuaternion<f64>) -> (Vector3<f64>, f64) {
    let q = rotation.quaternion();
    let (w, v) = if q.w < 0.0 {
        (-q.w, -q.imag())
    } else {
        (q.w, q.imag())
    };

    let sin_half = v.norm();
    if sin_half > 0.0 {
        (v / sin_half, 2.0 * sin_half.atan2(w))
    } else {
        (Vector3::zeros(), 0.0)
    }
}
