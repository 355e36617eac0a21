//! 笛卡尔位姿类型
//!
//! - [`Frame`]: 控制核心内部使用的刚体位姿（位置 + 旋转），基于 `nalgebra`
//! - [`CartesianPose`] / [`PoseStamped`]: 外部位姿消息（四元数按 `x, y, z, w` 排列）
//!
//! # 示例
//!
//! ```rust
//! use cartesian_core::frame::{CartesianPose, Frame, PoseStamped, Position3D, Quaternion};
//!
//! let msg = PoseStamped::new(
//!     "base_link",
//!     CartesianPose::new(Position3D::new(0.4, 0.0, 0.3), Quaternion::IDENTITY),
//! );
//! let frame = Frame::from(msg.pose);
//! assert_eq!(frame.position.x, 0.4);
//! ```

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 四元数归一化阈值（避免除零）
///
/// 当四元数的模平方小于此值时，转换会返回单位旋转。
const QUATERNION_NORM_THRESHOLD: f64 = 1e-10;

/// 刚体位姿（位置 + 旋转），表达在基坐标系中
///
/// 控制循环中有两个实例：
/// - 当前位姿：每个周期从求解器重新读取，不跨周期保存
/// - 目标位姿：由 [`TargetPoseBuffer`](crate::target::TargetPoseBuffer) 持有，整体替换
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// 位置
    pub position: Vector3<f64>,
    /// 旋转
    pub rotation: UnitQuaternion<f64>,
}

impl Frame {
    /// 原点，无旋转
    pub fn identity() -> Self {
        Frame {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Frame { position, rotation }
    }

    /// 仅平移（单位旋转）
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Frame {
            position: Vector3::new(x, y, z),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// 从位置和 RPY 欧拉角（弧度）创建
    pub fn from_position_rpy(position: Vector3<f64>, roll: f64, pitch: f64, yaw: f64) -> Self {
        Frame {
            position,
            rotation: UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// 位姿组合 `self * other`
    pub fn compose(&self, other: &Frame) -> Frame {
        Frame {
            position: self.position + self.rotation * other.position,
            rotation: self.rotation * other.rotation,
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.rotation)
    }

    /// 4x4 齐次变换矩阵
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        self.to_isometry().to_homogeneous()
    }

    /// 所有分量都是有限值
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::identity()
    }
}

impl From<Isometry3<f64>> for Frame {
    fn from(isometry: Isometry3<f64>) -> Self {
        Frame {
            position: isometry.translation.vector,
            rotation: isometry.rotation,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.rotation.quaternion();
        write!(
            f,
            "Frame(pos: ({:.3}, {:.3}, {:.3}), quat: ({:.3}, {:.3}, {:.3}, {:.3}))",
            self.position.x, self.position.y, self.position.z, q.i, q.j, q.k, q.w
        )
    }
}

/// 三维位置（消息格式）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position3D { x, y, z }
    }

    pub const ZERO: Self = Position3D::new(0.0, 0.0, 0.0);
}

/// 四元数（消息格式，`x, y, z, w`）
///
/// 消息中的四元数不保证归一化，转换为 [`Frame`] 时才归一化。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// 单位四元数（无旋转）
    pub const IDENTITY: Self = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    /// 归一化；模平方小于 1e-10 或非有限时返回 `None`
    pub fn try_to_unit(&self) -> Option<UnitQuaternion<f64>> {
        let norm_sq = self.norm_squared();
        if !norm_sq.is_finite() || norm_sq < QUATERNION_NORM_THRESHOLD {
            return None;
        }
        Some(UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
            self.w, self.x, self.y, self.z,
        )))
    }

    /// 转换为单位四元数
    ///
    /// # 数值稳定性
    ///
    /// 模平方小于 1e-10（或含 NaN）时返回单位旋转并记录警告，避免 NaN 进入控制循环。
    /// 需要区分退化输入时用 [`try_to_unit`](Self::try_to_unit)。
    pub fn to_unit(&self) -> UnitQuaternion<f64> {
        self.try_to_unit().unwrap_or_else(|| {
            tracing::warn!(
                "Degenerate quaternion in pose message (norm²={:.2e}): ({:.3}, {:.3}, {:.3}, {:.3}), using identity",
                self.norm_squared(),
                self.x,
                self.y,
                self.z,
                self.w
            );
            UnitQuaternion::identity()
        })
    }

    fn norm_squared(&self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

impl From<UnitQuaternion<f64>> for Quaternion {
    fn from(q: UnitQuaternion<f64>) -> Self {
        Quaternion::new(q.i, q.j, q.k, q.w)
    }
}

/// 笛卡尔位姿消息（位置 + 姿态）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CartesianPose {
    pub position: Position3D,
    pub orientation: Quaternion,
}

impl CartesianPose {
    pub fn new(position: Position3D, orientation: Quaternion) -> Self {
        CartesianPose {
            position,
            orientation,
        }
    }

    /// 严格转换：位置非有限或姿态退化时返回 `None`，不回退到单位旋转
    pub fn try_to_frame(&self) -> Option<Frame> {
        let position = Vector3::new(self.position.x, self.position.y, self.position.z);
        if !position.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Frame {
            position,
            rotation: self.orientation.try_to_unit()?,
        })
    }
}

impl From<CartesianPose> for Frame {
    fn from(pose: CartesianPose) -> Self {
        Frame {
            position: Vector3::new(pose.position.x, pose.position.y, pose.position.z),
            rotation: pose.orientation.to_unit(),
        }
    }
}

impl From<Frame> for CartesianPose {
    fn from(frame: Frame) -> Self {
        CartesianPose {
            position: Position3D::new(frame.position.x, frame.position.y, frame.position.z),
            orientation: frame.rotation.into(),
        }
    }
}

/// 带参考坐标系的位姿消息
///
/// 目标位姿只有在 `frame_id` 与配置的基坐标系一致时才会被接受。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    /// 参考坐标系标识
    pub frame_id: String,
    pub pose: CartesianPose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: CartesianPose) -> Self {
        PoseStamped {
            frame_id: frame_id.into(),
            pose,
        }
    }
}
