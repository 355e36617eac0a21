//! 控制器配置
//!
//! 从 TOML 加载，`resolve()` 之后得到校验过、已填默认值的 [`ResolvedConfig`]。
//!
//! ```toml
//! base_frame = "base_link"
//! target_frame_topic = "robot_goal"   # 可选
//! command_modality = "position"
//! iterations = 10                     # position / effort 必需
//!
//! [telemetry.flange_to_tool]
//! position = [0.0, 0.0, 0.1034]
//! orientation = [0.0, 0.0, -0.3826834, 0.9238795]   # x, y, z, w
//! ```
//!
//! 缺少可选参数时使用文档中的默认值，并在解析时输出一次警告。

use crate::error::ConfigError;
use crate::frame::{Frame, Quaternion};
use crate::hardware::CommandModality;
use crate::integrator::IntegrationStrategy;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认目标位姿话题
pub const DEFAULT_TARGET_FRAME_TOPIC: &str = "robot_goal";

/// 控制器配置（原始形式，字段可能缺失）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// 基坐标系标识（必需）
    pub base_frame: Option<String>,

    /// 目标位姿话题（可选，默认 `robot_goal`）
    pub target_frame_topic: Option<String>,

    /// 硬件命令模态（必需）
    pub command_modality: Option<CommandModality>,

    /// 迭代模式下每个外层周期的子步数（位置 / 力矩模态必需）
    pub iterations: Option<u32>,

    /// 遥测配置
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// 遥测辅助变换配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// 工具坐标系在法兰坐标系中的位姿
    pub flange_to_tool: Option<PoseEntry>,

    /// 刚度坐标系在工具坐标系中的位姿
    pub tool_to_stiffness: Option<PoseEntry>,
}

/// 配置文件中的位姿条目
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseEntry {
    /// 位置 `[x, y, z]`
    #[serde(default)]
    pub position: [f64; 3],

    /// 姿态四元数 `[x, y, z, w]`
    #[serde(default = "PoseEntry::identity_orientation")]
    pub orientation: [f64; 4],
}

impl PoseEntry {
    fn identity_orientation() -> [f64; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }

    pub fn to_frame(&self) -> Frame {
        let [x, y, z] = self.position;
        let [qx, qy, qz, qw] = self.orientation;
        Frame::new(Vector3::new(x, y, z), Quaternion::new(qx, qy, qz, qw).to_unit())
    }
}

impl ControllerConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验并填充默认值
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let base_frame = self
            .base_frame
            .as_deref()
            .map(str::trim)
            .ok_or(ConfigError::MissingParameter("base_frame"))?;
        if base_frame.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "base_frame",
                reason: "must not be empty".to_string(),
            });
        }

        let command_modality =
            self.command_modality.ok_or(ConfigError::MissingParameter("command_modality"))?;
        let strategy = IntegrationStrategy::for_modality(command_modality, self.iterations)?;

        let target_frame_topic = match self.target_frame_topic.as_deref().map(str::trim) {
            Some(topic) if !topic.is_empty() => topic.to_string(),
            _ => {
                tracing::warn!(
                    "Missing `target_frame_topic`, will default to: {}",
                    DEFAULT_TARGET_FRAME_TOPIC
                );
                DEFAULT_TARGET_FRAME_TOPIC.to_string()
            },
        };

        let flange_to_tool = resolve_aux_transform("flange_to_tool", &self.telemetry.flange_to_tool);
        let tool_to_stiffness =
            resolve_aux_transform("tool_to_stiffness", &self.telemetry.tool_to_stiffness);

        Ok(ResolvedConfig {
            base_frame: base_frame.to_string(),
            target_frame_topic,
            command_modality,
            strategy,
            flange_to_tool,
            tool_to_stiffness,
        })
    }
}

fn resolve_aux_transform(name: &str, entry: &Option<PoseEntry>) -> Frame {
    match entry {
        Some(entry) => entry.to_frame(),
        None => {
            tracing::warn!("Missing `telemetry.{}`, will report identity transform", name);
            Frame::identity()
        },
    }
}

/// 校验后的配置
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub base_frame: String,
    pub target_frame_topic: String,
    pub command_modality: CommandModality,
    pub strategy: IntegrationStrategy,
    /// 工具坐标系在法兰坐标系中的位姿（遥测 `F_T_EE`）
    pub flange_to_tool: Frame,
    /// 刚度坐标系在工具坐标系中的位姿（遥测 `EE_T_K`）
    pub tool_to_stiffness: Frame,
}

impl ResolvedConfig {
    /// 最小配置：其余参数取默认值，不输出警告
    pub fn new(
        base_frame: impl Into<String>,
        command_modality: CommandModality,
        strategy: IntegrationStrategy,
    ) -> Self {
        Self {
            base_frame: base_frame.into(),
            target_frame_topic: DEFAULT_TARGET_FRAME_TOPIC.to_string(),
            command_modality,
            strategy,
            flange_to_tool: Frame::identity(),
            tool_to_stiffness: Frame::identity(),
        }
    }

    /// 目标话题在控制器命名空间下的完整名称
    ///
    /// 只取命名空间的第一段：`/arm/cartesian_motion_controller` + `robot_goal`
    /// 得到 `/arm/robot_goal`。
    pub fn target_topic_in(&self, namespace: &str) -> String {
        let root = match namespace.get(2..).and_then(|rest| rest.find('/')) {
            Some(idx) => &namespace[..idx + 2],
            None => namespace,
        };
        format!("{}/{}", root.trim_end_matches('/'), self.target_frame_topic)
    }
}
