//! 目标位姿脚本
//!
//! ```toml
//! [start]
//! position = [0.3, 0.0, 0.4]
//!
//! [sim]
//! stiffness = 25.0
//! damping = 10.0
//!
//! [[target]]
//! at_ms = 500
//! position = [0.5, 0.1, 0.4]
//! orientation = [0.0, 0.0, 0.3826834, 0.9238795]
//!
//! [[target]]
//! at_ms = 1500
//! frame_id = "world"      # 参考坐标系不匹配，会被控制器拒绝
//! position = [9.0, 9.0, 9.0]
//! ```

use anyhow::{Context, Result};
use cartesian_core::config::PoseEntry;
use cartesian_core::frame::{CartesianPose, Frame, PoseStamped};
use cartesian_sim::SimParams;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 目标位姿脚本
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetScript {
    /// 仿真末端初始位姿（缺省为原点）
    pub start: Option<PoseEntry>,

    /// 仿真模型参数
    #[serde(default)]
    pub sim: SimParams,

    /// 按时间排列的目标位姿
    #[serde(default, rename = "target")]
    pub targets: Vec<ScriptedTarget>,
}

/// 脚本中的一个目标位姿
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedTarget {
    /// 相对运行开始的投递时间（毫秒）
    pub at_ms: u64,

    /// 参考坐标系（缺省为配置的基坐标系）
    pub frame_id: Option<String>,

    #[serde(default)]
    pub position: [f64; 3],

    #[serde(default = "identity_orientation")]
    pub orientation: [f64; 4],
}

fn identity_orientation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl ScriptedTarget {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }

    /// 转为带参考坐标系的位姿消息
    pub fn to_message(&self, base_frame: &str) -> PoseStamped {
        let frame = PoseEntry {
            position: self.position,
            orientation: self.orientation,
        }
        .to_frame();
        let frame_id = self.frame_id.as_deref().unwrap_or(base_frame);
        PoseStamped::new(frame_id, CartesianPose::from(frame))
    }
}

impl TargetScript {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut script: TargetScript = toml::from_str(content).context("Failed to parse target script")?;
        script.targets.sort_by_key(|t| t.at_ms);
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn start_frame(&self) -> Frame {
        self.start.as_ref().map(PoseEntry::to_frame).unwrap_or_default()
    }
}
