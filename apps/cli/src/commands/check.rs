//! check 命令
//!
//! 校验控制器配置文件

use anyhow::{Context, Result};
use cartesian_core::config::ControllerConfig;
use clap::Args;
use std::path::PathBuf;

/// 配置校验命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 控制器配置文件（TOML）
    #[arg(short, long)]
    pub config: PathBuf,

    /// 控制器命名空间（用于展开目标话题）
    #[arg(long, default_value = "/cartesian_motion_controller")]
    pub namespace: String,
}

impl CheckCommand {
    pub fn execute(&self) -> Result<()> {
        let resolved = ControllerConfig::load_from_file(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?
            .resolve()
            .context("Invalid controller configuration")?;

        println!("base_frame:        {}", resolved.base_frame);
        println!("target topic:      {}", resolved.target_topic_in(&self.namespace));
        println!("command modality:  {}", resolved.command_modality);
        println!("substeps / cycle:  {}", resolved.strategy.substeps());
        println!("flange -> tool:    {}", resolved.flange_to_tool);
        println!("tool -> stiffness: {}", resolved.tool_to_stiffness);
        Ok(())
    }
}
