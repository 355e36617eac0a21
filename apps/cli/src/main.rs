//! # Cartesian CLI
//!
//! 在仿真机械臂上运行笛卡尔运动控制器。
//!
//! ```bash
//! # 校验控制器配置
//! cartesian-cli check --config demos/controller.toml
//!
//! # 以 500Hz 运行 2000 个周期，按脚本投递目标位姿，遥测以 JSON Lines 输出到 stdout
//! cartesian-cli run --config demos/controller.toml --script demos/targets.toml \
//!     --rate 500 --cycles 2000
//! ```
//!
//! 日志输出到 stderr，级别由 `RUST_LOG` 控制。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod runner;
mod script;

use commands::{CheckCommand, RunCommand};

/// Cartesian CLI - 笛卡尔运动控制命令行工具
#[derive(Parser, Debug)]
#[command(name = "cartesian-cli")]
#[command(about = "Run the Cartesian motion controller against a simulated arm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 校验控制器配置并打印解析结果
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },

    /// 运行控制循环
    Run {
        #[command(flatten)]
        args: RunCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（stdout 留给遥测）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cartesian_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { args } => args.execute(),
        Commands::Run { args } => args.execute(),
    }
}
