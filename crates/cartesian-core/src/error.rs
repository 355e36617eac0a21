//! 控制核心错误类型定义

use crate::hardware::CommandModality;
use thiserror::Error;

/// 外部协作者（求解器、硬件接口）返回的错误
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 缺少必需参数
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// 参数值无效
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// 配置的命令模态与硬件接口不一致
    #[error("Command modality mismatch: configured {configured}, hardware interface provides {actual}")]
    ModalityMismatch {
        configured: CommandModality,
        actual: CommandModality,
    },

    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 控制周期错误
///
/// 求解器和硬件故障不会在核心内部重试或屏蔽，原样向上传播给调用方的监督逻辑。
#[derive(Error, Debug)]
pub enum ControlError {
    /// 控制器未激活
    #[error("Controller is not active")]
    NotActive,

    /// 控制器已激活
    #[error("Controller is already active")]
    AlreadyActive,

    /// 正运动学/正动力学求解器故障
    #[error("Forward dynamics solver failed: {source}")]
    Solver {
        #[source]
        source: BoxedError,
    },

    /// 硬件命令接口故障
    #[error("Hardware command interface failed: {source}")]
    Hardware {
        #[source]
        source: BoxedError,
    },

    /// 命令向量长度与关节数不一致
    #[error("Joint command length mismatch: expected {expected}, got {actual}")]
    CommandLength { expected: usize, actual: usize },
}

impl ControlError {
    pub(crate) fn solver<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ControlError::Solver {
            source: Box::new(source),
        }
    }

    pub(crate) fn hardware<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ControlError::Hardware {
            source: Box::new(source),
        }
    }

    /// 是否为外部协作者故障（求解器或硬件）
    pub fn is_collaborator_fault(&self) -> bool {
        matches!(self, ControlError::Solver { .. } | ControlError::Hardware { .. })
    }
}
