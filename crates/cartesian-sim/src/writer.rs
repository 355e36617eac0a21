//! 记录型硬件命令接口

use cartesian_core::hardware::{CommandModality, HardwareCommandWriter};
use std::collections::VecDeque;
use thiserror::Error;

/// 默认保留的历史命令条数
pub const DEFAULT_HISTORY: usize = 1024;

/// 记录型硬件接口错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterError {
    /// 接口已断开（用于模拟硬件故障）
    #[error("Hardware interface disconnected")]
    Disconnected,
}

/// 记录每周期关节命令的硬件接口
///
/// 只保留最近 `history_limit` 条命令，长时间运行时内存有界。
#[derive(Debug, Clone)]
pub struct RecordingWriter {
    modality: CommandModality,
    joint_count: usize,
    history: VecDeque<Vec<f64>>,
    history_limit: usize,
    total_writes: u64,
    connected: bool,
}

impl RecordingWriter {
    pub fn new(modality: CommandModality, joint_count: usize) -> Self {
        Self::with_history_limit(modality, joint_count, DEFAULT_HISTORY)
    }

    pub fn with_history_limit(
        modality: CommandModality,
        joint_count: usize,
        history_limit: usize,
    ) -> Self {
        RecordingWriter {
            modality,
            joint_count,
            history: VecDeque::with_capacity(history_limit.min(DEFAULT_HISTORY)),
            history_limit,
            total_writes: 0,
            connected: true,
        }
    }

    /// 最近一次写入的命令
    pub fn last(&self) -> Option<&[f64]> {
        self.history.back().map(Vec::as_slice)
    }

    /// 保留的历史命令（旧 -> 新）
    pub fn history(&self) -> impl Iterator<Item = &[f64]> {
        self.history.iter().map(Vec::as_slice)
    }

    /// 累计写入次数（不受历史上限影响）
    pub fn total_writes(&self) -> u64 {
        self.total_writes
    }

    /// 断开接口，之后的写入返回 [`WriterError::Disconnected`]
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn reconnect(&mut self) {
        self.connected = true;
    }
}

impl HardwareCommandWriter for RecordingWriter {
    type Error = WriterError;

    fn modality(&self) -> CommandModality {
        self.modality
    }

    fn joint_count(&self) -> usize {
        self.joint_count
    }

    fn write_commands(&mut self, commands: &[f64]) -> Result<(), WriterError> {
        if !self.connected {
            return Err(WriterError::Disconnected);
        }
        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(commands.to_vec());
        }
        self.total_writes += 1;
        Ok(())
    }
}
