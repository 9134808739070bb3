//! 阻塞与异步 sync 实现共用的帧判断和传输参数

use crate::beans::{FileStatistics, FileStatisticsV2, SyncProgress};
use crate::errors::{AdbError, AdbResult};
use crate::protocols::sync_codec::{SyncCommand, MAX_CHUNK_SIZE};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

const ENOENT: u32 = 2;

/// push / pull 的可选参数: 进度回调、取消标记、总大小
#[derive(Default)]
pub struct TransferOptions<'a> {
    progress: Option<Box<dyn FnMut(SyncProgress) + Send + 'a>>,
    cancel: Option<&'a AtomicBool>,
    total_bytes: Option<u64>,
}

impl<'a> TransferOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每个数据块传输完成后同步调用
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(SyncProgress) + Send + 'a,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// 在帧之间检查, 置为 true 后停止传输并返回 `Cancelled`
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_total_bytes(mut self, total_bytes: u64) -> Self {
        self.total_bytes = Some(total_bytes);
        self
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub(crate) fn set_total_if_unknown(&mut self, total_bytes: u64) {
        if self.total_bytes.is_none() {
            self.total_bytes = Some(total_bytes);
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// 总大小未知时 total_bytes 为0, 只报告累计字节数
    pub(crate) fn report(&mut self, transferred: u64) {
        let total = self.total_bytes.unwrap_or(0);
        if let Some(progress) = self.progress.as_mut() {
            progress(SyncProgress::new(transferred, total));
        }
    }
}

pub(crate) fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}

pub(crate) fn unexpected_command(command: SyncCommand, expected: &str) -> AdbError {
    AdbError::protocol_error(format!("expected {}, got {}", expected, command))
}

pub(crate) fn check_chunk_length(length: u32, max_chunk_size: usize) -> AdbResult<usize> {
    let length = length as usize;
    if length > max_chunk_size {
        return Err(AdbError::protocol_error(format!(
            "DATA chunk of {} bytes exceeds limit of {}",
            length, max_chunk_size
        )));
    }
    Ok(length)
}

pub(crate) fn clamp_chunk_size(size: usize) -> usize {
    size.clamp(1, MAX_CHUNK_SIZE)
}

/// 全零记录表示文件不存在
pub(crate) fn stat_result(stat: FileStatistics) -> AdbResult<FileStatistics> {
    if stat.is_empty() && !stat.path.is_empty() {
        crate::adb_bail!(AdbError::file_not_found(stat.path));
    }
    Ok(stat)
}

pub(crate) fn stat_v2_result(stat: FileStatisticsV2) -> AdbResult<FileStatisticsV2> {
    match stat.error {
        0 => Ok(stat),
        ENOENT => Err(AdbError::file_not_found(stat.path)),
        errno => Err(AdbError::sync_failed(
            stat.path,
            format!("stat failed with errno {}", errno),
        )),
    }
}

/// 本地文件修改时间, 秒
pub(crate) fn modified_seconds(modified: std::io::Result<SystemTime>) -> u32 {
    modified
        .map(|time| DateTime::<Utc>::from(time).timestamp().max(0) as u32)
        .unwrap_or(0)
}
