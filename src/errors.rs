use std::fmt;
use thiserror::Error;

/// ADB操作中可能出现的错误类型
#[derive(Error, Debug)]
pub enum AdbError {
    /// 连接相关错误
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// 设备未找到错误
    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    /// 设备不在线, 在任何网络IO之前抛出
    #[error("Device is offline: {serial} (state: {state})")]
    DeviceOffline { serial: String, state: String },

    /// 命令执行失败
    #[error("Command execution failed: {command}, reason: {reason}")]
    CommandFailed { command: String, reason: String },

    /// 协议错误, 当前socket必须丢弃
    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    /// 未知的同步命令
    #[error("Unknown sync command: {command:?}")]
    UnknownSyncCommand { command: String },

    /// 设备通过FAIL帧返回的同步错误
    #[error("Sync failed on {path}: {message}")]
    SyncFailed { path: String, message: String },

    /// 远程文件不存在
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// 非法的远程路径
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// 安装/卸载失败, 携带设备返回的原始信息
    #[error("Package installation failed: {message}")]
    PackageInstallation { message: String },

    /// 操作被取消
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// 解析错误
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// 主操作失败后, 临时文件清理也失败
    #[error("{source}; cleanup also failed: {cleanup}")]
    CleanupFailed {
        source: Box<AdbError>,
        cleanup: Box<AdbError>,
    },

    /// IO错误的包装
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 其他未分类错误
    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

/// 专门用于结果类型的别名
pub type AdbResult<T> = Result<T, AdbError>;

impl AdbError {
    /// 从任何实现了Display的错误创建
    pub fn from_display<E: fmt::Display>(err: E) -> Self {
        AdbError::Unknown {
            message: err.to_string(),
        }
    }

    /// 创建连接失败错误
    pub fn connection_failed<S: Into<String>>(message: S) -> Self {
        AdbError::ConnectionFailed {
            message: message.into(),
        }
    }

    /// 创建设备未找到错误
    pub fn device_not_found<S: Into<String>>(serial: S) -> Self {
        AdbError::DeviceNotFound {
            serial: serial.into(),
        }
    }

    /// 创建设备离线错误
    pub fn device_offline<S1: Into<String>, S2: Into<String>>(serial: S1, state: S2) -> Self {
        AdbError::DeviceOffline {
            serial: serial.into(),
            state: state.into(),
        }
    }

    /// 创建命令执行失败错误
    pub fn command_failed<S1: Into<String>, S2: Into<String>>(command: S1, reason: S2) -> Self {
        AdbError::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// 创建协议错误
    pub fn protocol_error<S: Into<String>>(message: S) -> Self {
        AdbError::ProtocolError {
            message: message.into(),
        }
    }

    pub fn unknown_sync_command(raw: &[u8]) -> Self {
        AdbError::UnknownSyncCommand {
            command: String::from_utf8_lossy(raw).to_string(),
        }
    }

    /// 创建同步失败错误
    pub fn sync_failed<S1: Into<String>, S2: Into<String>>(path: S1, message: S2) -> Self {
        AdbError::SyncFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found<S: Into<String>>(path: S) -> Self {
        AdbError::FileNotFound { path: path.into() }
    }

    pub fn invalid_path<S1: Into<String>, S2: Into<String>>(path: S1, reason: S2) -> Self {
        AdbError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 创建安装失败错误
    pub fn package_installation<S: Into<String>>(message: S) -> Self {
        AdbError::PackageInstallation {
            message: message.into(),
        }
    }

    /// 批量操作完成数量与预期不符
    ///
    /// # 参数
    /// - `operation`: 批量操作的名称, 例如 `upload`、`cleanup`。
    /// - `expected`: 计划完成的数量。
    /// - `actual`: 实际完成的数量。
    pub fn batch_incomplete(operation: &str, expected: usize, actual: usize) -> Self {
        AdbError::PackageInstallation {
            message: format!(
                "{} incomplete: expected {} packages, completed {}",
                operation, expected, actual
            ),
        }
    }

    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        AdbError::Cancelled {
            operation: operation.into(),
        }
    }

    /// 创建解析错误
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        AdbError::ParseError {
            message: message.into(),
        }
    }

    /// 创建未知错误
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        AdbError::Unknown {
            message: message.into(),
        }
    }

    /// 将清理阶段的错误与主错误合并
    pub fn with_cleanup(self, cleanup: AdbError) -> Self {
        AdbError::CleanupFailed {
            source: Box::new(self),
            cleanup: Box::new(cleanup),
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdbError::ConnectionFailed { .. } | AdbError::Io(_)
        )
    }

    /// 检查是否为致命错误（不应重试）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdbError::DeviceNotFound { .. }
                | AdbError::DeviceOffline { .. }
                | AdbError::ProtocolError { .. }
                | AdbError::UnknownSyncCommand { .. }
                | AdbError::ParseError { .. }
        )
    }

    /// 获取错误的简短描述
    pub fn error_code(&self) -> &'static str {
        match self {
            AdbError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            AdbError::DeviceNotFound { .. } => "DEVICE_NOT_FOUND",
            AdbError::DeviceOffline { .. } => "DEVICE_OFFLINE",
            AdbError::CommandFailed { .. } => "COMMAND_FAILED",
            AdbError::ProtocolError { .. } => "PROTOCOL_ERROR",
            AdbError::UnknownSyncCommand { .. } => "UNKNOWN_SYNC_COMMAND",
            AdbError::SyncFailed { .. } => "SYNC_FAILED",
            AdbError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AdbError::InvalidPath { .. } => "INVALID_PATH",
            AdbError::PackageInstallation { .. } => "PACKAGE_INSTALLATION",
            AdbError::Cancelled { .. } => "CANCELLED",
            AdbError::ParseError { .. } => "PARSE_ERROR",
            AdbError::CleanupFailed { .. } => "CLEANUP_FAILED",
            AdbError::Io(_) => "IO_ERROR",
            AdbError::Unknown { .. } => "UNKNOWN_ERROR",
        }
    }
}

/// 扩展Result类型，添加ADB特定的便利方法
pub trait AdbResultExt<T> {
    /// 添加上下文信息
    fn with_adb_context<F>(self, f: F) -> AdbResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> AdbResultExt<T> for Result<T, std::io::Error> {
    fn with_adb_context<F>(self, f: F) -> AdbResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AdbError::Io(std::io::Error::new(e.kind(), format!("{}: {}", f(), e))))
    }
}

/// 用于链式错误处理的宏
#[macro_export]
macro_rules! adb_bail {
    ($err:expr) => {
        return Err($err.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::AdbError::unknown(format!($fmt, $($arg)*)))
    };
}

/// 用于确保条件的宏
#[macro_export]
macro_rules! adb_ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::errors::AdbError::unknown(format!($fmt, $($arg)*)));
        }
    };
}
