use crate::errors::{AdbError, AdbResult};
use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::Level;
use which::which;

#[cfg(windows)]
const ADB_EXECUTE_FILE_NAME: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_EXECUTE_FILE_NAME: &str = "adb";

pub const DROIDSYNC_ADB_PATH: &str = "DROIDSYNC_ADB_PATH";

/// 查找 adb 可执行文件, 优先使用环境变量 `DROIDSYNC_ADB_PATH`
pub fn adb_path() -> AdbResult<PathBuf> {
    if let Ok(path) = std::env::var(DROIDSYNC_ADB_PATH) {
        return Ok(PathBuf::from(path));
    }
    which(ADB_EXECUTE_FILE_NAME).map_err(|_| AdbError::unknown("adb not found"))
}

/// 执行 `adb start-server`
pub fn start_adb_server() -> AdbResult<()> {
    let path = adb_path()?;
    info!("Starting Adb Server With {:#?}", path);
    let output = Command::new(&path).arg("start-server").output()?;
    if !output.status.success() {
        return Err(AdbError::command_failed(
            "adb start-server",
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// 初始化日志输出, 重复调用不会报错
pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .try_init();
}

/// 以 `/` 拼接设备端路径
pub fn linux_path_combine(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    if dir.ends_with('/') {
        format!("{}{}", dir, name.trim_start_matches('/'))
    } else {
        format!("{}/{}", dir, name.trim_start_matches('/'))
    }
}

/// 本地路径的文件名部分
pub fn file_name(path: &Path) -> AdbResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            AdbError::invalid_path(path.to_string_lossy(), "path has no file name")
        })
}
