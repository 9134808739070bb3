use crate::beans::command::AdbCommand;
use crate::beans::{AdbDeviceInfo, DeviceState, FileStatistics};
use crate::client::blocking::package_manager::PackageManager;
use crate::client::blocking::sync_service::SyncService;
use crate::client::install_logic;
use crate::client::transfer::TransferOptions;
use crate::connections::SocketFactory;
use crate::errors::{AdbError, AdbResult};
use crate::protocols::blocking::AdbProtocol;
use crate::protocols::protocol_logic;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// 一个由 adb server 管理的设备。
///
/// 每个操作都通过 `factory` 获取自己的连接, 用完即丢弃, 因此 `AdbDevice`
/// 只需要 `&self`。
pub struct AdbDevice<F: SocketFactory> {
    pub info: AdbDeviceInfo,
    factory: Arc<F>,
}

impl<F: SocketFactory> AdbDevice<F> {
    pub fn new(info: AdbDeviceInfo, factory: Arc<F>) -> Self {
        Self { info, factory }
    }

    pub fn serial(&self) -> &str {
        &self.info.serial
    }

    pub fn state(&self) -> &DeviceState {
        &self.info.state
    }

    /// 设备不在线时在任何网络IO之前返回 `DeviceOffline`
    pub fn ensure_online(&self) -> AdbResult<()> {
        if !self.info.is_online() {
            warn!("Device {} is not online ({})", self.serial(), self.state());
            return Err(AdbError::device_offline(
                self.serial(),
                self.state().to_string(),
            ));
        }
        Ok(())
    }

    /// 打开一个已切换到本设备的连接。
    ///
    /// # 返回值
    /// 完成 `host:transport:<serial>` 握手的socket。
    pub fn open_transport(&self) -> AdbResult<F::Socket> {
        self.ensure_online()?;
        let mut socket = self.factory.connect()?;
        socket.set_device(self.serial())?;
        Ok(socket)
    }

    /// 执行 shell 命令, 返回尚未读取输出的连接
    pub fn shell_stream<'a, T: Into<AdbCommand<'a>>>(&self, command: T) -> AdbResult<F::Socket> {
        let command = command.into().get_command();
        let mut socket = self.open_transport()?;
        socket.send_cmd_then_check_okay(&protocol_logic::shell_command(&command))?;
        Ok(socket)
    }

    /// 在设备上执行Shell命令，并返回命令的全部输出。
    ///
    /// # 参数
    /// - `command`: 完整命令字符串或参数列表。
    pub fn shell<'a, T: Into<AdbCommand<'a>>>(&self, command: T) -> AdbResult<String> {
        let mut socket = self.shell_stream(command)?;
        socket.read_until_close()
    }

    pub fn shell_trim<'a, T: Into<AdbCommand<'a>>>(&self, command: T) -> AdbResult<String> {
        Ok(self.shell(command)?.trim().to_string())
    }

    /// 删除设备上的文件, `rm` 有输出即视为失败
    pub fn remove(&self, path: &str) -> AdbResult<()> {
        let command = install_logic::remove_command(path);
        info!("Removing {:#?} on {}", path, self.serial());
        let output = self.shell_trim(&command)?;
        if !output.is_empty() {
            return Err(AdbError::command_failed(command, output));
        }
        Ok(())
    }

    pub fn sync(&self) -> SyncService<'_, F> {
        SyncService::new(self)
    }

    pub fn package_manager(&self) -> PackageManager<'_, F> {
        PackageManager::new(self)
    }

    pub fn stat(&self, path: &str) -> AdbResult<FileStatistics> {
        self.sync().stat(path)
    }

    pub fn exists(&self, path: &str) -> AdbResult<bool> {
        self.sync().exists(path)
    }

    pub fn list(&self, path: &str) -> AdbResult<Vec<FileStatistics>> {
        self.sync().list(path)
    }

    pub fn read_text(&self, path: &str) -> AdbResult<String> {
        self.sync().read_text(path)
    }

    /// 以默认权限 0o666 上传本地文件
    pub fn push<P: AsRef<Path>>(&self, local: P, remote: &str) -> AdbResult<u64> {
        self.sync().push_file(local, remote, TransferOptions::new())
    }

    pub fn pull<P: AsRef<Path>>(&self, remote: &str, local: P) -> AdbResult<u64> {
        self.sync().pull_file(remote, local, TransferOptions::new())
    }
}
