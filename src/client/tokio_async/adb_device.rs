use crate::beans::command::AdbCommand;
use crate::beans::{AdbDeviceInfo, DeviceState, FileStatistics};
use crate::client::install_logic;
use crate::client::tokio_async::package_manager::PackageManager;
use crate::client::tokio_async::sync_service::SyncService;
use crate::client::transfer::TransferOptions;
use crate::connections::AsyncSocketFactory;
use crate::errors::{AdbError, AdbResult};
use crate::protocols::protocol_logic;
use crate::protocols::tokio_async::AdbProtocol;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// 异步版本的设备句柄, 每个操作使用独立连接
pub struct AdbDevice<F: AsyncSocketFactory> {
    pub info: AdbDeviceInfo,
    factory: Arc<F>,
}

impl<F: AsyncSocketFactory> AdbDevice<F> {
    pub fn new(info: AdbDeviceInfo, factory: Arc<F>) -> Self {
        Self { info, factory }
    }

    pub fn serial(&self) -> &str {
        &self.info.serial
    }

    pub fn state(&self) -> &DeviceState {
        &self.info.state
    }

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

    pub async fn open_transport(&self) -> AdbResult<F::Socket> {
        self.ensure_online()?;
        let mut socket = self.factory.connect_async().await?;
        socket.set_device(self.serial()).await?;
        Ok(socket)
    }

    pub async fn shell_stream<'a, T: Into<AdbCommand<'a>>>(
        &self,
        command: T,
    ) -> AdbResult<F::Socket> {
        let command = command.into().get_command();
        let mut socket = self.open_transport().await?;
        socket
            .send_cmd_then_check_okay(&protocol_logic::shell_command(&command))
            .await?;
        Ok(socket)
    }

    /// 在设备上执行Shell命令，并返回命令的全部输出。
    pub async fn shell<'a, T: Into<AdbCommand<'a>>>(&self, command: T) -> AdbResult<String> {
        let mut socket = self.shell_stream(command).await?;
        socket.read_until_close().await
    }

    pub async fn shell_trim<'a, T: Into<AdbCommand<'a>>>(&self, command: T) -> AdbResult<String> {
        Ok(self.shell(command).await?.trim().to_string())
    }

    pub async fn remove(&self, path: &str) -> AdbResult<()> {
        let command = install_logic::remove_command(path);
        info!("Removing {:#?} on {}", path, self.serial());
        let output = self.shell_trim(&command).await?;
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

    pub async fn stat(&self, path: &str) -> AdbResult<FileStatistics> {
        self.sync().stat(path).await
    }

    pub async fn exists(&self, path: &str) -> AdbResult<bool> {
        self.sync().exists(path).await
    }

    pub async fn list(&self, path: &str) -> AdbResult<Vec<FileStatistics>> {
        self.sync().list(path).await
    }

    pub async fn read_text(&self, path: &str) -> AdbResult<String> {
        self.sync().read_text(path).await
    }

    pub async fn push<P: AsRef<Path>>(&self, local: P, remote: &str) -> AdbResult<u64> {
        self.sync()
            .push_file(local, remote, TransferOptions::new())
            .await
    }

    pub async fn pull<P: AsRef<Path>>(&self, remote: &str, local: P) -> AdbResult<u64> {
        self.sync()
            .pull_file(remote, local, TransferOptions::new())
            .await
    }
}
