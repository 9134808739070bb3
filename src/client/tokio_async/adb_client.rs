use crate::beans::{parse_device_list, AdbDeviceInfo};
use crate::client::tokio_async::adb_device::AdbDevice;
use crate::connections::{AdbSocketConfig, AsyncSocketFactory, TcpSocketFactory};
use crate::errors::{AdbError, AdbResult};
use crate::protocols::tokio_async::AdbProtocol;
use log::info;
use std::sync::Arc;

pub struct AdbClient<F: AsyncSocketFactory> {
    factory: Arc<F>,
}

impl AdbClient<TcpSocketFactory> {
    pub fn from_config(config: AdbSocketConfig) -> Self {
        Self::new(TcpSocketFactory::new(config))
    }
}

impl Default for AdbClient<TcpSocketFactory> {
    fn default() -> Self {
        Self::from_config(AdbSocketConfig::from_env())
    }
}

impl<F: AsyncSocketFactory> AdbClient<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// 获取 ADB 服务器的版本号。
    pub async fn server_version(&self) -> AdbResult<u32> {
        let mut socket = self.factory.connect_async().await?;
        socket.send_cmd_then_check_okay("host:version").await?;
        let version = socket.read_string_block().await?;
        u32::from_str_radix(version.trim(), 16)
            .map_err(|e| AdbError::parse_error(format!("server version {:?}: {}", version, e)))
    }

    pub async fn list_device_infos(&self) -> AdbResult<Vec<AdbDeviceInfo>> {
        let mut socket = self.factory.connect_async().await?;
        socket.send_cmd_then_check_okay("host:devices").await?;
        let response = socket.read_string_block().await?;
        let devices = parse_device_list(&response);
        info!("Found {} device(s)", devices.len());
        Ok(devices)
    }

    pub async fn list_devices(&self) -> AdbResult<Vec<AdbDevice<F>>> {
        Ok(self
            .list_device_infos()
            .await?
            .into_iter()
            .map(|info| AdbDevice::new(info, self.factory.clone()))
            .collect())
    }

    /// 按序列号查找设备
    ///
    /// # 参数
    /// - `serial`: 设备序列号。
    ///
    /// # 返回值
    /// 找不到时返回 `DeviceNotFound`。
    pub async fn device(&self, serial: &str) -> AdbResult<AdbDevice<F>> {
        self.list_devices()
            .await?
            .into_iter()
            .find(|device| device.serial() == serial)
            .ok_or_else(|| AdbError::device_not_found(serial))
    }
}
