use crate::beans::{parse_device_list, AdbDeviceInfo};
use crate::client::blocking::adb_device::AdbDevice;
use crate::connections::{AdbSocketConfig, SocketFactory, TcpSocketFactory};
use crate::errors::{AdbError, AdbResult};
use crate::protocols::blocking::AdbProtocol;
use log::info;
use std::sync::Arc;

/// adb server 的 host 服务: 设备列表与版本查询
pub struct AdbClient<F: SocketFactory> {
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

impl<F: SocketFactory> AdbClient<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// 获取 ADB 服务器的版本号。
    ///
    /// # 返回值
    /// 服务器返回的十六进制版本号解析后的数值。
    pub fn server_version(&self) -> AdbResult<u32> {
        let mut socket = self.factory.connect()?;
        socket.send_cmd_then_check_okay("host:version")?;
        let version = socket.read_string_block()?;
        u32::from_str_radix(version.trim(), 16)
            .map_err(|e| AdbError::parse_error(format!("server version {:?}: {}", version, e)))
    }

    pub fn list_device_infos(&self) -> AdbResult<Vec<AdbDeviceInfo>> {
        let mut socket = self.factory.connect()?;
        socket.send_cmd_then_check_okay("host:devices")?;
        let response = socket.read_string_block()?;
        let devices = parse_device_list(&response);
        info!("Found {} device(s)", devices.len());
        Ok(devices)
    }

    /// 列出所有设备, 包括不在线的设备
    pub fn list_devices(&self) -> AdbResult<Vec<AdbDevice<F>>> {
        Ok(self
            .list_device_infos()?
            .into_iter()
            .map(|info| AdbDevice::new(info, self.factory.clone()))
            .collect())
    }

    /// 按序列号查找设备, 不存在时返回 `DeviceNotFound`
    pub fn device(&self, serial: &str) -> AdbResult<AdbDevice<F>> {
        self.list_devices()?
            .into_iter()
            .find(|device| device.serial() == serial)
            .ok_or_else(|| AdbError::device_not_found(serial))
    }
}
