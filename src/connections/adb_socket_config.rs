use crate::errors::{AdbError, AdbResult};
use log::warn;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

const DEFAULT_ADB_PORT: u16 = 5037;
const DEFAULT_ADB_TIMEOUT: u64 = 3;

const DEFAULT_ADB_HOST: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub const ADB_SERVER_ADDRESS_ENV: &str = "ANDROID_ADB_SERVER_ADDRESS";
pub const ADB_SERVER_PORT_ENV: &str = "ANDROID_ADB_SERVER_PORT";

///
/// Adb Socket相关配置
/// addr: adb server 地址, 默认值 127.0.0.1:5037
/// timeout: socket 读写超时(秒), 默认值 3
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdbSocketConfig {
    pub addr: SocketAddr,
    pub timeout: u64,
}

impl Default for AdbSocketConfig {
    fn default() -> Self {
        AdbSocketConfig {
            addr: SocketAddr::new(IpAddr::V4(DEFAULT_ADB_HOST), DEFAULT_ADB_PORT),
            timeout: DEFAULT_ADB_TIMEOUT,
        }
    }
}

impl AdbSocketConfig {
    /// 创建配置, timeout 为 `None` 时使用默认超时
    pub fn new<T: Into<SocketAddr>>(socket_addr: T, timeout: Option<u64>) -> Self {
        Self {
            addr: socket_addr.into(),
            timeout: timeout.unwrap_or(DEFAULT_ADB_TIMEOUT),
        }
    }

    /// 读取 `ANDROID_ADB_SERVER_ADDRESS` / `ANDROID_ADB_SERVER_PORT`,
    /// 未设置或无法解析的部分回落到默认值
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(ADB_SERVER_ADDRESS_ENV).ok().as_deref(),
            std::env::var(ADB_SERVER_PORT_ENV).ok().as_deref(),
        )
    }

    fn from_values(address: Option<&str>, port: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(address) = address {
            match address.trim().parse::<IpAddr>() {
                Ok(ip) => config.addr.set_ip(ip),
                Err(_) => warn!("Ignore invalid {} {:#?}", ADB_SERVER_ADDRESS_ENV, address),
            }
        }
        if let Some(port) = port {
            match port.trim().parse::<u16>() {
                Ok(port) => config.addr.set_port(port),
                Err(_) => warn!("Ignore invalid {} {:#?}", ADB_SERVER_PORT_ENV, port),
            }
        }
        config
    }

    ///
    /// 设置超时时间
    pub fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout;
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// 使用配置连接到Adb Server, 并设置读写超时
    pub fn create_socket(&self) -> AdbResult<TcpStream> {
        let stream = TcpStream::connect_timeout(&self.addr, self.timeout_duration())
            .map_err(|e| AdbError::connection_failed(format!("{}: {}", self.addr, e)))?;
        stream.set_read_timeout(Some(self.timeout_duration()))?;
        stream.set_write_timeout(Some(self.timeout_duration()))?;
        Ok(stream)
    }
}
