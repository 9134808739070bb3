//! 创建到 adb server 的原始连接. 上层只依赖这里的 trait, 默认的
//! `TcpSocketFactory` 只在应用边界处使用.

use crate::connections::adb_socket_config::AdbSocketConfig;
use crate::errors::AdbResult;
use crate::utils::start_adb_server;
use log::error;

/// 阻塞模式的连接工厂, 每次调用得到一个独立的连接
#[cfg(feature = "blocking")]
pub trait SocketFactory: Send + Sync {
    type Socket: std::io::Read + std::io::Write + Send;

    fn connect(&self) -> AdbResult<Self::Socket>;
}

/// 异步模式的连接工厂
#[cfg(feature = "tokio_async")]
#[async_trait::async_trait]
pub trait AsyncSocketFactory: Send + Sync {
    type Socket: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send;

    async fn connect_async(&self) -> AdbResult<Self::Socket>;
}

/// 通过 TCP 连接本地 adb server
#[derive(Clone, Debug, Default)]
pub struct TcpSocketFactory {
    pub config: AdbSocketConfig,
    /// 连接失败时尝试 `adb start-server` 后重连
    pub auto_start_server: bool,
}

impl TcpSocketFactory {
    pub fn new(config: AdbSocketConfig) -> Self {
        Self {
            config,
            auto_start_server: false,
        }
    }

    pub fn with_auto_start_server(mut self, auto_start: bool) -> Self {
        self.auto_start_server = auto_start;
        self
    }
}

#[cfg(feature = "blocking")]
impl SocketFactory for TcpSocketFactory {
    type Socket = std::net::TcpStream;

    fn connect(&self) -> AdbResult<Self::Socket> {
        match self.config.create_socket() {
            Ok(stream) => Ok(stream),
            Err(e) if self.auto_start_server => {
                error!("Connect To Adb Failed, Try To Start Adb Server >>> {}", e);
                start_adb_server()?;
                self.config.create_socket()
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(feature = "tokio_async")]
impl TcpSocketFactory {
    async fn try_connect_async(&self) -> AdbResult<tokio::net::TcpStream> {
        use crate::errors::AdbError;

        let connect = tokio::net::TcpStream::connect(self.config.addr);
        match tokio::time::timeout(self.config.timeout_duration(), connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(AdbError::connection_failed(format!(
                "{}: {}",
                self.config.addr, e
            ))),
            Err(_) => Err(AdbError::connection_failed(format!(
                "{}: timed out after {}s",
                self.config.addr, self.config.timeout
            ))),
        }
    }
}

#[cfg(feature = "tokio_async")]
#[async_trait::async_trait]
impl AsyncSocketFactory for TcpSocketFactory {
    type Socket = tokio::net::TcpStream;

    async fn connect_async(&self) -> AdbResult<Self::Socket> {
        match self.try_connect_async().await {
            Ok(stream) => Ok(stream),
            Err(e) if self.auto_start_server => {
                error!("Connect To Adb Failed, Try To Start Adb Server >>> {}", e);
                tokio::task::spawn_blocking(start_adb_server)
                    .await
                    .map_err(|e| crate::errors::AdbError::from_display(e))??;
                log::info!("Adb Server Started, Reconnecting To {}", self.config.addr);
                self.try_connect_async().await
            }
            Err(e) => Err(e),
        }
    }
}
