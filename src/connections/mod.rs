pub mod adb_socket_config;
pub mod socket_factory;

pub use adb_socket_config::AdbSocketConfig;
#[cfg(feature = "tokio_async")]
pub use socket_factory::AsyncSocketFactory;
#[cfg(feature = "blocking")]
pub use socket_factory::SocketFactory;
pub use socket_factory::TcpSocketFactory;
