pub mod beans;
pub mod client;
pub mod connections;
pub mod errors;
pub mod protocols;
pub mod utils;

pub use beans::{
    AdbDeviceInfo, DeviceState, FileStatistics, FileStatisticsV2, InstallProgress,
    PackageInstallProgressState, SyncProgress, VersionInfo,
};
pub use client::TransferOptions;
pub use connections::{AdbSocketConfig, TcpSocketFactory};
pub use errors::{AdbError, AdbResult};
pub use utils::adb_path;

#[cfg(feature = "blocking")]
pub use client::blocking::{AdbClient, AdbDevice, PackageManager, SyncService};
