pub mod app_info;
pub mod command;
pub mod device_info;
pub mod file_info;
pub mod install_output;
pub mod progress;

pub use app_info::{parse_package_list, parse_version_info, VersionInfo};
pub use command::AdbCommand;
pub use device_info::{parse_device_list, AdbDeviceInfo, DeviceState};
pub use file_info::{FileStatistics, FileStatisticsV2, UnixFileType, DEFAULT_FILE_MODE};
pub use install_output::{extract_session_id, InstallOutput};
pub use progress::{InstallProgress, PackageInstallProgressState, SyncProgress};
