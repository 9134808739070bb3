pub mod adb_client;
pub mod adb_device;
pub mod package_manager;
pub mod sync_service;

pub use adb_client::AdbClient;
pub use adb_device::AdbDevice;
pub use package_manager::PackageManager;
pub use sync_service::SyncService;
