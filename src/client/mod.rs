pub mod install_logic;
pub mod progress;
pub mod transfer;

#[cfg(feature = "blocking")]
pub mod blocking;

#[cfg(feature = "tokio_async")]
pub mod tokio_async;

pub use progress::{InstallProgressHandler, ProgressAggregator};
pub use transfer::TransferOptions;
