/// 单个文件传输进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub received_bytes: u64,
    pub total_bytes: u64,
}

impl SyncProgress {
    pub fn new(received_bytes: u64, total_bytes: u64) -> Self {
        Self {
            received_bytes,
            total_bytes,
        }
    }

    /// 已传输百分比, 总大小未知时为0
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.received_bytes as f64 * 100.0 / self.total_bytes as f64
        }
    }
}

/// 安装流程所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageInstallProgressState {
    Preparing,
    Uploading,
    CreateSession,
    WriteSession,
    Installing,
    PostInstall,
    Finished,
}

/// 安装进度事件, 每次阶段变化或上传进度变化时产生一个
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallProgress {
    pub state: PackageInstallProgressState,
    pub package_finished: usize,
    pub package_required: usize,
    /// 上传阶段的总体百分比 (0-100)
    pub upload_progress: f64,
}

impl InstallProgress {
    pub fn new(state: PackageInstallProgressState) -> Self {
        Self {
            state,
            package_finished: 0,
            package_required: 0,
            upload_progress: 0.0,
        }
    }

    pub fn uploading(package_finished: usize, package_required: usize, upload_progress: f64) -> Self {
        Self {
            state: PackageInstallProgressState::Uploading,
            package_finished,
            package_required,
            upload_progress,
        }
    }

    /// 按数量计的阶段 (WriteSession / PostInstall)
    pub fn counted(
        state: PackageInstallProgressState,
        package_finished: usize,
        package_required: usize,
    ) -> Self {
        Self {
            state,
            package_finished,
            package_required,
            upload_progress: 0.0,
        }
    }
}
