use crate::beans::{
    parse_package_list, parse_version_info, InstallProgress, PackageInstallProgressState,
    VersionInfo,
};
use crate::client::install_logic;
use crate::client::progress::{InstallProgressHandler, ProgressAggregator};
use crate::client::tokio_async::adb_device::AdbDevice;
use crate::client::transfer::TransferOptions;
use crate::connections::AsyncSocketFactory;
use crate::errors::{AdbError, AdbResult};
use futures_util::future::join_all;
use log::{error, info};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 异步包管理。多apk安装时并发上传与并发清理, 会话写入仍然按顺序进行。
pub struct PackageManager<'a, F: AsyncSocketFactory> {
    device: &'a AdbDevice<F>,
    third_party_only: bool,
    packages: HashMap<String, Option<String>>,
    progress_handler: Option<Box<InstallProgressHandler<'a>>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, F: AsyncSocketFactory> PackageManager<'a, F> {
    pub fn new(device: &'a AdbDevice<F>) -> Self {
        Self {
            device,
            third_party_only: false,
            packages: HashMap::new(),
            progress_handler: None,
            cancel: None,
        }
    }

    pub fn with_third_party_only(mut self, third_party_only: bool) -> Self {
        self.third_party_only = third_party_only;
        self
    }

    pub fn with_progress_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(InstallProgress) + Send + Sync + 'a,
    {
        self.progress_handler = Some(Box::new(handler));
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn packages(&self) -> &HashMap<String, Option<String>> {
        &self.packages
    }

    fn emit(&self, progress: InstallProgress) {
        if let Some(handler) = &self.progress_handler {
            handler(progress);
        }
    }

    fn emit_state(&self, state: PackageInstallProgressState) {
        self.emit(InstallProgress::new(state));
    }

    fn check_cancelled(&self, operation: &str) -> AdbResult<()> {
        if self.cancel.map(|c| c.load(Ordering::SeqCst)).unwrap_or(false) {
            return Err(AdbError::cancelled(operation));
        }
        Ok(())
    }

    fn aggregator(&self, file_count: usize, halve_upload: bool) -> ProgressAggregator<'_> {
        ProgressAggregator::new(file_count, halve_upload, self.progress_handler.as_deref())
    }

    pub async fn refresh_packages(&mut self) -> AdbResult<&HashMap<String, Option<String>>> {
        self.device.ensure_online()?;
        let output = self
            .device
            .shell(install_logic::list_packages_command(self.third_party_only))
            .await?;
        self.packages = parse_package_list(&output);
        Ok(&self.packages)
    }

    pub async fn get_version_info(&self, package_name: &str) -> AdbResult<Option<VersionInfo>> {
        self.device.ensure_online()?;
        let output = self
            .device
            .shell(&install_logic::version_info_command(package_name))
            .await?;
        Ok(parse_version_info(&output))
    }

    async fn sync_package_to_device(
        &self,
        local: &Path,
        aggregator: &ProgressAggregator<'_>,
    ) -> AdbResult<String> {
        self.device.ensure_online()?;
        let remote = install_logic::remote_temp_path(local)?;
        let key = local.to_string_lossy().to_string();
        info!(
            "Uploading {:#?} onto device '{}'",
            remote,
            self.device.serial()
        );
        let mut options = TransferOptions::new().with_progress(|p| {
            aggregator.update(&key, p.percentage());
        });
        if let Some(cancel) = self.cancel {
            options = options.with_cancel(cancel);
        }
        if let Err(e) = self.device.sync().push_file(local, &remote, options).await {
            error!("Unable to upload {:#?}: {}", local, e);
            return Err(e);
        }
        aggregator.update(&key, 100.0);
        Ok(remote)
    }

    async fn remove_remote_package(&self, remote: &str) -> AdbResult<()> {
        self.device.remove(remote).await.map_err(|e| {
            error!("Failed to delete temporary package {:#?}: {}", remote, e);
            e
        })
    }

    /// 并发删除已上传的临时文件
    async fn remove_remote_packages(&self, remotes: &[String]) -> AdbResult<()> {
        let total = remotes.len();
        self.emit(InstallProgress::counted(PackageInstallProgressState::PostInstall, 0, total));
        let removed = &Mutex::new(0usize);
        let results = join_all(remotes.iter().map(|remote| async move {
            let result = self.remove_remote_package(remote).await;
            if result.is_ok() {
                let mut removed = removed.lock().unwrap_or_else(|e| e.into_inner());
                *removed += 1;
                self.emit(InstallProgress::counted(
                    PackageInstallProgressState::PostInstall,
                    *removed,
                    total,
                ));
            }
            result
        }))
        .await;
        let errors = results.into_iter().filter_map(Result::err).collect();
        install_logic::ensure_batch_complete("cleanup", total, errors)
    }

    /// 并发上传所有文件, 返回按输入顺序排列的远程路径和失败的错误
    async fn upload_all(
        &self,
        locals: &[&Path],
        aggregator: &ProgressAggregator<'_>,
    ) -> (Vec<String>, Vec<AdbError>) {
        let results = join_all(
            locals
                .iter()
                .map(|local| self.sync_package_to_device(local, aggregator)),
        )
        .await;
        let mut remotes = Vec::with_capacity(locals.len());
        let mut errors = vec![];
        for result in results {
            match result {
                Ok(remote) => remotes.push(remote),
                Err(e) => errors.push(e),
            }
        }
        (remotes, errors)
    }

    /// 普通安装: 上传, `pm install`, 删除临时文件
    pub async fn install_package<P: AsRef<Path>>(&self, local: P, args: &[&str]) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.emit_state(PackageInstallProgressState::Preparing);
        let aggregator = self.aggregator(1, false);
        let remote = self
            .sync_package_to_device(local.as_ref(), &aggregator)
            .await?;

        let result = self.install_remote(&remote, args).await;

        self.emit(InstallProgress::counted(PackageInstallProgressState::PostInstall, 0, 1));
        let cleanup = self.remove_remote_package(&remote).await;
        if cleanup.is_ok() {
            self.emit(InstallProgress::counted(PackageInstallProgressState::PostInstall, 1, 1));
        }
        install_logic::merge_cleanup(result, cleanup)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    pub async fn install_remote_package(&self, remote: &str, args: &[&str]) -> AdbResult<()> {
        self.install_remote(remote, args).await?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    async fn install_remote(&self, remote: &str, args: &[&str]) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.check_cancelled("install")?;
        self.emit_state(PackageInstallProgressState::Installing);
        let output = self
            .device
            .shell(&install_logic::install_command(remote, args))
            .await?;
        install_logic::check_install_output(&output)?;
        info!("Installed {:#?} on '{}'", remote, self.device.serial());
        Ok(())
    }

    /// 多apk会话安装。
    ///
    /// # 参数
    /// - `base`: 本地 base apk。
    /// - `splits`: 本地 split apk, 按顺序命名为 `split0`, `split1`...
    /// - `args`: 传给 `pm install-create` 的参数。
    pub async fn install_multiple_package<B, S>(
        &self,
        base: B,
        splits: &[S],
        args: &[&str],
    ) -> AdbResult<()>
    where
        B: AsRef<Path>,
        S: AsRef<Path>,
    {
        let mut locals = vec![base.as_ref()];
        locals.extend(splits.iter().map(|split| split.as_ref()));
        self.install_multiple_local(&locals, None, args).await
    }

    pub async fn install_multiple_package_with_name<P: AsRef<Path>>(
        &self,
        splits: &[P],
        package_name: &str,
        args: &[&str],
    ) -> AdbResult<()> {
        let locals: Vec<&Path> = splits.iter().map(|split| split.as_ref()).collect();
        self.install_multiple_local(&locals, Some(package_name), args)
            .await
    }

    async fn install_multiple_local(
        &self,
        locals: &[&Path],
        package_name: Option<&str>,
        args: &[&str],
    ) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.emit_state(PackageInstallProgressState::Preparing);
        let expected = locals.len();
        let aggregator = self.aggregator(expected, true);
        let (remotes, upload_errors) = self.upload_all(locals, &aggregator).await;

        if !upload_errors.is_empty() {
            let cleanup = self.remove_remote_packages(&remotes).await;
            let failure = install_logic::ensure_batch_complete("upload", expected, upload_errors);
            return install_logic::merge_cleanup(failure, cleanup);
        }

        let result = match package_name {
            None => match remotes.split_first() {
                Some((base, splits)) => {
                    self.run_session(None, Some(base.as_str()), splits, args)
                        .await
                }
                None => Err(AdbError::package_installation("no package to install")),
            },
            Some(name) => self.run_session(Some(name), None, &remotes, args).await,
        };

        let cleanup = self.remove_remote_packages(&remotes).await;
        install_logic::merge_cleanup(result, cleanup)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    pub async fn install_multiple_remote_package(
        &self,
        base: &str,
        splits: &[String],
        args: &[&str],
    ) -> AdbResult<()> {
        self.run_session(None, Some(base), splits, args).await?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    pub async fn install_multiple_remote_package_with_name(
        &self,
        splits: &[String],
        package_name: &str,
        args: &[&str],
    ) -> AdbResult<()> {
        self.run_session(Some(package_name), None, splits, args)
            .await?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    async fn run_session(
        &self,
        package_name: Option<&str>,
        base: Option<&str>,
        splits: &[String],
        args: &[&str],
    ) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.check_cancelled("install session")?;
        self.emit_state(PackageInstallProgressState::CreateSession);
        let output = self
            .device
            .shell(&install_logic::install_create_command(package_name, args))
            .await?;
        let session = install_logic::parse_session_id(&output)?;
        info!("Created install session {} on '{}'", session, self.device.serial());

        let entries = install_logic::session_entries(base, splits);
        let total = entries.len();
        self.emit(InstallProgress::counted(PackageInstallProgressState::WriteSession, 0, total));
        for (written, (label, remote)) in entries.iter().enumerate() {
            let output = self
                .device
                .shell(&install_logic::install_write_command(&session, label, remote))
                .await?;
            install_logic::check_install_output(&output)?;
            self.emit(InstallProgress::counted(
                PackageInstallProgressState::WriteSession,
                written + 1,
                total,
            ));
        }

        self.check_cancelled("install commit")?;
        self.emit_state(PackageInstallProgressState::Installing);
        let output = self
            .device
            .shell(&install_logic::install_commit_command(&session))
            .await?;
        install_logic::check_install_output(&output)?;
        info!("Committed install session {}", session);
        Ok(())
    }

    pub async fn uninstall_package(&self, package_name: &str, args: &[&str]) -> AdbResult<()> {
        self.device.ensure_online()?;
        let output = self
            .device
            .shell(&install_logic::uninstall_command(package_name, args))
            .await?;
        install_logic::check_install_output(&output)?;
        info!("Uninstalled {} from '{}'", package_name, self.device.serial());
        Ok(())
    }
}
