use crate::beans::{
    parse_package_list, parse_version_info, InstallProgress, PackageInstallProgressState,
    VersionInfo,
};
use crate::client::blocking::adb_device::AdbDevice;
use crate::client::install_logic;
use crate::client::progress::{InstallProgressHandler, ProgressAggregator};
use crate::client::transfer::TransferOptions;
use crate::connections::SocketFactory;
use crate::errors::{AdbError, AdbResult};
use log::{error, info};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// 设备上的包管理: 普通安装、会话(流式)安装、卸载和查询。
///
/// 所有操作都先确认设备在线; 上传的临时文件在安装结束后删除,
/// 即使安装失败也会尝试清理。
pub struct PackageManager<'a, F: SocketFactory> {
    device: &'a AdbDevice<F>,
    third_party_only: bool,
    packages: HashMap<String, Option<String>>,
    progress_handler: Option<Box<InstallProgressHandler<'a>>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, F: SocketFactory> PackageManager<'a, F> {
    pub fn new(device: &'a AdbDevice<F>) -> Self {
        Self {
            device,
            third_party_only: false,
            packages: HashMap::new(),
            progress_handler: None,
            cancel: None,
        }
    }

    /// `refresh_packages` 只列出第三方应用
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

    /// 上传过程中检查的取消标记
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// 最近一次 `refresh_packages` 的结果: 包名 -> apk路径
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

    /// `pm list packages -f [-3]`
    pub fn refresh_packages(&mut self) -> AdbResult<&HashMap<String, Option<String>>> {
        self.device.ensure_online()?;
        let output = self
            .device
            .shell(install_logic::list_packages_command(self.third_party_only))?;
        self.packages = parse_package_list(&output);
        Ok(&self.packages)
    }

    /// 读取 `dumpsys package` 中的版本号, 没有安装时返回 `None`
    pub fn get_version_info(&self, package_name: &str) -> AdbResult<Option<VersionInfo>> {
        self.device.ensure_online()?;
        let output = self
            .device
            .shell(&install_logic::version_info_command(package_name))?;
        Ok(parse_version_info(&output))
    }

    /// 上传本地apk到临时目录, 进度写入 `aggregator`
    fn sync_package_to_device(
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
        if let Err(e) = self.device.sync().push_file(local, &remote, options) {
            error!("Unable to upload {:#?}: {}", local, e);
            return Err(e);
        }
        aggregator.update(&key, 100.0);
        Ok(remote)
    }

    fn remove_remote_package(&self, remote: &str) -> AdbResult<()> {
        self.device.remove(remote).map_err(|e| {
            error!("Failed to delete temporary package {:#?}: {}", remote, e);
            e
        })
    }

    /// 删除所有已上传的临时文件, 逐个报告 PostInstall 进度
    fn remove_remote_packages(&self, remotes: &[String]) -> AdbResult<()> {
        let total = remotes.len();
        self.emit(InstallProgress::counted(PackageInstallProgressState::PostInstall, 0, total));
        let mut removed = 0;
        let mut errors = vec![];
        for remote in remotes {
            match self.remove_remote_package(remote) {
                Ok(()) => {
                    removed += 1;
                    self.emit(InstallProgress::counted(
                        PackageInstallProgressState::PostInstall,
                        removed,
                        total,
                    ));
                }
                Err(e) => errors.push(e),
            }
        }
        install_logic::ensure_batch_complete("cleanup", total, errors)
    }

    /// 顺序上传所有文件; 返回已上传的远程路径和失败的错误
    fn upload_all(
        &self,
        locals: &[&Path],
        aggregator: &ProgressAggregator<'_>,
    ) -> (Vec<String>, Vec<AdbError>) {
        let mut remotes = Vec::with_capacity(locals.len());
        let mut errors = vec![];
        for local in locals {
            match self.sync_package_to_device(local, aggregator) {
                Ok(remote) => remotes.push(remote),
                Err(e) => errors.push(e),
            }
        }
        (remotes, errors)
    }

    /// 普通安装: 上传到临时目录, `pm install`, 删除临时文件。
    ///
    /// # 参数
    /// - `local`: 本地apk路径。
    /// - `args`: 传给 `pm install` 的参数, 例如 `-r`。
    pub fn install_package<P: AsRef<Path>>(&self, local: P, args: &[&str]) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.emit_state(PackageInstallProgressState::Preparing);
        let aggregator = self.aggregator(1, false);
        let remote = self.sync_package_to_device(local.as_ref(), &aggregator)?;

        let result = self.install_remote(&remote, args);

        self.emit(InstallProgress::counted(PackageInstallProgressState::PostInstall, 0, 1));
        let cleanup = self.remove_remote_package(&remote);
        if cleanup.is_ok() {
            self.emit(InstallProgress::counted(PackageInstallProgressState::PostInstall, 1, 1));
        }
        install_logic::merge_cleanup(result, cleanup)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    /// 安装设备上已有的apk
    pub fn install_remote_package(&self, remote: &str, args: &[&str]) -> AdbResult<()> {
        self.install_remote(remote, args)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    fn install_remote(&self, remote: &str, args: &[&str]) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.check_cancelled("install")?;
        self.emit_state(PackageInstallProgressState::Installing);
        let output = self.device.shell(&install_logic::install_command(remote, args))?;
        install_logic::check_install_output(&output)?;
        info!("Installed {:#?} on '{}'", remote, self.device.serial());
        Ok(())
    }

    /// 多apk会话安装: 上传 base 与所有 split, 创建会话写入并提交, 然后清理。
    pub fn install_multiple_package<B, S>(
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
        self.install_multiple_local(&locals, None, args)
    }

    /// 只有 split 的会话安装, 会话以 `-p <package_name>` 附加到已安装的包
    pub fn install_multiple_package_with_name<P: AsRef<Path>>(
        &self,
        splits: &[P],
        package_name: &str,
        args: &[&str],
    ) -> AdbResult<()> {
        let locals: Vec<&Path> = splits.iter().map(|split| split.as_ref()).collect();
        self.install_multiple_local(&locals, Some(package_name), args)
    }

    fn install_multiple_local(
        &self,
        locals: &[&Path],
        package_name: Option<&str>,
        args: &[&str],
    ) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.emit_state(PackageInstallProgressState::Preparing);
        let expected = locals.len();
        let aggregator = self.aggregator(expected, true);
        let (remotes, upload_errors) = self.upload_all(locals, &aggregator);

        if !upload_errors.is_empty() {
            let cleanup = self.remove_remote_packages(&remotes);
            let failure = install_logic::ensure_batch_complete("upload", expected, upload_errors);
            return install_logic::merge_cleanup(failure, cleanup);
        }

        let result = match package_name {
            None => match remotes.split_first() {
                Some((base, splits)) => self.run_session(None, Some(base.as_str()), splits, args),
                None => Err(AdbError::package_installation("no package to install")),
            },
            Some(name) => self.run_session(Some(name), None, &remotes, args),
        };

        let cleanup = self.remove_remote_packages(&remotes);
        install_logic::merge_cleanup(result, cleanup)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    /// 用设备上已有的 base 与 split 创建会话并提交
    pub fn install_multiple_remote_package(
        &self,
        base: &str,
        splits: &[String],
        args: &[&str],
    ) -> AdbResult<()> {
        self.run_session(None, Some(base), splits, args)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    pub fn install_multiple_remote_package_with_name(
        &self,
        splits: &[String],
        package_name: &str,
        args: &[&str],
    ) -> AdbResult<()> {
        self.run_session(Some(package_name), None, splits, args)?;
        self.emit_state(PackageInstallProgressState::Finished);
        Ok(())
    }

    /// CreateSession -> WriteSession -> Installing(commit)
    fn run_session(
        &self,
        package_name: Option<&str>,
        base: Option<&str>,
        splits: &[String],
        args: &[&str],
    ) -> AdbResult<()> {
        self.device.ensure_online()?;
        self.check_cancelled("install session")?;
        self.emit_state(PackageInstallProgressState::CreateSession);
        let session = self.create_install_session(package_name, args)?;
        info!("Created install session {} on '{}'", session, self.device.serial());

        let entries = install_logic::session_entries(base, splits);
        let total = entries.len();
        self.emit(InstallProgress::counted(PackageInstallProgressState::WriteSession, 0, total));
        for (written, (label, remote)) in entries.iter().enumerate() {
            self.write_install_session(&session, label, remote)?;
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
            .shell(&install_logic::install_commit_command(&session))?;
        install_logic::check_install_output(&output)?;
        info!("Committed install session {}", session);
        Ok(())
    }

    fn create_install_session(&self, package_name: Option<&str>, args: &[&str]) -> AdbResult<String> {
        let output = self
            .device
            .shell(&install_logic::install_create_command(package_name, args))?;
        install_logic::parse_session_id(&output)
    }

    fn write_install_session(&self, session: &str, label: &str, remote: &str) -> AdbResult<()> {
        let output = self
            .device
            .shell(&install_logic::install_write_command(session, label, remote))?;
        install_logic::check_install_output(&output)?;
        Ok(())
    }

    /// `pm uninstall [args] <package>`
    pub fn uninstall_package(&self, package_name: &str, args: &[&str]) -> AdbResult<()> {
        self.device.ensure_online()?;
        let output = self
            .device
            .shell(&install_logic::uninstall_command(package_name, args))?;
        install_logic::check_install_output(&output)?;
        info!("Uninstalled {} from '{}'", package_name, self.device.serial());
        Ok(())
    }
}
