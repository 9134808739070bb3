//! pm 命令的拼装与输出判定, 阻塞与异步安装流程共用

use crate::beans::command::quote_arg;
use crate::beans::install_output::UNKNOWN_ERROR;
use crate::beans::{extract_session_id, InstallOutput};
use crate::errors::{AdbError, AdbResult};
use crate::utils::{file_name, linux_path_combine};
use log::error;
use std::path::Path;

/// 上传 apk 的临时目录
pub const TEMP_INSTALLATION_DIRECTORY: &str = "/data/local/tmp/";
pub const BASE_APK_LABEL: &str = "base";

const LIST_FULL: &str = "pm list packages -f";
const LIST_THIRD_PARTY_ONLY: &str = "pm list packages -f -3";

fn join_command(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// 本地 apk 在设备上的临时路径, 仅取文件名
pub fn remote_temp_path(local: &Path) -> AdbResult<String> {
    Ok(linux_path_combine(
        TEMP_INSTALLATION_DIRECTORY,
        &file_name(local)?,
    ))
}

/// 第 `index` 个 split 在会话中的名字, 从0开始
pub fn split_label(index: usize) -> String {
    format!("split{}", index)
}

/// 会话中按写入顺序排列的 `(名字, 远程路径)`: base 在前, 之后是 `split0`, `split1`...
pub fn session_entries<'a>(base: Option<&'a str>, splits: &'a [String]) -> Vec<(String, &'a str)> {
    base.map(|base| (BASE_APK_LABEL.to_string(), base))
        .into_iter()
        .chain(
            splits
                .iter()
                .enumerate()
                .map(|(index, split)| (split_label(index), split.as_str())),
        )
        .collect()
}

pub fn install_command(remote_path: &str, args: &[&str]) -> String {
    let mut parts = vec!["pm", "install"];
    parts.extend_from_slice(args);
    let quoted = quote_arg(remote_path);
    parts.push(&quoted);
    join_command(&parts)
}

pub fn install_create_command(package_name: Option<&str>, args: &[&str]) -> String {
    let mut parts = vec!["pm", "install-create"];
    if let Some(package_name) = package_name.filter(|name| !name.trim().is_empty()) {
        parts.push("-p");
        parts.push(package_name);
    }
    parts.extend_from_slice(args);
    join_command(&parts)
}

pub fn install_write_command(session: &str, label: &str, remote_path: &str) -> String {
    format!(
        "pm install-write {} {}.apk {}",
        session,
        label,
        quote_arg(remote_path)
    )
}

pub fn install_commit_command(session: &str) -> String {
    format!("pm install-commit {}", session)
}

pub fn uninstall_command(package_name: &str, args: &[&str]) -> String {
    let mut parts = vec!["pm", "uninstall"];
    parts.extend_from_slice(args);
    parts.push(package_name);
    join_command(&parts)
}

pub fn version_info_command(package_name: &str) -> String {
    format!("dumpsys package {}", package_name)
}

pub fn list_packages_command(third_party_only: bool) -> &'static str {
    if third_party_only {
        LIST_THIRD_PARTY_ONLY
    } else {
        LIST_FULL
    }
}

pub fn remove_command(remote_path: &str) -> String {
    format!("rm {}", quote_arg(remote_path))
}

/// 非空错误信息即失败
pub fn check_install_output(output: &str) -> AdbResult<InstallOutput> {
    let parsed = InstallOutput::parse(output);
    if let Some(message) = parsed.error() {
        return Err(AdbError::package_installation(message));
    }
    Ok(parsed)
}

/// 解析 `pm install-create` 的输出得到会话id
pub fn parse_session_id(output: &str) -> AdbResult<String> {
    let parsed = InstallOutput::parse(output);
    let Some(success) = parsed.success_message else {
        return Err(AdbError::package_installation(
            parsed
                .error_message
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        ));
    };
    extract_session_id(&success).ok_or_else(|| {
        AdbError::package_installation(format!("no install session id in {:?}", success))
    })
}

/// 批量操作结束后检查完成数量。有取消时优先返回取消。
pub fn ensure_batch_complete(
    operation: &str,
    expected: usize,
    errors: Vec<AdbError>,
) -> AdbResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    for err in &errors {
        error!("{} failed: {}", operation, err);
    }
    let completed = expected.saturating_sub(errors.len());
    let mut errors = errors;
    if let Some(index) = errors
        .iter()
        .position(|err| matches!(err, AdbError::Cancelled { .. }))
    {
        return Err(errors.swap_remove(index));
    }
    let first = errors.swap_remove(0);
    match AdbError::batch_incomplete(operation, expected, completed) {
        AdbError::PackageInstallation { message } => Err(AdbError::package_installation(
            format!("{} (first error: {})", message, first),
        )),
        other => Err(other),
    }
}

/// 安装结果与清理结果合并: 两者都失败时保留两个错误
pub fn merge_cleanup<T>(result: AdbResult<T>, cleanup: AdbResult<()>) -> AdbResult<T> {
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup)) => Err(err.with_cleanup(cleanup)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_temp_path() {
        assert_eq!(
            remote_temp_path(Path::new("/home/me/out/app-release.apk")).unwrap(),
            "/data/local/tmp/app-release.apk"
        );
        assert!(remote_temp_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_pm_commands() {
        assert_eq!(
            install_command("/data/local/tmp/a.apk", &["-r", "-t"]),
            "pm install -r -t \"/data/local/tmp/a.apk\""
        );
        assert_eq!(
            install_command("/data/local/tmp/a.apk", &[]),
            "pm install \"/data/local/tmp/a.apk\""
        );
        assert_eq!(install_create_command(None, &["-r"]), "pm install-create -r");
        assert_eq!(
            install_create_command(Some("com.example"), &["-r"]),
            "pm install-create -p com.example -r"
        );
        assert_eq!(install_create_command(Some(" "), &[]), "pm install-create");
        assert_eq!(
            install_write_command("123", &split_label(1), "/data/local/tmp/b.apk"),
            "pm install-write 123 split1.apk \"/data/local/tmp/b.apk\""
        );
        assert_eq!(install_commit_command("123"), "pm install-commit 123");
        assert_eq!(uninstall_command("com.example", &["-k"]), "pm uninstall -k com.example");
        assert_eq!(remove_command("/data/local/tmp/a.apk"), "rm \"/data/local/tmp/a.apk\"");
        assert_eq!(list_packages_command(true), "pm list packages -f -3");
        assert_eq!(version_info_command("com.example"), "dumpsys package com.example");
    }

    #[test]
    fn test_session_entries_order() {
        let splits = vec!["/t/b.apk".to_string(), "/t/c.apk".to_string()];
        assert_eq!(
            session_entries(Some("/t/a.apk"), &splits),
            vec![
                ("base".to_string(), "/t/a.apk"),
                ("split0".to_string(), "/t/b.apk"),
                ("split1".to_string(), "/t/c.apk"),
            ]
        );
        let named = session_entries(None, &splits);
        assert_eq!(named[0], ("split0".to_string(), "/t/b.apk"));
        assert_eq!(named.len(), 2);
    }

    #[test]
    fn test_parse_session_id() {
        assert_eq!(
            parse_session_id("Success: created install session [1234567890]\n").unwrap(),
            "1234567890"
        );
        let err = parse_session_id("Failure [INSTALL_FAILED_ABORTED]").unwrap_err();
        assert_eq!(err.to_string(), "Package installation failed: INSTALL_FAILED_ABORTED");
        assert!(parse_session_id("Success").is_err());
        assert!(parse_session_id("").is_err());
    }

    #[test]
    fn test_check_install_output() {
        assert!(check_install_output("Success\n").is_ok());
        let err = check_install_output("Failure [INSTALL_FAILED_OLDER_SDK]\n").unwrap_err();
        assert!(matches!(err, AdbError::PackageInstallation { ref message } if message == "INSTALL_FAILED_OLDER_SDK"));
    }

    #[test]
    fn test_batch_errors() {
        assert!(ensure_batch_complete("upload", 2, vec![]).is_ok());

        let err = ensure_batch_complete(
            "upload",
            3,
            vec![AdbError::sync_failed("/data/local/tmp/b.apk", "No space left on device")],
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("expected 3 packages, completed 2"));
        assert!(message.contains("No space left on device"));

        let err = ensure_batch_complete(
            "upload",
            2,
            vec![AdbError::unknown("x"), AdbError::cancelled("push")],
        )
        .unwrap_err();
        assert!(matches!(err, AdbError::Cancelled { .. }));
    }

    #[test]
    fn test_merge_cleanup() {
        assert_eq!(merge_cleanup(Ok(1), Ok(())).unwrap(), 1);
        let err = merge_cleanup::<()>(Ok(()), Err(AdbError::unknown("rm"))).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_ERROR");
        let err = merge_cleanup::<()>(
            Err(AdbError::package_installation("commit")),
            Err(AdbError::unknown("rm")),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CLEANUP_FAILED");
    }
}
