use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static VERSION_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"versionCode=(\d*)( minSdk=(\d*))?( targetSdk=(\d*))?$")
        .expect("valid versionCode pattern")
});

/// `dumpsys package` 中解析出的版本信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version_code: i32,
    pub version_name: String,
}

impl VersionInfo {
    pub fn new<T: Into<String>>(version_code: i32, version_name: T) -> Self {
        Self {
            version_code,
            version_name: version_name.into(),
        }
    }
}

/// 解析 `dumpsys package <name>` 的输出。
///
/// 只看 `Packages:` 段落 (不缩进的行是段落标题), 取第一个出现的
/// `versionCode` 与 `versionName`。找不到 `versionName` 时返回 `None`。
pub fn parse_version_info(output: &str) -> Option<VersionInfo> {
    let mut in_packages_section = false;
    let mut version_code = None;
    let mut version_name = None;

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            in_packages_section = line.eq_ignore_ascii_case("Packages:");
            continue;
        }
        if !in_packages_section {
            continue;
        }
        let trimmed = line.trim();
        if version_name.is_none() {
            if let Some(name) = trimmed.strip_prefix("versionName=") {
                version_name = Some(name.trim().to_string());
            }
        }
        if version_code.is_none() {
            if let Some(caps) = VERSION_CODE_PATTERN.captures(line) {
                version_code = caps
                    .get(1)
                    .and_then(|m| m.as_str().trim().parse::<i32>().ok());
            }
        }
    }

    version_name.map(|name| VersionInfo::new(version_code.unwrap_or(0), name))
}

/// 解析 `pm list packages -f` 的输出, 返回 包名 -> apk路径
///
/// 行格式为 `package:/system/app/Foo.apk=com.foo` 或者 `package:com.foo`,
/// 以最后一个 `=` 分隔路径和包名。
pub fn parse_package_list(output: &str) -> HashMap<String, Option<String>> {
    let mut packages = HashMap::new();
    for line in output.lines() {
        let Some(package) = line.trim_end_matches('\r').strip_prefix("package:") else {
            continue;
        };
        match package.rfind('=') {
            Some(separator) => {
                let path = &package[..separator];
                let name = &package[separator + 1..];
                packages.insert(name.to_string(), Some(path.to_string()));
            }
            None => {
                packages.insert(package.to_string(), None);
            }
        }
    }
    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMPSYS: &str = "Activity Resolver Table:\n  Non-Data Actions:\n      versionName=bogus\nPackages:\n  Package [com.example.app] (3f2a1b):\n    userId=10123\n    versionCode=4 minSdk=21 targetSdk=33\n    versionName=1.2.3\n    splits=[base]\nHidden system packages:\n    versionCode=1 minSdk=21 targetSdk=33\n    versionName=0.0.1\n";

    #[test]
    fn test_version_info_in_packages_section() {
        let info = parse_version_info(DUMPSYS).unwrap();
        assert_eq!(info, VersionInfo::new(4, "1.2.3"));
    }

    #[test]
    fn test_version_info_missing() {
        assert_eq!(parse_version_info("Packages:\n  userId=1\n"), None);
        assert_eq!(parse_version_info(""), None);
    }

    #[test]
    fn test_package_list() {
        let output = "package:/system/app/LegacyCamera.apk=com.android.camera\npackage:mwc2015.be\n\
                      package:/data/app/~~x==/com.foo-1/base.apk=com.foo\nnoise\n";
        let packages = parse_package_list(output);
        assert_eq!(packages.len(), 3);
        assert_eq!(
            packages["com.android.camera"].as_deref(),
            Some("/system/app/LegacyCamera.apk")
        );
        assert_eq!(packages["mwc2015.be"], None);
        assert_eq!(
            packages["com.foo"].as_deref(),
            Some("/data/app/~~x==/com.foo-1/base.apk")
        );
    }
}
