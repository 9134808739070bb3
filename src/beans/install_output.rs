use once_cell::sync::Lazy;
use regex::Regex;

pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

const SUCCESS_OUTPUT: &str = "Success";
const FAILURE_OUTPUT: &str = "Failure";

static SUCCESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Success:\s+(.*)?").expect("valid success pattern"));
static FAILURE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Failure(?:\s+\[(.*)\])?").expect("valid failure pattern"));
static ERROR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Error:\s+(.*)?").expect("valid error pattern"));

/// `pm install*` / `pm uninstall` 的输出解析结果, 以最后一个非空行为准
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOutput {
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

fn captured_or_unknown(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|msg| !msg.is_empty())
        .map(|msg| msg.to_string())
}

impl InstallOutput {
    pub fn parse(output: &str) -> Self {
        let mut result = InstallOutput::default();
        for line in output.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if line.starts_with(SUCCESS_OUTPUT) {
                let message = if SUCCESS_PATTERN.is_match(line) {
                    captured_or_unknown(&SUCCESS_PATTERN, line)
                        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
                } else {
                    SUCCESS_OUTPUT.to_string()
                };
                result.success_message = Some(message);
                result.error_message = None;
            } else {
                let pattern = if line.starts_with(FAILURE_OUTPUT) {
                    &FAILURE_PATTERN
                } else {
                    &ERROR_PATTERN
                };
                let message =
                    captured_or_unknown(pattern, line).unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                result.error_message = Some(message);
                result.success_message = None;
            }
        }
        result
    }

    pub fn is_success(&self) -> bool {
        self.success_message.is_some()
    }

    /// 错误信息非空即视为失败
    pub fn error(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|msg| !msg.is_empty())
    }
}

/// 从 `Success: [1234567890]` 中提取会话id
pub fn extract_session_id(message: &str) -> Option<String> {
    let start = message.find('[')?;
    let end = message[start + 1..].find(']')? + start + 1;
    let session = message[start + 1..end].trim();
    if session.is_empty() {
        None
    } else {
        Some(session.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_with_session() {
        let output = InstallOutput::parse("Success: created install session [1234567890]\n");
        assert!(output.is_success());
        assert_eq!(output.error(), None);
        let message = output.success_message.unwrap();
        assert_eq!(extract_session_id(&message).as_deref(), Some("1234567890"));
    }

    #[test]
    fn test_session_id_exact() {
        assert_eq!(
            extract_session_id("Success: [1234567890]").as_deref(),
            Some("1234567890")
        );
        assert_eq!(extract_session_id("Success: []"), None);
        assert_eq!(extract_session_id("Success"), None);
    }

    #[test]
    fn test_plain_success() {
        let output = InstallOutput::parse("Performing Streamed Install\nSuccess\n");
        assert_eq!(output.success_message.as_deref(), Some("Success"));
        assert_eq!(output.error(), None);
    }

    #[test]
    fn test_failure_reason() {
        let output = InstallOutput::parse(
            "Failure [INSTALL_FAILED_UPDATE_INCOMPATIBLE: signatures do not match]\n",
        );
        assert!(!output.is_success());
        assert_eq!(
            output.error(),
            Some("INSTALL_FAILED_UPDATE_INCOMPATIBLE: signatures do not match")
        );
    }

    #[test]
    fn test_failure_without_reason() {
        assert_eq!(InstallOutput::parse("Failure").error(), Some(UNKNOWN_ERROR));
        assert_eq!(InstallOutput::parse("Error:").error(), Some(UNKNOWN_ERROR));
        assert_eq!(InstallOutput::parse("Error").error(), Some(UNKNOWN_ERROR));
    }

    #[test]
    fn test_error_line_keeps_message() {
        let output = InstallOutput::parse("Error: Unknown option: -z\n");
        assert!(!output.is_success());
        assert_eq!(output.error(), Some("Unknown option: -z"));
        assert_eq!(
            InstallOutput::parse("Error: java.lang.IllegalStateException").error(),
            Some("java.lang.IllegalStateException")
        );
    }

    #[test]
    fn test_last_line_wins() {
        let output = InstallOutput::parse("Failure [X]\n\nSuccess\n");
        assert!(output.is_success());
        assert_eq!(output.error(), None);
    }

    #[test]
    fn test_empty_output() {
        let output = InstallOutput::parse("");
        assert!(!output.is_success());
        assert_eq!(output.error(), None);
    }
}
