use std::collections::HashMap;
use std::fmt::Display;

/// adb server 报告的设备状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Online,
    Offline,
    Bootloader,
    Recovery,
    Unauthorized,
    Authorizing,
    Sideload,
    Connecting,
    NoPermissions,
    Host,
    Unknown(String),
}

impl DeviceState {
    pub fn from_str(state: &str) -> Self {
        match state.trim().to_lowercase().as_str() {
            "device" => DeviceState::Online,
            "offline" => DeviceState::Offline,
            "bootloader" => DeviceState::Bootloader,
            "recovery" => DeviceState::Recovery,
            "unauthorized" => DeviceState::Unauthorized,
            "authorizing" => DeviceState::Authorizing,
            "sideload" => DeviceState::Sideload,
            "connecting" => DeviceState::Connecting,
            "no permissions" => DeviceState::NoPermissions,
            "host" => DeviceState::Host,
            other => DeviceState::Unknown(other.to_string()),
        }
    }
}

impl Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            DeviceState::Online => "device",
            DeviceState::Offline => "offline",
            DeviceState::Bootloader => "bootloader",
            DeviceState::Recovery => "recovery",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Authorizing => "authorizing",
            DeviceState::Sideload => "sideload",
            DeviceState::Connecting => "connecting",
            DeviceState::NoPermissions => "no permissions",
            DeviceState::Host => "host",
            DeviceState::Unknown(s) => s.as_str(),
        };
        write!(f, "{}", str)
    }
}

#[derive(Debug, Clone)]
pub struct AdbDeviceInfo {
    pub serial: String,
    pub state: DeviceState,
    pub properties: HashMap<String, String>,
}

impl AdbDeviceInfo {
    pub fn new<T: Into<String>>(serial: T, state: DeviceState) -> AdbDeviceInfo {
        AdbDeviceInfo {
            serial: serial.into(),
            state,
            properties: HashMap::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.state == DeviceState::Online
    }
}

/// 解析 `host:devices` 返回的 `serial\tstate` 列表
pub fn parse_device_list(content: &str) -> Vec<AdbDeviceInfo> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(2, '\t');
            let serial = parts.next()?.trim();
            let state = parts.next()?;
            if serial.is_empty() {
                return None;
            }
            Some(AdbDeviceInfo::new(serial, DeviceState::from_str(state)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let devices = parse_device_list("emulator-5554\tdevice\n0123456789\toffline\n\nbad-line\n");
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert!(devices[0].is_online());
        assert_eq!(devices[1].state, DeviceState::Offline);
    }

    #[test]
    fn test_state_round_trip_display() {
        assert_eq!(DeviceState::from_str("no permissions"), DeviceState::NoPermissions);
        assert_eq!(DeviceState::from_str("weird").to_string(), "weird");
        assert_eq!(DeviceState::Online.to_string(), "device");
    }
}
