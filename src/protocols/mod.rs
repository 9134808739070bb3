pub mod sync_codec;

#[cfg(feature = "blocking")]
pub mod blocking;

#[cfg(feature = "tokio_async")]
pub mod tokio_async;

pub use sync_codec::{SyncCommand, MAX_CHUNK_SIZE, MAX_PATH_LENGTH};

/// host 请求的编解码, 与阻塞/异步无关
pub mod protocol_logic {
    use crate::errors::{AdbError, AdbResult};

    pub const OKAY: &[u8; 4] = b"OKAY";
    pub const FAIL: &[u8; 4] = b"FAIL";

    /// `%04x` 长度前缀 + 命令
    pub fn build_command_packet(command: &str) -> Vec<u8> {
        let cmd_bytes = command.as_bytes();
        let length = format!("{:04x}", cmd_bytes.len());
        let mut packet = Vec::with_capacity(4 + cmd_bytes.len());
        packet.extend_from_slice(length.as_bytes());
        packet.extend_from_slice(cmd_bytes);
        packet
    }

    pub fn parse_length_prefix(data: &[u8]) -> AdbResult<usize> {
        if data.len() < 4 {
            return Err(AdbError::protocol_error("Invalid length prefix"));
        }
        let length_str = String::from_utf8_lossy(&data[..4]);
        usize::from_str_radix(&length_str, 16).map_err(|_| {
            AdbError::protocol_error(format!("Invalid length prefix {:?}", length_str))
        })
    }

    pub fn is_okay_response(data: &[u8]) -> bool {
        data == OKAY
    }

    pub fn is_fail_response(data: &[u8]) -> bool {
        data == FAIL
    }

    pub fn transport_command(serial: &str) -> String {
        format!("host:transport:{}", serial)
    }

    pub fn shell_command(command: &str) -> String {
        format!("shell:{}", command)
    }

}
