//! sync 模式的帧编解码: 4字节ASCII命令 + 4字节小端长度/数值

use crate::errors::{AdbError, AdbResult};

/// 单个 DATA 帧最大负载, 与设备端限制一致
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;
/// 远程路径最大长度
pub const MAX_PATH_LENGTH: usize = 1024;
/// 帧头长度
pub const SYNC_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncCommand {
    Stat,
    Stat2,
    LStat2,
    List,
    List2,
    Dent,
    Dent2,
    Send,
    Send2,
    Recv,
    Recv2,
    Done,
    Data,
    Okay,
    Fail,
    Quit,
}

const COMMAND_TABLE: [(SyncCommand, &[u8; 4]); 16] = [
    (SyncCommand::Stat, b"STAT"),
    (SyncCommand::Stat2, b"STA2"),
    (SyncCommand::LStat2, b"LST2"),
    (SyncCommand::List, b"LIST"),
    (SyncCommand::List2, b"LIS2"),
    (SyncCommand::Dent, b"DENT"),
    (SyncCommand::Dent2, b"DNT2"),
    (SyncCommand::Send, b"SEND"),
    (SyncCommand::Send2, b"SND2"),
    (SyncCommand::Recv, b"RECV"),
    (SyncCommand::Recv2, b"RCV2"),
    (SyncCommand::Done, b"DONE"),
    (SyncCommand::Data, b"DATA"),
    (SyncCommand::Okay, b"OKAY"),
    (SyncCommand::Fail, b"FAIL"),
    (SyncCommand::Quit, b"QUIT"),
];

impl SyncCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncCommand::Stat => "STAT",
            SyncCommand::Stat2 => "STA2",
            SyncCommand::LStat2 => "LST2",
            SyncCommand::List => "LIST",
            SyncCommand::List2 => "LIS2",
            SyncCommand::Dent => "DENT",
            SyncCommand::Dent2 => "DNT2",
            SyncCommand::Send => "SEND",
            SyncCommand::Send2 => "SND2",
            SyncCommand::Recv => "RECV",
            SyncCommand::Recv2 => "RCV2",
            SyncCommand::Done => "DONE",
            SyncCommand::Data => "DATA",
            SyncCommand::Okay => "OKAY",
            SyncCommand::Fail => "FAIL",
            SyncCommand::Quit => "QUIT",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// 解析4字节命令id, 未知命令返回 `UnknownSyncCommand`
    pub fn from_bytes(data: &[u8]) -> AdbResult<Self> {
        if data.len() < 4 {
            return Err(AdbError::protocol_error(format!(
                "sync command needs 4 bytes, got {}",
                data.len()
            )));
        }
        COMMAND_TABLE
            .iter()
            .find(|(_, bytes)| bytes[..] == data[..4])
            .map(|(command, _)| *command)
            .ok_or_else(|| AdbError::unknown_sync_command(&data[..4]))
    }
}

impl std::fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn encode_header(command: SyncCommand, value: u32) -> [u8; SYNC_HEADER_SIZE] {
    let mut header = [0u8; SYNC_HEADER_SIZE];
    header[..4].copy_from_slice(command.as_bytes());
    header[4..].copy_from_slice(&value.to_le_bytes());
    header
}

pub fn decode_header(data: &[u8]) -> AdbResult<(SyncCommand, u32)> {
    if data.len() < SYNC_HEADER_SIZE {
        return Err(AdbError::protocol_error(format!(
            "sync header needs {} bytes, got {}",
            SYNC_HEADER_SIZE,
            data.len()
        )));
    }
    let command = SyncCommand::from_bytes(&data[..4])?;
    let mut value = [0u8; 4];
    value.copy_from_slice(&data[4..8]);
    Ok((command, u32::from_le_bytes(value)))
}

/// 命令 + 负载长度 + 负载
pub fn encode_request(command: SyncCommand, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(SYNC_HEADER_SIZE + payload.len());
    packet.extend_from_slice(&encode_header(command, payload.len() as u32));
    packet.extend_from_slice(payload);
    packet
}

pub fn encode_data(chunk: &[u8]) -> Vec<u8> {
    encode_request(SyncCommand::Data, chunk)
}

/// SEND 的参数 `"<path>,<mode十进制>"`
pub fn send_argument(path: &str, mode: u32) -> String {
    format!("{},{}", path, mode)
}

pub fn check_path_length(path: &str) -> AdbResult<()> {
    crate::adb_ensure!(
        path.len() <= MAX_PATH_LENGTH,
        AdbError::invalid_path(path, format!("longer than {} bytes", MAX_PATH_LENGTH))
    );
    Ok(())
}

/// 设备给出的字符串长度(FAIL 消息、文件名)不能超过 `limit`
pub fn check_string_length(length: u32, limit: usize) -> AdbResult<usize> {
    let length = length as usize;
    if length > limit {
        return Err(AdbError::protocol_error(format!(
            "sync string of {} bytes exceeds limit of {}",
            length, limit
        )));
    }
    Ok(length)
}
