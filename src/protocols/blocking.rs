use super::protocol_logic;
use super::sync_codec::{self, SyncCommand, SYNC_HEADER_SIZE};
use crate::errors::{AdbError, AdbResult};
use log::debug;
use std::io::{Read, Write};

/// 在任意 `Read + Write` 字节流上实现的 adb 协议原语
pub trait AdbProtocol: Read + Write {
    /// 发送带 `%04x` 长度前缀的 host 请求。
    ///
    /// # 参数
    /// - `command`: 要发送的命令字符串。
    fn send_command(&mut self, command: &str) -> AdbResult<()> {
        debug!("Send COMMAND: <{:#?}>", command);
        let packet = protocol_logic::build_command_packet(command);
        self.write_all(&packet)?;
        Ok(())
    }

    /// 读取指定大小的字符串。
    fn read_string(&mut self, size: usize) -> AdbResult<String> {
        let mut data = vec![0; size];
        self.read_exact(&mut data)?;
        Ok(String::from_utf8_lossy(&data).to_string())
    }

    /// 读取一个字符串块，以十六进制字符串长度开始。
    fn read_string_block(&mut self) -> AdbResult<String> {
        let mut length = [0u8; 4];
        self.read_exact(&mut length)?;
        let size = protocol_logic::parse_length_prefix(&length)?;
        self.read_string(size)
    }

    /// 读取直到对端关闭连接。
    fn read_until_close(&mut self) -> AdbResult<String> {
        let mut content = Vec::new();
        self.read_to_end(&mut content)?;
        Ok(String::from_utf8_lossy(&content).to_string())
    }

    /// 检查返回是否为"OKAY", "FAIL" 时携带服务端的错误信息。
    fn check_okay(&mut self, command: &str) -> AdbResult<()> {
        let mut response = [0u8; 4];
        self.read_exact(&mut response)?;
        if protocol_logic::is_okay_response(&response) {
            Ok(())
        } else if protocol_logic::is_fail_response(&response) {
            let reason = self.read_string_block()?;
            Err(AdbError::command_failed(command, reason))
        } else {
            Err(AdbError::protocol_error(format!(
                "Unexpected response {:?} to {}",
                String::from_utf8_lossy(&response),
                command
            )))
        }
    }

    fn send_cmd_then_check_okay(&mut self, command: &str) -> AdbResult<()> {
        self.send_command(command)?;
        self.check_okay(command)
    }

    /// 将连接切换到指定设备
    fn set_device(&mut self, serial: &str) -> AdbResult<()> {
        self.send_cmd_then_check_okay(&protocol_logic::transport_command(serial))
    }

    /// 发送 sync 请求: 命令 + 路径长度 + 路径
    fn send_sync_request(&mut self, command: SyncCommand, path: &str) -> AdbResult<()> {
        debug!(">>>>>>> Sync {} {:#?} >>>>>>>", command, path);
        self.write_all(&sync_codec::encode_request(command, path.as_bytes()))?;
        Ok(())
    }

    fn send_sync_header(&mut self, command: SyncCommand, value: u32) -> AdbResult<()> {
        self.write_all(&sync_codec::encode_header(command, value))?;
        Ok(())
    }

    fn send_sync_data(&mut self, chunk: &[u8]) -> AdbResult<()> {
        self.write_all(&sync_codec::encode_data(chunk))?;
        Ok(())
    }

    fn read_sync_command(&mut self) -> AdbResult<SyncCommand> {
        let mut command = [0u8; 4];
        self.read_exact(&mut command)?;
        SyncCommand::from_bytes(&command)
    }

    fn read_sync_header(&mut self) -> AdbResult<(SyncCommand, u32)> {
        let mut header = [0u8; SYNC_HEADER_SIZE];
        self.read_exact(&mut header)?;
        let (command, value) = sync_codec::decode_header(&header)?;
        debug!("<<<<<<< Sync {} {} <<<<<<<", command, value);
        Ok((command, value))
    }

    fn read_sync_u32(&mut self) -> AdbResult<u32> {
        let mut value = [0u8; 4];
        self.read_exact(&mut value)?;
        Ok(u32::from_le_bytes(value))
    }

    /// 读取 4字节小端长度 + 内容, 用于 FAIL 消息和文件名。
    ///
    /// # 参数
    /// - `limit`: 允许的最大长度, 超出时返回协议错误且不读取内容。
    fn read_sync_string(&mut self, limit: usize) -> AdbResult<String> {
        let size = sync_codec::check_string_length(self.read_sync_u32()?, limit)?;
        self.read_string(size)
    }
}

impl<T: Read + Write> AdbProtocol for T {}
