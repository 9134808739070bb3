use super::protocol_logic;
use super::sync_codec::{self, SyncCommand, SYNC_HEADER_SIZE};
use crate::errors::{AdbError, AdbResult};
use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// `AsyncRead + AsyncWrite` 上的 adb 协议原语, 每次读写都是挂起点
#[async_trait]
pub trait AdbProtocol: AsyncRead + AsyncWrite + Unpin + Send {
    async fn send_command(&mut self, command: &str) -> AdbResult<()> {
        debug!("Send COMMAND: <{:#?}>", command);
        let packet = protocol_logic::build_command_packet(command);
        self.write_all(&packet).await?;
        Ok(())
    }

    async fn read_string(&mut self, size: usize) -> AdbResult<String> {
        let mut data = vec![0; size];
        self.read_exact(&mut data).await?;
        Ok(String::from_utf8_lossy(&data).to_string())
    }

    async fn read_string_block(&mut self) -> AdbResult<String> {
        let mut length = [0u8; 4];
        self.read_exact(&mut length).await?;
        let size = protocol_logic::parse_length_prefix(&length)?;
        self.read_string(size).await
    }

    async fn read_until_close(&mut self) -> AdbResult<String> {
        let mut content = Vec::new();
        self.read_to_end(&mut content).await?;
        Ok(String::from_utf8_lossy(&content).to_string())
    }

    async fn check_okay(&mut self, command: &str) -> AdbResult<()> {
        let mut response = [0u8; 4];
        self.read_exact(&mut response).await?;
        if protocol_logic::is_okay_response(&response) {
            Ok(())
        } else if protocol_logic::is_fail_response(&response) {
            let reason = self.read_string_block().await?;
            Err(AdbError::command_failed(command, reason))
        } else {
            Err(AdbError::protocol_error(format!(
                "Unexpected response {:?} to {}",
                String::from_utf8_lossy(&response),
                command
            )))
        }
    }

    async fn send_cmd_then_check_okay(&mut self, command: &str) -> AdbResult<()> {
        self.send_command(command).await?;
        self.check_okay(command).await
    }

    async fn set_device(&mut self, serial: &str) -> AdbResult<()> {
        let command = protocol_logic::transport_command(serial);
        self.send_cmd_then_check_okay(&command).await
    }

    async fn send_sync_request(&mut self, command: SyncCommand, path: &str) -> AdbResult<()> {
        debug!(">>>>>>> Sync {} {:#?} >>>>>>>", command, path);
        let packet = sync_codec::encode_request(command, path.as_bytes());
        self.write_all(&packet).await?;
        Ok(())
    }

    async fn send_sync_header(&mut self, command: SyncCommand, value: u32) -> AdbResult<()> {
        let header = sync_codec::encode_header(command, value);
        self.write_all(&header).await?;
        Ok(())
    }

    async fn send_sync_data(&mut self, chunk: &[u8]) -> AdbResult<()> {
        let packet = sync_codec::encode_data(chunk);
        self.write_all(&packet).await?;
        Ok(())
    }

    async fn read_sync_command(&mut self) -> AdbResult<SyncCommand> {
        let mut command = [0u8; 4];
        self.read_exact(&mut command).await?;
        SyncCommand::from_bytes(&command)
    }

    async fn read_sync_header(&mut self) -> AdbResult<(SyncCommand, u32)> {
        let mut header = [0u8; SYNC_HEADER_SIZE];
        self.read_exact(&mut header).await?;
        let (command, value) = sync_codec::decode_header(&header)?;
        debug!("<<<<<<< Sync {} {} <<<<<<<", command, value);
        Ok((command, value))
    }

    async fn read_sync_u32(&mut self) -> AdbResult<u32> {
        let mut value = [0u8; 4];
        self.read_exact(&mut value).await?;
        Ok(u32::from_le_bytes(value))
    }

    async fn read_sync_string(&mut self, limit: usize) -> AdbResult<String> {
        let length = self.read_sync_u32().await?;
        let size = sync_codec::check_string_length(length, limit)?;
        self.read_string(size).await
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AdbProtocol for T {}
