use crate::beans::file_info::{STAT_V1_RECORD_SIZE, STAT_V2_RECORD_SIZE};
use crate::beans::{FileStatistics, FileStatisticsV2, DEFAULT_FILE_MODE};
use crate::client::tokio_async::adb_device::AdbDevice;
use crate::client::transfer::{self, TransferOptions};
use crate::connections::AsyncSocketFactory;
use crate::errors::{AdbError, AdbResult, AdbResultExt};
use crate::protocols::sync_codec::{self, SyncCommand, MAX_CHUNK_SIZE, MAX_PATH_LENGTH};
use crate::protocols::tokio_async::AdbProtocol;
use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use log::{error, info};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

async fn stat_on<S: AdbProtocol>(socket: &mut S, path: &str) -> AdbResult<FileStatistics> {
    socket.send_sync_request(SyncCommand::Stat, path).await?;
    let command = socket.read_sync_command().await?;
    if command != SyncCommand::Stat {
        return Err(transfer::unexpected_command(command, "STAT"));
    }
    let mut record = [0u8; STAT_V1_RECORD_SIZE];
    socket.read_exact(&mut record).await?;
    transfer::stat_result(FileStatistics::from_bytes(&record, path)?)
}

/// 列表中 DENT/DNT2 之外的帧: DONE 正常结束, FAIL 转成错误
async fn end_of_listing<S: AdbProtocol>(
    socket: &mut S,
    command: SyncCommand,
    path: &str,
    expected: &str,
) -> AdbResult<()> {
    match command {
        SyncCommand::Done => Ok(()),
        SyncCommand::Fail => {
            let message = socket.read_sync_string(MAX_CHUNK_SIZE).await?;
            Err(AdbError::sync_failed(path, message))
        }
        other => Err(transfer::unexpected_command(other, expected)),
    }
}

pub struct SyncService<'a, F: AsyncSocketFactory> {
    device: &'a AdbDevice<F>,
    max_chunk_size: usize,
}

impl<'a, F: AsyncSocketFactory> SyncService<'a, F> {
    pub fn new(device: &'a AdbDevice<F>) -> Self {
        Self {
            device,
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = transfer::clamp_chunk_size(size);
        self
    }

    async fn open(&self) -> AdbResult<F::Socket> {
        let mut socket = self.device.open_transport().await?;
        socket.send_cmd_then_check_okay("sync:").await?;
        Ok(socket)
    }

    pub async fn stat(&self, path: &str) -> AdbResult<FileStatistics> {
        let mut socket = self.open().await?;
        stat_on(&mut socket, path).await
    }

    pub async fn stat_v2(&self, path: &str) -> AdbResult<FileStatisticsV2> {
        let mut socket = self.open().await?;
        socket.send_sync_request(SyncCommand::Stat2, path).await?;
        let command = socket.read_sync_command().await?;
        if command != SyncCommand::Stat2 {
            return Err(transfer::unexpected_command(command, "STA2"));
        }
        let mut record = [0u8; STAT_V2_RECORD_SIZE];
        socket.read_exact(&mut record).await?;
        transfer::stat_v2_result(FileStatisticsV2::from_bytes(&record, path)?)
    }

    pub async fn exists(&self, path: &str) -> AdbResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(AdbError::FileNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 以 Stream 的形式列出目录, 跳过 `.` 和 `..`, 出错后结束
    pub async fn iter_directory(
        &self,
        path: &str,
    ) -> AdbResult<impl Stream<Item = AdbResult<FileStatistics>>> {
        let mut socket = self.open().await?;
        socket.send_sync_request(SyncCommand::List, path).await?;
        let path = path.to_string();
        Ok(async_stream::try_stream! {
            loop {
                let command = socket.read_sync_command().await?;
                if command != SyncCommand::Dent {
                    end_of_listing(&mut socket, command, &path, "DENT or DONE").await?;
                    break;
                }
                let mut record = [0u8; STAT_V1_RECORD_SIZE];
                socket.read_exact(&mut record).await?;
                let name = socket.read_sync_string(MAX_PATH_LENGTH).await?;
                if transfer::is_dot_entry(&name) {
                    continue;
                }
                yield FileStatistics::from_bytes(&record, name)?;
            }
        })
    }

    pub async fn list(&self, path: &str) -> AdbResult<Vec<FileStatistics>> {
        let entries = self.iter_directory(path).await?;
        pin_mut!(entries);
        let mut result = vec![];
        while let Some(entry) = entries.next().await {
            result.push(entry?);
        }
        Ok(result)
    }

    pub async fn iter_directory_v2(
        &self,
        path: &str,
    ) -> AdbResult<impl Stream<Item = AdbResult<FileStatisticsV2>>> {
        let mut socket = self.open().await?;
        socket.send_sync_request(SyncCommand::List2, path).await?;
        let path = path.to_string();
        Ok(async_stream::try_stream! {
            loop {
                let command = socket.read_sync_command().await?;
                if command != SyncCommand::Dent2 {
                    end_of_listing(&mut socket, command, &path, "DNT2 or DONE").await?;
                    break;
                }
                let mut record = [0u8; STAT_V2_RECORD_SIZE];
                socket.read_exact(&mut record).await?;
                let name = socket.read_sync_string(MAX_PATH_LENGTH).await?;
                if transfer::is_dot_entry(&name) {
                    continue;
                }
                yield FileStatisticsV2::from_bytes(&record, name)?;
            }
        })
    }

    pub async fn list_v2(&self, path: &str) -> AdbResult<Vec<FileStatisticsV2>> {
        let entries = self.iter_directory_v2(path).await?;
        pin_mut!(entries);
        let mut result = vec![];
        while let Some(entry) = entries.next().await {
            result.push(entry?);
        }
        Ok(result)
    }

    /// 下载远程文件到 `writer`, 返回写入的字节数
    pub async fn pull<W: AsyncWrite + Unpin + Send>(
        &self,
        remote: &str,
        writer: &mut W,
        mut options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        let mut socket = self.open().await?;
        let stat = stat_on(&mut socket, remote).await?;
        options.set_total_if_unknown(stat.size as u64);
        info!("Pulling {:#?} ({} bytes)", remote, stat.size);

        socket.send_sync_request(SyncCommand::Recv, remote).await?;
        let mut buffer = vec![0u8; MAX_CHUNK_SIZE];
        let mut received: u64 = 0;
        loop {
            if options.is_cancelled() {
                info!("Pull {:#?} cancelled after {} bytes", remote, received);
                return Err(AdbError::cancelled(format!("pull {}", remote)));
            }
            let (command, length) = socket.read_sync_header().await?;
            match command {
                SyncCommand::Data => {
                    let length = transfer::check_chunk_length(length, MAX_CHUNK_SIZE)?;
                    socket.read_exact(&mut buffer[..length]).await?;
                    if let Err(e) = writer.write_all(&buffer[..length]).await {
                        error!("Write local data of {:#?} failed: {}", remote, e);
                        return Err(e.into());
                    }
                    received += length as u64;
                    options.report(received);
                }
                SyncCommand::Done => break,
                SyncCommand::Fail => {
                    let length = sync_codec::check_string_length(length, MAX_CHUNK_SIZE)?;
                    let message = socket.read_string(length).await?;
                    return Err(AdbError::sync_failed(remote, message));
                }
                other => return Err(transfer::unexpected_command(other, "DATA, DONE or FAIL")),
            }
        }
        writer.flush().await?;
        Ok(received)
    }

    /// 上传 `reader` 的内容到 `remote`。
    ///
    /// # 参数
    /// - `mode`: 文件权限, 以十进制写入 SEND 参数。
    /// - `mtime`: 修改时间(秒), 放在 DONE 帧中。
    ///
    /// # 返回值
    /// 发送的字节数
    pub async fn push<R: AsyncRead + Unpin + Send>(
        &self,
        reader: &mut R,
        remote: &str,
        mode: u32,
        mtime: u32,
        mut options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        sync_codec::check_path_length(remote)?;
        let mut socket = self.open().await?;
        info!("Pushing to {:#?} with mode {:o}", remote, mode);
        socket
            .send_sync_request(SyncCommand::Send, &sync_codec::send_argument(remote, mode))
            .await?;

        let mut buffer = vec![0u8; self.max_chunk_size];
        let mut sent: u64 = 0;
        loop {
            if options.is_cancelled() {
                info!("Push {:#?} cancelled after {} bytes", remote, sent);
                return Err(AdbError::cancelled(format!("push {}", remote)));
            }
            let size = match reader.read(&mut buffer).await {
                Ok(size) => size,
                Err(e) => {
                    error!("Read local data for {:#?} failed: {}", remote, e);
                    return Err(e.into());
                }
            };
            if size == 0 {
                break;
            }
            socket.send_sync_data(&buffer[..size]).await?;
            sent += size as u64;
            options.report(sent);
        }

        socket.send_sync_header(SyncCommand::Done, mtime).await?;
        let (command, length) = socket.read_sync_header().await?;
        match command {
            SyncCommand::Okay => Ok(sent),
            SyncCommand::Fail => {
                let length = sync_codec::check_string_length(length, MAX_CHUNK_SIZE)?;
                let message = socket.read_string(length).await?;
                Err(AdbError::sync_failed(remote, message))
            }
            other => Err(transfer::unexpected_command(other, "OKAY or FAIL")),
        }
    }

    pub async fn push_file<P: AsRef<Path>>(
        &self,
        local: P,
        remote: &str,
        mut options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        let local = local.as_ref();
        let mut file = tokio::fs::File::open(local)
            .await
            .with_adb_context(|| format!("open {}", local.display()))?;
        let metadata = file.metadata().await?;
        options.set_total_if_unknown(metadata.len());
        let mtime = transfer::modified_seconds(metadata.modified());
        self.push(&mut file, remote, DEFAULT_FILE_MODE, mtime, options)
            .await
    }

    pub async fn pull_file<P: AsRef<Path>>(
        &self,
        remote: &str,
        local: P,
        options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        let local = local.as_ref();
        let mut file = tokio::fs::File::create(local)
            .await
            .with_adb_context(|| format!("create {}", local.display()))?;
        self.pull(remote, &mut file, options).await
    }

    pub async fn read_text(&self, remote: &str) -> AdbResult<String> {
        let mut content = Vec::new();
        self.pull(remote, &mut content, TransferOptions::new()).await?;
        Ok(String::from_utf8_lossy(&content).to_string())
    }
}
