use crate::beans::file_info::{STAT_V1_RECORD_SIZE, STAT_V2_RECORD_SIZE};
use crate::beans::{FileStatistics, FileStatisticsV2, DEFAULT_FILE_MODE};
use crate::client::blocking::adb_device::AdbDevice;
use crate::client::transfer::{self, TransferOptions};
use crate::connections::SocketFactory;
use crate::errors::{AdbError, AdbResult, AdbResultExt};
use crate::protocols::blocking::AdbProtocol;
use crate::protocols::sync_codec::{self, SyncCommand, MAX_CHUNK_SIZE, MAX_PATH_LENGTH};
use log::{error, info};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

enum DirectoryFrame<T> {
    Entry(T),
    Done,
}

fn stat_on<S: AdbProtocol>(socket: &mut S, path: &str) -> AdbResult<FileStatistics> {
    socket.send_sync_request(SyncCommand::Stat, path)?;
    let command = socket.read_sync_command()?;
    if command != SyncCommand::Stat {
        return Err(transfer::unexpected_command(command, "STAT"));
    }
    let mut record = [0u8; STAT_V1_RECORD_SIZE];
    socket.read_exact(&mut record)?;
    transfer::stat_result(FileStatistics::from_bytes(&record, path)?)
}

fn read_dent<S: AdbProtocol>(socket: &mut S, path: &str) -> AdbResult<DirectoryFrame<FileStatistics>> {
    match socket.read_sync_command()? {
        SyncCommand::Dent => {
            let mut record = [0u8; STAT_V1_RECORD_SIZE];
            socket.read_exact(&mut record)?;
            let name = socket.read_sync_string(MAX_PATH_LENGTH)?;
            Ok(DirectoryFrame::Entry(FileStatistics::from_bytes(&record, name)?))
        }
        SyncCommand::Done => Ok(DirectoryFrame::Done),
        SyncCommand::Fail => {
            let message = socket.read_sync_string(MAX_CHUNK_SIZE)?;
            Err(AdbError::sync_failed(path, message))
        }
        other => Err(transfer::unexpected_command(other, "DENT or DONE")),
    }
}

fn read_dent_v2<S: AdbProtocol>(
    socket: &mut S,
    path: &str,
) -> AdbResult<DirectoryFrame<FileStatisticsV2>> {
    match socket.read_sync_command()? {
        SyncCommand::Dent2 => {
            let mut record = [0u8; STAT_V2_RECORD_SIZE];
            socket.read_exact(&mut record)?;
            let name = socket.read_sync_string(MAX_PATH_LENGTH)?;
            Ok(DirectoryFrame::Entry(FileStatisticsV2::from_bytes(&record, name)?))
        }
        SyncCommand::Done => Ok(DirectoryFrame::Done),
        SyncCommand::Fail => {
            let message = socket.read_sync_string(MAX_CHUNK_SIZE)?;
            Err(AdbError::sync_failed(path, message))
        }
        other => Err(transfer::unexpected_command(other, "DNT2 or DONE")),
    }
}

/// 目录迭代: 跳过 `.` 和 `..`, 出错后结束
fn directory_iter<S, T, R>(
    mut socket: S,
    path: String,
    read: R,
) -> impl Iterator<Item = AdbResult<T>>
where
    S: AdbProtocol,
    R: Fn(&mut S, &str) -> AdbResult<DirectoryFrame<T>>,
    T: HasName,
{
    let mut done = false;
    std::iter::from_fn(move || {
        while !done {
            match read(&mut socket, &path) {
                Ok(DirectoryFrame::Entry(entry)) => {
                    if transfer::is_dot_entry(entry.name()) {
                        continue;
                    }
                    return Some(Ok(entry));
                }
                Ok(DirectoryFrame::Done) => done = true,
                Err(e) => {
                    done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    })
}

trait HasName {
    fn name(&self) -> &str;
}

impl HasName for FileStatistics {
    fn name(&self) -> &str {
        &self.path
    }
}

impl HasName for FileStatisticsV2 {
    fn name(&self) -> &str {
        &self.path
    }
}

/// sync 模式下的文件操作。每个操作独占一个新连接。
pub struct SyncService<'a, F: SocketFactory> {
    device: &'a AdbDevice<F>,
    max_chunk_size: usize,
}

impl<'a, F: SocketFactory> SyncService<'a, F> {
    pub fn new(device: &'a AdbDevice<F>) -> Self {
        Self {
            device,
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }

    /// push 时每个 DATA 帧的大小, 不超过 64KiB
    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = transfer::clamp_chunk_size(size);
        self
    }

    /// 建立连接, 切换设备并进入 sync 模式
    fn open(&self) -> AdbResult<F::Socket> {
        let mut socket = self.device.open_transport()?;
        socket.send_cmd_then_check_okay("sync:")?;
        Ok(socket)
    }

    /// 查询远程文件信息, 文件不存在时返回 `FileNotFound`
    pub fn stat(&self, path: &str) -> AdbResult<FileStatistics> {
        let mut socket = self.open()?;
        stat_on(&mut socket, path)
    }

    pub fn stat_v2(&self, path: &str) -> AdbResult<FileStatisticsV2> {
        let mut socket = self.open()?;
        socket.send_sync_request(SyncCommand::Stat2, path)?;
        let command = socket.read_sync_command()?;
        if command != SyncCommand::Stat2 {
            return Err(transfer::unexpected_command(command, "STA2"));
        }
        let mut record = [0u8; STAT_V2_RECORD_SIZE];
        socket.read_exact(&mut record)?;
        transfer::stat_v2_result(FileStatisticsV2::from_bytes(&record, path)?)
    }

    pub fn exists(&self, path: &str) -> AdbResult<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(AdbError::FileNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 惰性列出目录, 迭代器持有连接, 只能消费一次。
    ///
    /// # 参数
    /// - `path`: 远程目录。
    ///
    /// # 返回值
    /// 按设备返回顺序产生的目录项, 不包含 `.` 和 `..`。
    pub fn iter_directory(
        &self,
        path: &str,
    ) -> AdbResult<impl Iterator<Item = AdbResult<FileStatistics>>> {
        let mut socket = self.open()?;
        socket.send_sync_request(SyncCommand::List, path)?;
        Ok(directory_iter(socket, path.to_string(), read_dent::<F::Socket>))
    }

    pub fn list(&self, path: &str) -> AdbResult<Vec<FileStatistics>> {
        self.iter_directory(path)?.collect()
    }

    pub fn iter_directory_v2(
        &self,
        path: &str,
    ) -> AdbResult<impl Iterator<Item = AdbResult<FileStatisticsV2>>> {
        let mut socket = self.open()?;
        socket.send_sync_request(SyncCommand::List2, path)?;
        Ok(directory_iter(socket, path.to_string(), read_dent_v2::<F::Socket>))
    }

    pub fn list_v2(&self, path: &str) -> AdbResult<Vec<FileStatisticsV2>> {
        self.iter_directory_v2(path)?.collect()
    }

    /// 下载远程文件到 `writer`。
    ///
    /// 先在同一连接上 STAT 得到总大小, 再 RECV; 每个 DATA 帧之后回调进度,
    /// 帧之间检查取消标记。
    ///
    /// # 返回值
    /// 写入的字节数
    pub fn pull<W: Write>(
        &self,
        remote: &str,
        writer: &mut W,
        mut options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        let mut socket = self.open()?;
        let stat = stat_on(&mut socket, remote)?;
        options.set_total_if_unknown(stat.size as u64);
        info!("Pulling {:#?} ({} bytes)", remote, stat.size);

        socket.send_sync_request(SyncCommand::Recv, remote)?;
        let mut buffer = vec![0u8; MAX_CHUNK_SIZE];
        let mut received: u64 = 0;
        loop {
            if options.is_cancelled() {
                info!("Pull {:#?} cancelled after {} bytes", remote, received);
                return Err(AdbError::cancelled(format!("pull {}", remote)));
            }
            let (command, length) = socket.read_sync_header()?;
            match command {
                SyncCommand::Data => {
                    let length = transfer::check_chunk_length(length, MAX_CHUNK_SIZE)?;
                    socket.read_exact(&mut buffer[..length])?;
                    if let Err(e) = writer.write_all(&buffer[..length]) {
                        error!("Write local data of {:#?} failed: {}", remote, e);
                        return Err(e.into());
                    }
                    received += length as u64;
                    options.report(received);
                }
                SyncCommand::Done => break,
                SyncCommand::Fail => {
                    let length = sync_codec::check_string_length(length, MAX_CHUNK_SIZE)?;
                    let message = socket.read_string(length)?;
                    return Err(AdbError::sync_failed(remote, message));
                }
                other => return Err(transfer::unexpected_command(other, "DATA, DONE or FAIL")),
            }
        }
        writer.flush()?;
        Ok(received)
    }

    /// 上传 `reader` 的内容。
    ///
    /// # 参数
    /// - `reader`: 数据来源, 读到末尾为止。
    /// - `remote`: 远程路径, 不超过1024字节。
    /// - `mode`: 文件权限, 以十进制写入 SEND 参数。
    /// - `mtime`: 修改时间(秒), 放在 DONE 帧中。
    /// - `options`: 进度回调、取消标记和总大小。
    ///
    /// # 返回值
    /// 发送的字节数
    pub fn push<R: Read>(
        &self,
        reader: &mut R,
        remote: &str,
        mode: u32,
        mtime: u32,
        mut options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        sync_codec::check_path_length(remote)?;
        let mut socket = self.open()?;
        info!("Pushing to {:#?} with mode {:o}", remote, mode);
        socket.send_sync_request(SyncCommand::Send, &sync_codec::send_argument(remote, mode))?;

        let mut buffer = vec![0u8; self.max_chunk_size];
        let mut sent: u64 = 0;
        loop {
            if options.is_cancelled() {
                info!("Push {:#?} cancelled after {} bytes", remote, sent);
                return Err(AdbError::cancelled(format!("push {}", remote)));
            }
            let size = match reader.read(&mut buffer) {
                Ok(size) => size,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Read local data for {:#?} failed: {}", remote, e);
                    return Err(e.into());
                }
            };
            if size == 0 {
                break;
            }
            socket.send_sync_data(&buffer[..size])?;
            sent += size as u64;
            options.report(sent);
        }

        socket.send_sync_header(SyncCommand::Done, mtime)?;
        let (command, length) = socket.read_sync_header()?;
        match command {
            SyncCommand::Okay => Ok(sent),
            SyncCommand::Fail => {
                let length = sync_codec::check_string_length(length, MAX_CHUNK_SIZE)?;
                let message = socket.read_string(length)?;
                Err(AdbError::sync_failed(remote, message))
            }
            other => Err(transfer::unexpected_command(other, "OKAY or FAIL")),
        }
    }

    /// 上传本地文件, 权限 0o666, 修改时间取本地文件
    pub fn push_file<P: AsRef<Path>>(
        &self,
        local: P,
        remote: &str,
        mut options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        let local = local.as_ref();
        let mut file = File::open(local).with_adb_context(|| format!("open {}", local.display()))?;
        let metadata = file.metadata()?;
        options.set_total_if_unknown(metadata.len());
        let mtime = transfer::modified_seconds(metadata.modified());
        self.push(&mut file, remote, DEFAULT_FILE_MODE, mtime, options)
    }

    pub fn pull_file<P: AsRef<Path>>(
        &self,
        remote: &str,
        local: P,
        options: TransferOptions<'_>,
    ) -> AdbResult<u64> {
        let local = local.as_ref();
        let mut file =
            File::create(local).with_adb_context(|| format!("create {}", local.display()))?;
        self.pull(remote, &mut file, options)
    }

    pub fn read_text(&self, remote: &str) -> AdbResult<String> {
        let mut content = Vec::new();
        self.pull(remote, &mut content, TransferOptions::new())?;
        Ok(String::from_utf8_lossy(&content).to_string())
    }
}
