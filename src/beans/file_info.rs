use crate::errors::{AdbError, AdbResult};
use chrono::{DateTime, Utc};

/// V1 stat/dent 记录长度 `{mode, size, time}`
pub const STAT_V1_RECORD_SIZE: usize = 12;
/// V2 stat 记录长度 (不含4字节命令id)
pub const STAT_V2_RECORD_SIZE: usize = 68;

pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;

/// push 时未指定权限使用的默认值 rw-rw-rw-
pub const DEFAULT_FILE_MODE: u32 = 0o666;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnixFileType {
    Socket,
    Symlink,
    Regular,
    BlockDevice,
    Directory,
    CharDevice,
    Fifo,
    Unknown,
}

impl UnixFileType {
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFSOCK => UnixFileType::Socket,
            S_IFLNK => UnixFileType::Symlink,
            S_IFREG => UnixFileType::Regular,
            S_IFBLK => UnixFileType::BlockDevice,
            S_IFDIR => UnixFileType::Directory,
            S_IFCHR => UnixFileType::CharDevice,
            S_IFIFO => UnixFileType::Fifo,
            _ => UnixFileType::Unknown,
        }
    }
}

/// 按字段顺序读取小端整数
struct FieldReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        buf
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take())
    }
}

fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
}

/// STAT / DENT 返回的文件信息 (32位字段)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatistics {
    pub path: String,
    pub mode: u32,
    pub size: u32,
    pub mtime: u32,
}

impl FileStatistics {
    pub fn new<T: Into<String>>(path: T, mode: u32, size: u32, mtime: u32) -> Self {
        Self {
            path: path.into(),
            mode,
            size,
            mtime,
        }
    }

    /// 从12字节记录解析文件信息。
    ///
    /// # 参数
    /// - `data`: 至少12字节的小端记录 `{mode, size, time}`。
    /// - `path`: 记录对应的路径或文件名。
    ///
    /// # 返回值
    /// 解析后的 `FileStatistics`, 数据长度不足时返回协议错误。
    pub fn from_bytes<T: Into<String>>(data: &[u8], path: T) -> AdbResult<Self> {
        if data.len() < STAT_V1_RECORD_SIZE {
            return Err(AdbError::protocol_error(format!(
                "stat record too short: {} bytes",
                data.len()
            )));
        }
        let mut reader = FieldReader::new(data);
        let mode = reader.u32();
        let size = reader.u32();
        let mtime = reader.u32();
        Ok(Self::new(path, mode, size, mtime))
    }

    pub fn to_bytes(&self) -> [u8; STAT_V1_RECORD_SIZE] {
        let mut buf = [0u8; STAT_V1_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.mode.to_le_bytes());
        buf[4..8].copy_from_slice(&self.size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.mtime.to_le_bytes());
        buf
    }

    /// 设备对不存在的文件返回全零记录
    pub fn is_empty(&self) -> bool {
        self.mode == 0 && self.size == 0 && self.mtime == 0
    }

    pub fn file_type(&self) -> UnixFileType {
        UnixFileType::from_mode(self.mode)
    }

    pub fn is_directory(&self) -> bool {
        self.file_type() == UnixFileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == UnixFileType::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == UnixFileType::Symlink
    }

    /// 权限位 (去掉文件类型)
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        timestamp(self.mtime as i64)
    }
}

/// STA2 / DNT2 返回的扩展文件信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatisticsV2 {
    pub path: String,
    pub error: u32,
    pub device: u64,
    pub inode: u64,
    pub mode: u32,
    pub link_count: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub access_time: i64,
    pub modified_time: i64,
    pub changed_time: i64,
}

impl FileStatisticsV2 {
    /// 从68字节记录解析, 字段顺序严格按照线上布局:
    /// `error, dev, ino, mode, nlink, uid, gid, size, atime, mtime, ctime`
    pub fn from_bytes<T: Into<String>>(data: &[u8], path: T) -> AdbResult<Self> {
        if data.len() < STAT_V2_RECORD_SIZE {
            return Err(AdbError::protocol_error(format!(
                "stat v2 record too short: {} bytes",
                data.len()
            )));
        }
        let mut reader = FieldReader::new(data);
        Ok(Self {
            path: path.into(),
            error: reader.u32(),
            device: reader.u64(),
            inode: reader.u64(),
            mode: reader.u32(),
            link_count: reader.u32(),
            uid: reader.u32(),
            gid: reader.u32(),
            size: reader.u64(),
            access_time: reader.i64(),
            modified_time: reader.i64(),
            changed_time: reader.i64(),
        })
    }

    pub fn to_bytes(&self) -> [u8; STAT_V2_RECORD_SIZE] {
        let mut buf = Vec::with_capacity(STAT_V2_RECORD_SIZE);
        buf.extend_from_slice(&self.error.to_le_bytes());
        buf.extend_from_slice(&self.device.to_le_bytes());
        buf.extend_from_slice(&self.inode.to_le_bytes());
        buf.extend_from_slice(&self.mode.to_le_bytes());
        buf.extend_from_slice(&self.link_count.to_le_bytes());
        buf.extend_from_slice(&self.uid.to_le_bytes());
        buf.extend_from_slice(&self.gid.to_le_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.access_time.to_le_bytes());
        buf.extend_from_slice(&self.modified_time.to_le_bytes());
        buf.extend_from_slice(&self.changed_time.to_le_bytes());
        let mut record = [0u8; STAT_V2_RECORD_SIZE];
        record.copy_from_slice(&buf);
        record
    }

    pub fn file_type(&self) -> UnixFileType {
        UnixFileType::from_mode(self.mode)
    }

    pub fn is_directory(&self) -> bool {
        self.file_type() == UnixFileType::Directory
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        timestamp(self.modified_time)
    }
}
