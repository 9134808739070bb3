//! 测试用的脚本化 adb server: 每个连接按顺序取出一段预设的响应字节,
//! 客户端写入的内容按连接保存, 用于检查发出的帧。
#![allow(dead_code)]

use droidsync::beans::{AdbDeviceInfo, DeviceState, FileStatistics};
use droidsync::errors::{AdbError, AdbResult};
use std::collections::VecDeque;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SERIAL: &str = "emulator-5554";
pub const TRANSPORT_REQUEST: &[u8] = b"001chost:transport:emulator-5554";

pub struct MockSocket {
    input: Cursor<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl Read for MockSocket {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockSocket {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.output.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "tokio_async")]
mod async_io {
    use super::MockSocket;
    use std::io::Read;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    impl AsyncRead for MockSocket {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            match self.input.read(buf.initialize_unfilled()) {
                Ok(n) => {
                    buf.advance(n);
                    Poll::Ready(Ok(()))
                }
                Err(e) => Poll::Ready(Err(e)),
            }
        }
    }

    impl AsyncWrite for MockSocket {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.output.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}

/// 每次 connect 取出下一段响应; 响应用完后连接失败
#[derive(Default)]
pub struct MockFactory {
    responses: Mutex<VecDeque<Vec<u8>>>,
    outputs: Mutex<Vec<Arc<Mutex<Vec<u8>>>>>,
    connects: AtomicUsize,
}

impl MockFactory {
    pub fn new(responses: Vec<Vec<u8>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// 按连接顺序返回客户端写入的字节
    pub fn outputs(&self) -> Vec<Vec<u8>> {
        self.outputs
            .lock()
            .unwrap()
            .iter()
            .map(|output| output.lock().unwrap().clone())
            .collect()
    }

    pub fn outputs_text(&self) -> Vec<String> {
        self.outputs()
            .iter()
            .map(|output| String::from_utf8_lossy(output).to_string())
            .collect()
    }

    fn open(&self) -> AdbResult<MockSocket> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let input = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AdbError::connection_failed("no scripted response left"))?;
        let output = Arc::new(Mutex::new(vec![]));
        self.outputs.lock().unwrap().push(output.clone());
        Ok(MockSocket {
            input: Cursor::new(input),
            output,
        })
    }
}

#[cfg(feature = "blocking")]
impl droidsync::connections::SocketFactory for MockFactory {
    type Socket = MockSocket;

    fn connect(&self) -> AdbResult<MockSocket> {
        self.open()
    }
}

#[cfg(feature = "tokio_async")]
#[async_trait::async_trait]
impl droidsync::connections::AsyncSocketFactory for MockFactory {
    type Socket = MockSocket;

    async fn connect_async(&self) -> AdbResult<MockSocket> {
        self.open()
    }
}

pub fn online_device() -> AdbDeviceInfo {
    AdbDeviceInfo::new(SERIAL, DeviceState::Online)
}

pub fn offline_device() -> AdbDeviceInfo {
    AdbDeviceInfo::new(SERIAL, DeviceState::Offline)
}

/// host 请求的成功响应: OKAY + `%04x` 长度 + 内容
pub fn host_reply(payload: &str) -> Vec<u8> {
    let mut reply = b"OKAY".to_vec();
    reply.extend_from_slice(format!("{:04x}", payload.len()).as_bytes());
    reply.extend_from_slice(payload.as_bytes());
    reply
}

/// transport 与 `shell:` 都成功, 然后输出 `output` 并关闭
pub fn shell_reply(output: &str) -> Vec<u8> {
    let mut reply = b"OKAYOKAY".to_vec();
    reply.extend_from_slice(output.as_bytes());
    reply
}

/// transport 与 `sync:` 都成功, 之后是 sync 帧
pub fn sync_reply(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut reply = b"OKAYOKAY".to_vec();
    for frame in frames {
        reply.extend_from_slice(frame);
    }
    reply
}

pub fn frame(id: &[u8; 4], value: u32) -> Vec<u8> {
    let mut frame = id.to_vec();
    frame.extend_from_slice(&value.to_le_bytes());
    frame
}

pub fn frame_with_payload(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut frame = frame(id, payload.len() as u32);
    frame.extend_from_slice(payload);
    frame
}

pub fn stat_frame(mode: u32, size: u32, mtime: u32) -> Vec<u8> {
    let mut frame = b"STAT".to_vec();
    frame.extend_from_slice(&FileStatistics::new("", mode, size, mtime).to_bytes());
    frame
}

pub fn dent_frame(name: &str, mode: u32, size: u32, mtime: u32) -> Vec<u8> {
    let mut frame = b"DENT".to_vec();
    frame.extend_from_slice(&FileStatistics::new(name, mode, size, mtime).to_bytes());
    frame.extend_from_slice(&(name.len() as u32).to_le_bytes());
    frame.extend_from_slice(name.as_bytes());
    frame
}

/// 按 `chunk` 大小切分的 DATA 帧序列
pub fn data_frames(content: &[u8], chunk: usize) -> Vec<Vec<u8>> {
    content
        .chunks(chunk)
        .map(|part| frame_with_payload(b"DATA", part))
        .collect()
}

pub fn pull_reply(content: &[u8], mode: u32) -> Vec<u8> {
    let mut frames = vec![stat_frame(mode, content.len() as u32, 1_700_000_000)];
    frames.extend(data_frames(content, 64 * 1024));
    frames.push(frame(b"DONE", 0));
    sync_reply(&frames)
}

pub fn push_reply() -> Vec<u8> {
    sync_reply(&[frame(b"OKAY", 0)])
}

pub fn push_fail_reply(message: &str) -> Vec<u8> {
    sync_reply(&[frame_with_payload(b"FAIL", message.as_bytes())])
}

/// 解析 push 连接写出的字节: 返回 SEND 参数、DATA 块大小、上传内容和 DONE 中的 mtime
pub struct PushFrames {
    pub argument: String,
    pub chunk_sizes: Vec<usize>,
    pub content: Vec<u8>,
    pub mtime: Option<u32>,
}

pub fn parse_push_output(output: &[u8]) -> PushFrames {
    let header = TRANSPORT_REQUEST.len() + b"0005sync:".len();
    assert_eq!(&output[..TRANSPORT_REQUEST.len()], TRANSPORT_REQUEST);
    let mut rest = &output[header..];
    let mut frames = PushFrames {
        argument: String::new(),
        chunk_sizes: vec![],
        content: vec![],
        mtime: None,
    };
    while rest.len() >= 8 {
        let id = &rest[..4];
        let value = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
        rest = &rest[8..];
        match id {
            b"SEND" => {
                frames.argument = String::from_utf8_lossy(&rest[..value as usize]).to_string();
                rest = &rest[value as usize..];
            }
            b"DATA" => {
                frames.chunk_sizes.push(value as usize);
                frames.content.extend_from_slice(&rest[..value as usize]);
                rest = &rest[value as usize..];
            }
            b"DONE" => frames.mtime = Some(value),
            other => panic!("unexpected frame {:?}", String::from_utf8_lossy(other)),
        }
    }
    frames
}

pub fn patterned_bytes(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}
