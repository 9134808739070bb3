#[cfg(feature = "blocking")]
mod common;

#[cfg(feature = "blocking")]
mod test_sync {
    use super::common::*;
    use droidsync::beans::FileStatisticsV2;
    use droidsync::client::blocking::AdbDevice;
    use droidsync::errors::AdbError;
    use droidsync::{SyncProgress, TransferOptions};
    use std::io::{Cursor, Write};
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    fn device(responses: Vec<Vec<u8>>) -> (AdbDevice<MockFactory>, Arc<MockFactory>) {
        let factory = Arc::new(MockFactory::new(responses));
        (AdbDevice::new(online_device(), factory.clone()), factory)
    }

    #[test]
    fn test_stat_regular_file() {
        let (device, factory) = device(vec![sync_reply(&[stat_frame(0o100644, 10, 5)])]);
        let stat = device.stat("/sdcard/a.txt").unwrap();
        assert_eq!(stat.path, "/sdcard/a.txt");
        assert_eq!(stat.size, 10);
        assert_eq!(stat.mtime, 5);
        assert!(stat.is_file());
        assert_eq!(stat.permissions(), 0o644);

        let mut expected = TRANSPORT_REQUEST.to_vec();
        expected.extend_from_slice(b"0005sync:");
        expected.extend_from_slice(&frame_with_payload(b"STAT", b"/sdcard/a.txt"));
        assert_eq!(factory.outputs()[0], expected);
    }

    #[test]
    fn test_stat_missing_file() {
        let (device, _) = device(vec![
            sync_reply(&[stat_frame(0, 0, 0)]),
            sync_reply(&[stat_frame(0, 0, 0)]),
        ]);
        assert!(matches!(
            device.stat("/sdcard/missing"),
            Err(AdbError::FileNotFound { ref path }) if path == "/sdcard/missing"
        ));
        assert!(!device.exists("/sdcard/missing").unwrap());
    }

    #[test]
    fn test_stat_v2_errno() {
        let mut record = FileStatisticsV2::from_bytes(&[0u8; 68], "").unwrap();
        record.mode = 0o040755;
        let mut ok = b"STA2".to_vec();
        ok.extend_from_slice(&record.to_bytes());
        record.error = 13;
        let mut denied = b"STA2".to_vec();
        denied.extend_from_slice(&record.to_bytes());

        let (device, _) = device(vec![sync_reply(&[ok]), sync_reply(&[denied])]);
        assert!(device.sync().stat_v2("/data").unwrap().is_directory());
        assert!(matches!(
            device.sync().stat_v2("/data/data"),
            Err(AdbError::SyncFailed { .. })
        ));
    }

    #[test]
    fn test_list_skips_dot_entries() {
        let (device, factory) = device(vec![sync_reply(&[
            dent_frame(".", 0o040755, 0, 0),
            dent_frame("..", 0o040755, 0, 0),
            dent_frame("b.txt", 0o100644, 3, 0),
            dent_frame("a", 0o040755, 0, 0),
            frame(b"DONE", 0),
        ])]);
        let entries = device.list("/sdcard").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a"]);
        assert!(entries[1].is_directory());
        assert!(factory.outputs_text()[0].ends_with("LIST\x07\0\0\0/sdcard"));
    }

    #[test]
    fn test_list_failure() {
        let (device, _) = device(vec![sync_reply(&[
            dent_frame("a", 0o100644, 1, 0),
            frame_with_payload(b"FAIL", b"Permission denied"),
        ])]);
        let mut entries = device.sync().iter_directory("/data").unwrap();
        assert_eq!(entries.next().unwrap().unwrap().path, "a");
        match entries.next() {
            Some(Err(AdbError::SyncFailed { message, .. })) => {
                assert_eq!(message, "Permission denied")
            }
            other => panic!("unexpected {:?}", other.map(|r| r.is_ok())),
        }
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_pull_sizes() {
        for size in [0usize, 1, 65536, 65536 * 2 + 7] {
            let content = patterned_bytes(size);
            let (device, factory) = device(vec![pull_reply(&content, 0o100644)]);
            let seen = Arc::new(Mutex::new(Vec::<SyncProgress>::new()));
            let sink = seen.clone();
            let options = TransferOptions::new().with_progress(move |p| sink.lock().unwrap().push(p));
            let mut local = vec![];
            let received = device.sync().pull("/sdcard/blob", &mut local, options).unwrap();
            assert_eq!(received, size as u64);
            assert_eq!(local, content);

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), size.div_ceil(65536));
            assert!(seen.windows(2).all(|w| w[0].received_bytes < w[1].received_bytes));
            if let Some(last) = seen.last() {
                assert_eq!(last.received_bytes, size as u64);
                assert_eq!(last.percentage(), 100.0);
            }
            let text = &factory.outputs_text()[0];
            assert!(text.contains("STAT\x0c\0\0\0/sdcard/blob"));
            assert!(text.ends_with("RECV\x0c\0\0\0/sdcard/blob"));
        }
    }

    #[test]
    fn test_pull_failure_mid_transfer() {
        let (device, _) = device(vec![sync_reply(&[
            stat_frame(0o100644, 20, 0),
            frame_with_payload(b"DATA", b"0123456789"),
            frame_with_payload(b"FAIL", b"I/O error"),
        ])]);
        let mut local = vec![];
        let err = device
            .sync()
            .pull("/sdcard/blob", &mut local, TransferOptions::new())
            .unwrap_err();
        assert!(matches!(err, AdbError::SyncFailed { ref message, .. } if message == "I/O error"));
    }

    #[test]
    fn test_pull_rejects_oversized_chunk() {
        let mut oversized = frame(b"DATA", 65537);
        oversized.extend(vec![0u8; 65537]);
        let (device, _) = device(vec![sync_reply(&[stat_frame(0o100644, 65537, 0), oversized])]);
        let mut local = vec![];
        let err = device
            .sync()
            .pull("/sdcard/blob", &mut local, TransferOptions::new())
            .unwrap_err();
        assert!(matches!(err, AdbError::ProtocolError { .. }));
    }

    #[test]
    fn test_push_sizes() {
        for size in [0usize, 1, 65536, 65536 * 2 + 7] {
            let content = patterned_bytes(size);
            let (device, factory) = device(vec![push_reply()]);
            let seen = Arc::new(Mutex::new(Vec::<SyncProgress>::new()));
            let sink = seen.clone();
            let options = TransferOptions::new()
                .with_total_bytes(size as u64)
                .with_progress(move |p| sink.lock().unwrap().push(p));
            let sent = device
                .sync()
                .push(&mut Cursor::new(content.clone()), "/sdcard/blob", 0o644, 1234, options)
                .unwrap();
            assert_eq!(sent, size as u64);

            let frames = parse_push_output(&factory.outputs()[0]);
            assert_eq!(frames.argument, "/sdcard/blob,420");
            assert_eq!(frames.content, content);
            assert!(frames.chunk_sizes.iter().all(|s| *s > 0 && *s <= 65536));
            assert_eq!(frames.mtime, Some(1234));

            let seen = seen.lock().unwrap();
            let expected: Vec<u64> = (1..=frames.chunk_sizes.len())
                .map(|k| frames.chunk_sizes[..k].iter().sum::<usize>() as u64)
                .collect();
            let reported: Vec<u64> = seen.iter().map(|p| p.received_bytes).collect();
            assert_eq!(reported, expected);
        }
    }

    #[test]
    fn test_push_with_small_chunks() {
        let content = patterned_bytes(2500);
        let (device, factory) = device(vec![push_reply()]);
        device
            .sync()
            .with_max_chunk_size(1000)
            .push(&mut Cursor::new(content.clone()), "/sdcard/blob", 0o600, 0, TransferOptions::new())
            .unwrap();
        let frames = parse_push_output(&factory.outputs()[0]);
        assert_eq!(frames.chunk_sizes, vec![1000, 1000, 500]);
        assert_eq!(frames.argument, "/sdcard/blob,384");
    }

    #[test]
    fn test_push_failure_message() {
        let (device, _) = device(vec![push_fail_reply("couldn't create file: Read-only file system")]);
        let err = device
            .sync()
            .push(&mut Cursor::new(b"abc".to_vec()), "/system/blob", 0o644, 0, TransferOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            AdbError::SyncFailed { ref message, .. } if message == "couldn't create file: Read-only file system"
        ));
    }

    #[test]
    fn test_push_rejects_huge_fail_length() {
        let (device, _) = device(vec![sync_reply(&[frame(b"FAIL", u32::MAX)])]);
        let err = device
            .sync()
            .push(&mut Cursor::new(b"abc".to_vec()), "/sdcard/blob", 0o644, 0, TransferOptions::new())
            .unwrap_err();
        assert!(matches!(err, AdbError::ProtocolError { .. }));
    }

    #[test]
    fn test_list_rejects_long_entry_name() {
        let name = "n".repeat(2000);
        let (device, _) = device(vec![sync_reply(&[dent_frame(&name, 0o100644, 1, 0)])]);
        let err = device.list("/sdcard").unwrap_err();
        assert!(matches!(err, AdbError::ProtocolError { .. }));
    }

    #[test]
    fn test_push_path_too_long() {
        let (device, factory) = device(vec![]);
        let remote = format!("/sdcard/{}", "x".repeat(1100));
        let err = device
            .sync()
            .push(&mut Cursor::new(vec![1u8]), &remote, 0o644, 0, TransferOptions::new())
            .unwrap_err();
        assert!(matches!(err, AdbError::InvalidPath { .. }));
        assert_eq!(factory.connect_count(), 0);
    }

    #[test]
    fn test_push_cancelled() {
        let (device, factory) = device(vec![push_reply()]);
        let cancel = AtomicBool::new(true);
        let err = device
            .sync()
            .push(
                &mut Cursor::new(patterned_bytes(10)),
                "/sdcard/blob",
                0o644,
                0,
                TransferOptions::new().with_cancel(&cancel),
            )
            .unwrap_err();
        assert!(matches!(err, AdbError::Cancelled { .. }));
        let frames = parse_push_output(&factory.outputs()[0]);
        assert!(frames.chunk_sizes.is_empty());
        assert_eq!(frames.mtime, None);
    }

    #[test]
    fn test_push_file_default_mode() {
        let mut local = tempfile::NamedTempFile::new().unwrap();
        local.write_all(b"hello device").unwrap();
        local.flush().unwrap();

        let (device, factory) = device(vec![push_reply()]);
        assert_eq!(device.push(local.path(), "/data/local/tmp/hello.txt").unwrap(), 12);
        let frames = parse_push_output(&factory.outputs()[0]);
        assert_eq!(frames.argument, "/data/local/tmp/hello.txt,438");
        assert_eq!(frames.content, b"hello device");
        assert!(frames.mtime.unwrap() > 0);
    }

    #[test]
    fn test_offline_device_never_connects() {
        let factory = Arc::new(MockFactory::new(vec![]));
        let device = AdbDevice::new(offline_device(), factory.clone());
        assert!(matches!(
            device.stat("/sdcard"),
            Err(AdbError::DeviceOffline { .. })
        ));
        assert!(matches!(
            device.push("/tmp/whatever", "/sdcard/x"),
            Err(AdbError::DeviceOffline { .. }) | Err(AdbError::Io(_))
        ));
        assert_eq!(factory.connect_count(), 0);
    }

    #[test]
    fn test_read_text() {
        let (device, _) = device(vec![pull_reply(b"ro.build.version.sdk=34\n", 0o100644)]);
        assert_eq!(device.read_text("/system/build.prop").unwrap(), "ro.build.version.sdk=34\n");
    }
}
