use commitstore_journal::frame::{FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE};
use commitstore_journal::{FrameKind, JournalError, JournalReader, JournalWriter, ReadMode, WriteOptions};
use serde_json::{json, Value};
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use tempfile::TempDir;

fn write_two(path: &std::path::Path) -> u64 {
    let mut writer = JournalWriter::open(path, WriteOptions::default()).unwrap();
    writer.append_record(&json!({"n": 1})).unwrap();
    writer.append_record(&json!({"n": 2})).unwrap();
    writer.finish().unwrap();

    let mut reader = JournalReader::open(path, ReadMode::Strict).unwrap();
    reader.read_record::<Value>().unwrap().unwrap();
    reader.position()
}

#[test]
fn test_payload_size_limit() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tables.csj");

    let oversized = vec![b' '; MAX_PAYLOAD_SIZE as usize + 1];
    let mut writer = JournalWriter::open(&path, WriteOptions::default()).unwrap();
    match writer.append_raw(FrameKind::Record, &oversized) {
        Err(JournalError::PayloadTooLarge { size, max }) => {
            assert_eq!(size, MAX_PAYLOAD_SIZE as usize + 1);
            assert_eq!(max, MAX_PAYLOAD_SIZE);
        }
        other => panic!("expected PayloadTooLarge, got {:?}", other.err()),
    }
}

#[test]
fn test_truncated_tail() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tables.csj");
    let first_end = write_two(&path);

    let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(first_end + 5).unwrap();
    drop(file);

    {
        let mut reader = JournalReader::open(&path, ReadMode::Strict).unwrap();
        assert!(reader.read_record::<Value>().unwrap().is_some());
        assert!(matches!(
            reader.read_record::<Value>(),
            Err(JournalError::TruncatedFrame { .. })
        ));
    }

    {
        let mut reader = JournalReader::open(&path, ReadMode::Permissive).unwrap();
        assert_eq!(reader.read_record::<Value>().unwrap(), Some(json!({"n": 1})));
        assert!(reader.read_record::<Value>().unwrap().is_none());
        assert_eq!(reader.position(), first_end);
    }
}

#[test]
fn test_checksum_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tables.csj");
    let first_end = write_two(&path);

    // Flip a byte inside the second payload.
    let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(first_end + FRAME_HEADER_SIZE as u64 + 1))
        .unwrap();
    file.write_all(b"X").unwrap();
    drop(file);

    let mut strict = JournalReader::open(&path, ReadMode::Strict).unwrap();
    strict.read_record::<Value>().unwrap();
    match strict.read_record::<Value>() {
        Err(JournalError::InvalidFrame { offset, reason }) => {
            assert_eq!(offset, first_end);
            assert!(reason.contains("checksum"));
        }
        other => panic!("expected checksum failure, got {:?}", other),
    }

    let mut permissive = JournalReader::open(&path, ReadMode::Permissive).unwrap();
    permissive.read_record::<Value>().unwrap();
    assert!(permissive.read_record::<Value>().unwrap().is_none());
}

#[test]
fn test_reserved_frame_bytes_must_be_zero() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tables.csj");
    write_two(&path);

    let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(16 + 1)).unwrap();
    file.write_all(&[0x01]).unwrap();
    drop(file);

    // Structural damage is an error in both modes.
    let mut reader = JournalReader::open(&path, ReadMode::Permissive).unwrap();
    assert!(matches!(
        reader.read_frame(),
        Err(JournalError::InvalidFrame { offset: 16, .. })
    ));
}

#[test]
fn test_unknown_frame_kind_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tables.csj");

    {
        let mut writer = JournalWriter::open(&path, WriteOptions::default()).unwrap();
        writer.append_raw(FrameKind::Unknown(0x7F), b"future").unwrap();
        writer.append_record(&json!({"n": 1})).unwrap();
        writer.finish().unwrap();
    }

    let mut reader = JournalReader::open(&path, ReadMode::Strict).unwrap();
    assert_eq!(reader.read_record::<Value>().unwrap(), Some(json!({"n": 1})));
    assert!(reader.read_record::<Value>().unwrap().is_none());
}
