use logship_tail::{LineSource, ReadOutcome, TailError, TailReader, TailState};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

fn append(path: &Path, data: &str) {
    let mut f = OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(data.as_bytes()).unwrap();
}

fn line(s: &str) -> ReadOutcome {
    ReadOutcome::Line(s.to_string())
}

// =============================================================================
// Start position
// =============================================================================

#[test]
fn test_lines_written_before_open_are_never_returned() {
    let file = tempfile::NamedTempFile::new().unwrap();
    append(file.path(), "old-1\nold-2\n");

    let mut reader = TailReader::open(file.path()).unwrap();
    assert_eq!(reader.cursor(), 12);
    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);

    append(file.path(), "new-1\n");
    assert_eq!(reader.next_line().unwrap(), line("new-1"));
    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);
}

#[test]
fn test_open_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = TailReader::open(&dir.path().join("absent.log")).err().unwrap();
    assert!(matches!(err, TailError::Open { .. }));
}

// =============================================================================
// Following
// =============================================================================

#[test]
fn test_appended_lines_come_back_in_order() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut reader = TailReader::open(file.path()).unwrap();

    append(file.path(), "a\nb\n");
    append(file.path(), "c\n");

    assert_eq!(reader.next_line().unwrap(), line("a"));
    assert_eq!(reader.next_line().unwrap(), line("b"));
    assert_eq!(reader.next_line().unwrap(), line("c"));
    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);
    assert_eq!(reader.cursor(), 6);
}

#[test]
fn test_partial_line_waits_for_terminator() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut reader = TailReader::open(file.path()).unwrap();

    append(file.path(), r#"{"ClientAddr":"#);
    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);
    assert_eq!(reader.cursor(), 0);

    append(file.path(), "\"1.2.3.4\"}\n");
    assert_eq!(
        reader.next_line().unwrap(),
        line(r#"{"ClientAddr":"1.2.3.4"}"#)
    );
    assert_eq!(reader.cursor(), 25);
}

#[test]
fn test_invalid_utf8_line_is_not_altered() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut reader = TailReader::open(file.path()).unwrap();

    let mut f = OpenOptions::new().append(true).open(file.path()).unwrap();
    f.write_all(b"ab\xffcd\nok\n").unwrap();

    assert_eq!(
        reader.next_line().unwrap(),
        ReadOutcome::Invalid(b"ab\xffcd".to_vec())
    );
    assert_eq!(reader.next_line().unwrap(), line("ok"));
}

// =============================================================================
// Truncation
// =============================================================================

#[test]
fn test_truncate_resets_cursor_and_empties_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut reader = TailReader::open(file.path()).unwrap();
    append(file.path(), "one\ntwo\n");
    assert_eq!(reader.next_line().unwrap(), line("one"));

    reader.truncate().unwrap();

    assert_eq!(reader.cursor(), 0);
    assert_eq!(reader.state(), TailState::Following);
    assert_eq!(std::fs::metadata(file.path()).unwrap().len(), 0);
    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);

    append(file.path(), "three\n");
    assert_eq!(reader.next_line().unwrap(), line("three"));
    assert_eq!(reader.cursor(), 6);
}

#[test]
fn test_truncate_drops_buffered_partial_line() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut reader = TailReader::open(file.path()).unwrap();
    append(file.path(), "half");
    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);

    reader.truncate().unwrap();
    append(file.path(), "whole\n");
    assert_eq!(reader.next_line().unwrap(), line("whole"));
}

#[test]
fn test_external_shrink_restarts_from_zero() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut reader = TailReader::open(file.path()).unwrap();
    append(file.path(), "first-line\n");
    assert_eq!(reader.next_line().unwrap(), line("first-line"));

    // Someone else empties the file and the proxy keeps writing.
    file.as_file().set_len(0).unwrap();
    append(file.path(), "x\n");

    assert_eq!(reader.next_line().unwrap(), ReadOutcome::Pending);
    assert_eq!(reader.cursor(), 0);
    assert_eq!(reader.next_line().unwrap(), line("x"));
}

#[test]
fn test_failed_truncate_keeps_following() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.log");
    std::fs::write(&path, "").unwrap();

    let mut reader = TailReader::open(&path).unwrap();
    append(&path, "before\n");
    assert_eq!(reader.next_line().unwrap(), line("before"));

    // The path no longer resolves, so no write handle can be opened.
    let moved = dir.path().join("access.log.1");
    std::fs::rename(&path, &moved).unwrap();

    let err = reader.truncate().unwrap_err();
    assert!(matches!(err, TailError::Truncate(_)));
    assert_eq!(reader.cursor(), 7);
    assert_eq!(reader.state(), TailState::Following);

    append(&moved, "after\n");
    assert_eq!(reader.next_line().unwrap(), line("after"));
}
