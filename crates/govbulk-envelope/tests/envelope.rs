use std::io::Cursor;

use govbulk_envelope::{
    Classification, Error, MARKER_RECORD, MAX_MARKER_LEN, Marker, classify, read_envelope,
    write_envelope,
};
use tempfile::tempdir;

fn write(path: &std::path::Path, marker: &str, name: &str, body: &[u8]) {
    write_envelope(path, &Marker::from(marker), name, Cursor::new(body), body.len() as u64).unwrap();
}

#[test]
fn marker_record_precedes_payload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a/doc.tar");

    write(&path, "M1", "doc.txt", b"hello");

    let mut archive = tar::Archive::new(std::fs::File::open(&path).unwrap());
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![MARKER_RECORD.to_string(), "doc.txt".to_string()]);

    let envelope = read_envelope(&path).unwrap();
    assert_eq!(envelope.marker, Marker::from("M1"));
    assert_eq!(envelope.payload_name, "doc.txt");
    assert_eq!(envelope.payload, b"hello");
}

#[test]
fn stale_envelope_is_fully_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");

    write(&path, "M1", "doc.txt", &vec![b'o'; 10_000]);
    assert_eq!(classify(&path, &Marker::from("M2")).unwrap(), Classification::Stale);

    write(&path, "M2", "doc.txt", b"world");

    let envelope = read_envelope(&path).unwrap();
    assert_eq!(envelope.marker, Marker::from("M2"));
    assert_eq!(envelope.payload, b"world");
    // marker block + payload block + two end blocks, with no trace of the old payload
    assert_eq!(std::fs::metadata(&path).unwrap().len() % 512, 0);
    assert!(std::fs::metadata(&path).unwrap().len() < 10_000);
    assert_eq!(classify(&path, &Marker::from("M2")).unwrap(), Classification::Hit);
}

#[test]
fn short_payload_is_rejected_and_old_envelope_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");
    write(&path, "M1", "doc.txt", b"hello");
    let before = std::fs::read(&path).unwrap();

    let err = write_envelope(&path, &Marker::from("M2"), "doc.txt", Cursor::new(b"wor"), 5)
        .unwrap_err();
    assert!(matches!(err, Error::ContentLengthMismatch { declared: 5, actual: 3 }));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn long_payload_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");

    let err = write_envelope(&path, &Marker::from("M1"), "doc.txt", Cursor::new(b"hello!!"), 5)
        .unwrap_err();
    assert!(matches!(err, Error::ContentLengthMismatch { declared: 5, actual: 7 }));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn long_payload_names_survive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("long.tar");
    let name = format!("{}.xml", "n".repeat(150));

    write(&path, "M1", &name, b"<x/>");

    assert_eq!(read_envelope(&path).unwrap().payload_name, name);
}

#[test]
fn empty_marker_round_trips_as_hit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");
    write(&path, "", "doc.txt", b"");

    assert_eq!(classify(&path, &Marker::default()).unwrap(), Classification::Hit);
}

#[test]
fn marker_at_limit_round_trips_as_hit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");
    let marker = "x".repeat(MAX_MARKER_LEN as usize);
    write(&path, &marker, "doc.txt", b"hello");

    assert_eq!(classify(&path, &Marker::from(marker.as_str())).unwrap(), Classification::Hit);
    assert_eq!(read_envelope(&path).unwrap().marker, Marker::from(marker.as_str()));
}

#[test]
fn marker_over_limit_is_refused_before_writing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a/doc.tar");
    let marker = Marker::from("x".repeat(5000).as_str());

    let err = write_envelope(&path, &marker, "doc.txt", Cursor::new(b"hello"), 5).unwrap_err();

    assert!(matches!(err, Error::MarkerTooLong { len: 5000, max: MAX_MARKER_LEN }));
    assert!(!path.exists());
    assert!(!dir.path().join("a").exists());
}
