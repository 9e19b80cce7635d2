use std::sync::Arc;
use std::time::Duration;

use govbulk_envelope::{MARKER_RECORD, Marker, read_envelope};
use govbulk_fetch::testing::StaticClient;
use govbulk_fetch::{
    ArchiveOptions, ArchiveOutcome, Archiver, FetchError, FileDescriptor, Gate, ProgressCounter,
    archive_all,
};
use tempfile::tempdir;
use url::Url;

fn descriptor(url: &str, ext: &str) -> FileDescriptor {
    FileDescriptor::new(Url::parse(url).unwrap(), ext)
}

#[tokio::test]
async fn hit_leaves_envelope_untouched() {
    let dir = tempdir().unwrap();
    let client = Arc::new(StaticClient::new());
    client.file("https://h/a/doc.txt", "M1", "hello");
    let archiver = Archiver::new(Arc::clone(&client), Gate::new(2), dir.path());
    let file = descriptor("https://h/a/doc.txt", ".txt");

    archiver.archive(&file).await.unwrap();
    let path = dir.path().join("a/doc.tar");
    let before = std::fs::read(&path).unwrap();
    let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

    let outcome = archiver.archive(&file).await.unwrap();

    assert_eq!(outcome, ArchiveOutcome::Hit);
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);
    // the body is fetched either way
    assert_eq!(client.requests("https://h/a/doc.txt"), 2);
}

#[tokio::test]
async fn stale_marker_replaces_envelope() {
    let dir = tempdir().unwrap();
    let client = Arc::new(StaticClient::new());
    let archiver = Archiver::new(Arc::clone(&client), Gate::new(2), dir.path());
    let file = descriptor("https://h/a/doc.txt", ".txt");

    client.file("https://h/a/doc.txt", "M1", "a much longer first body");
    archiver.archive(&file).await.unwrap();

    client.file("https://h/a/doc.txt", "M2", "world");
    let outcome = archiver.archive(&file).await.unwrap();

    assert_eq!(outcome, ArchiveOutcome::Stale);
    let envelope = read_envelope(&dir.path().join("a/doc.tar")).unwrap();
    assert_eq!(envelope.marker, Marker::from("M2"));
    assert_eq!(envelope.payload, b"world");
}

#[tokio::test]
async fn corrupt_envelope_is_reported_not_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");
    std::fs::write(&path, b"not a tarball at all").unwrap();

    let client = Arc::new(StaticClient::new());
    client.file("https://h/doc.txt", "M1", "hello");
    let file = descriptor("https://h/doc.txt", ".txt");

    let archiver = Archiver::new(Arc::clone(&client), Gate::new(1), dir.path());
    let err = archiver.archive(&file).await.unwrap_err();
    assert!(matches!(err, FetchError::EnvelopeCorrupt { .. }));
    assert_eq!(std::fs::read(&path).unwrap(), b"not a tarball at all");

    let archiver = archiver.with_options(ArchiveOptions {
        overwrite_corrupt: true,
    });
    let outcome = archiver.archive(&file).await.unwrap();
    assert_eq!(outcome, ArchiveOutcome::CorruptReplaced);
    assert_eq!(read_envelope(&path).unwrap().payload, b"hello");
}

#[tokio::test]
async fn foreign_tar_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.tar");
    {
        let mut builder = tar::Builder::new(std::fs::File::create(&path).unwrap());
        let mut header = tar::Header::new_gnu();
        header.set_size(2);
        builder.append_data(&mut header, "other.txt", &b"hi"[..]).unwrap();
        builder.finish().unwrap();
    }

    let client = Arc::new(StaticClient::new());
    client.file("https://h/doc.txt", "M1", "hello");
    let archiver = Archiver::new(client, Gate::new(1), dir.path());

    let err = archiver.archive(&descriptor("https://h/doc.txt", ".txt")).await.unwrap_err();
    match err {
        FetchError::EnvelopeCorrupt { reason, .. } => {
            assert!(reason.contains("other.txt"));
            assert!(reason.contains(MARKER_RECORD));
        }
        other => panic!("expected corrupt envelope, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn download_phase_respects_gate_and_isolates_failures() {
    let dir = tempdir().unwrap();
    let client = Arc::new(StaticClient::new().with_delay(Duration::from_millis(10)));

    let mut files = Vec::new();
    for i in 0..24 {
        let url = format!("https://h/data/f{i}.xml");
        client.file(&url, "M1", format!("<doc n=\"{i}\"/>"));
        files.push(descriptor(&url, ".xml"));
    }
    client.unreachable("https://h/data/down.xml");
    files.push(descriptor("https://h/data/down.xml", ".xml"));
    files.push(descriptor("https://h/data/gone.xml", ".xml"));

    let progress = ProgressCounter::hidden(files.len() as u64);
    let archiver = Arc::new(
        Archiver::new(Arc::clone(&client), Gate::new(3), dir.path()).with_progress(progress.clone()),
    );

    let report = archive_all(archiver, &files).await;

    assert!(client.max_in_flight() <= 3);
    assert_eq!(report.total, 26);
    assert_eq!(report.misses, 24);
    assert_eq!(report.failures.len(), 2);
    assert!(!report.is_success());
    assert_eq!(progress.completed(), 26);

    let failed: Vec<String> = report.failures.iter().map(|f| f.url.to_string()).collect();
    assert!(failed.contains(&"https://h/data/down.xml".to_string()));
    assert!(failed.contains(&"https://h/data/gone.xml".to_string()));
    assert!(
        report
            .failures
            .iter()
            .any(|f| matches!(f.error, FetchError::Network { .. }))
    );
    assert!(
        report
            .failures
            .iter()
            .any(|f| matches!(f.error, FetchError::HttpStatus { status: 404, .. }))
    );

    for i in 0..24 {
        assert!(dir.path().join(format!("data/f{i}.tar")).exists());
    }
}

#[tokio::test]
async fn files_sharing_an_envelope_path_are_not_both_archived() {
    let dir = tempdir().unwrap();
    let client = Arc::new(StaticClient::new());
    client.file("https://h/a/doc.txt", "M1", "plain text");
    client.file("https://h/a/doc.xml", "M1", "<doc/>");
    let files = [
        descriptor("https://h/a/doc.txt", ".txt"),
        descriptor("https://h/a/doc.xml", ".xml"),
    ];

    let progress = ProgressCounter::hidden(files.len() as u64);
    let archiver = Arc::new(
        Archiver::new(Arc::clone(&client), Gate::new(2), dir.path()).with_progress(progress.clone()),
    );

    let first = archive_all(Arc::clone(&archiver), &files).await;
    assert_eq!(first.total, 2);
    assert_eq!(first.misses, 1);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].url.as_str(), "https://h/a/doc.xml");
    assert!(matches!(
        &first.failures[0].error,
        FetchError::EnvelopeCollision { other, .. } if other.as_str() == "https://h/a/doc.txt"
    ));
    assert_eq!(progress.completed(), 2);
    assert_eq!(client.requests("https://h/a/doc.xml"), 0);

    let second = archive_all(archiver, &files).await;
    assert_eq!(second.hits, 1);
    assert_eq!(second.failures.len(), 1);
    assert_eq!(read_envelope(&dir.path().join("a/doc.tar")).unwrap().payload, b"plain text");
}
