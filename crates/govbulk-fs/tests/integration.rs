use std::io::Write;

use govbulk_fs::StagedFile;
use tempfile::tempdir;

#[test]
fn test_commit_replaces_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.txt");

    std::fs::write(&path, "original").unwrap();
    let mut staged = StagedFile::new(&path).unwrap();
    staged.file_mut().write_all(b"new content").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"original");
    staged.commit().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"new content");
}

#[test]
fn test_commit_leaves_no_staging_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub/file.bin");

    let mut staged = StagedFile::new(&path).unwrap();
    staged.file_mut().write_all(b"payload").unwrap();
    staged.commit().unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path().join("sub"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["file.bin".to_string()]);
}

#[test]
fn test_abandoned_stage_leaves_directory_clean() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.bin");

    {
        let mut staged = StagedFile::new(&path).unwrap();
        staged.file_mut().write_all(b"half").unwrap();
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
