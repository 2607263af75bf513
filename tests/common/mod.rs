#![allow(dead_code)]

use mapview::{Mode, Viewer};
use tempfile::TempDir;

pub fn scratch() -> TempDir {
    tempfile::tempdir().unwrap()
}

pub fn file_in(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_str().unwrap().to_string()
}

/// Creates a fresh file of the given length and returns a writable viewer
/// on it. The directory guard must outlive the viewer.
pub fn new_file(dir: &TempDir, name: &str, len: i64) -> (String, Viewer) {
    let path = file_in(dir, name);
    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    v.set_len(len).unwrap();
    (path, v)
}
