// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed staging area and a fluent builder
// so each integration test can fabricate source trees and fixture
// archives without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

/// A staging directory holding fixture files for one test.
///
/// Backed by a [`tempfile::TempDir`], so it disappears when dropped.
pub struct Stage {
    dir: tempfile::TempDir,
}

impl Stage {
    /// Path to the staging directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Glob pattern matching `tail` inside the staging directory, for
    /// wiring into filesystem sources.
    pub fn pattern(&self, tail: &str) -> String {
        format!("{}/{tail}", self.dir.path().display())
    }
}

/// Fluent builder for [`Stage`].
pub struct StageBuilder {
    dir: tempfile::TempDir,
}

impl StageBuilder {
    /// Begin building an empty staging directory.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create staging dir"),
        }
    }

    /// Write `content` to `rel_path`, creating parent directories.
    pub fn with_file(self, rel_path: &str, content: &[u8]) -> Self {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture parent");
        }
        std::fs::write(path, content).expect("write fixture file");
        self
    }

    /// Write a zip archive at `rel_path` containing the given entries.
    pub fn with_zip(self, rel_path: &str, entries: &[(&str, &[u8])]) -> Self {
        let file = std::fs::File::create(self.dir.path().join(rel_path)).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(data).expect("write zip entry");
        }
        writer.finish().expect("finish zip");
        self
    }

    /// Write a gzipped tar archive at `rel_path` containing the given
    /// entries.
    pub fn with_tar_gz(self, rel_path: &str, entries: &[(&str, &[u8])]) -> Self {
        let bytes = tar_bytes(entries);
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&bytes).expect("gzip tar");
        std::fs::write(
            self.dir.path().join(rel_path),
            encoder.finish().expect("finish gzip"),
        )
        .expect("write tar.gz");
        self
    }

    /// Finish building and return the staging directory.
    pub fn build(self) -> Stage {
        Stage { dir: self.dir }
    }
}

/// Serialize entries into an uncompressed tar stream.
pub fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, *data)
            .expect("append tar entry");
    }
    builder.into_inner().expect("finish tar")
}

/// Sorted relative listing of every file and directory under `root`,
/// directories suffixed with `/`. Stable input for snapshots.
pub fn list_tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).expect("read dir") {
            let entry = entry.expect("dir entry");
            let path = entry.path();
            let rel = path
                .strip_prefix(root)
                .expect("path under root")
                .to_string_lossy()
                .into_owned();
            if path.is_dir() {
                out.push(format!("{rel}/"));
                walk(root, &path, out);
            } else {
                out.push(rel);
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// Read a file under `root` by relative path.
pub fn read_rel(root: &Path, rel: &str) -> Vec<u8> {
    std::fs::read(PathBuf::from(root).join(rel)).expect("read result file")
}
