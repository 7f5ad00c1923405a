#![allow(clippy::expect_used, clippy::unwrap_used, clippy::wildcard_imports)]
//! End-to-end pipeline tests.
//!
//! These tests exercise whole installation graphs through the public API:
//! real sources feeding real filters inside process-managed working
//! areas, from fixture archives on disk to the final result directory.

mod common;

use std::path::Path;

use common::{StageBuilder, list_tree, read_rel};
use fwinstall::error::ExecutionError;
use fwinstall::filters::{
    CiscoUnsignFilter, CopyFilter, ExcludeFilter, IncludeFilter, TarFilter, ZipFilter,
};
use fwinstall::sources::{FilesystemCopySource, FilesystemLinkSource, Source};
use fwinstall::{GraphError, InstallError, InstallationGraph, InstallationManager};

// ---------------------------------------------------------------------------
// Archive pipelines
// ---------------------------------------------------------------------------

/// A source that fabricates a zip archive on the fly.
struct ZipSource {
    entries: Vec<(&'static str, &'static [u8])>,
}

impl Source for ZipSource {
    fn produce(&self, dst_dir: &Path) -> Result<(), ExecutionError> {
        use std::io::Write as _;
        let file = std::fs::File::create(dst_dir.join("payload.zip"))
            .map_err(|e| ExecutionError::io(dst_dir, e))?;
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in &self.entries {
            writer
                .start_file(*name, options)
                .map_err(|e| ExecutionError::Other(e.into()))?;
            writer
                .write_all(data)
                .map_err(|e| ExecutionError::io(dst_dir, e))?;
        }
        writer
            .finish()
            .map_err(|e| ExecutionError::Other(e.into()))?;
        Ok(())
    }
}

/// A source producing a zip wired into a `ZipFilter` yields the archive's
/// contents in the result directory.
#[test]
fn zip_source_through_zip_filter() {
    let graph = InstallationGraph::new()
        .source(
            "s1",
            ZipSource {
                entries: vec![("a.txt", b"alpha")],
            },
        )
        .filter("f1", ZipFilter::new(["*.zip"]).unwrap(), "s1");
    let manager = InstallationManager::new(graph).unwrap();

    let mut process = manager.new_process();
    let result = process.execute().unwrap();

    assert_eq!(read_rel(&result, "a.txt"), b"alpha");
    process.cleanup();
}

/// Link a tar.gz from a staging area, unpack it, and strip log files on
/// the way to the result.
#[test]
fn tarball_unpack_and_trim() {
    let stage = StageBuilder::new()
        .with_tar_gz(
            "bundle.tar.gz",
            &[
                ("firmware/fw.bin", b"fwdata"),
                ("firmware/fw.cfg", b"cfg"),
                ("firmware/debug.log", b"dbg"),
                ("docs/manual.txt", b"man"),
            ],
        )
        .build();

    let graph = InstallationGraph::new()
        .source(
            "media",
            FilesystemLinkSource::new([stage.pattern("*.tar.gz")]).unwrap(),
        )
        .filter("unpack", TarFilter::new(["*.tar.gz"]).unwrap(), "media")
        .filter("trim", ExcludeFilter::new(["*.log"]).unwrap(), "unpack");
    let manager = InstallationManager::new(graph).unwrap();

    let mut process = manager.new_process();
    let result = process.execute().unwrap();

    insta::assert_snapshot!(list_tree(&result).join("\n"), @r"
    docs/
    docs/manual.txt
    firmware/
    firmware/fw.bin
    firmware/fw.cfg
    ");
    process.cleanup();
}

/// A full firmware chain: unsign a vendor blob, then unpack the gzipped
/// tar it contains, then place one file at a recipe-chosen path.
#[test]
fn unsign_unpack_copy_chain() {
    let payload = {
        use std::io::Write as _;
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&common::tar_bytes(&[("fw.bin", b"unsigned payload")]))
            .unwrap();
        encoder.finish().unwrap()
    };
    let mut blob = vec![0x42u8; 64]; // fake signature header
    blob.extend_from_slice(&payload);

    let stage = StageBuilder::new().with_file("fw.sgn", &blob).build();

    let graph = InstallationGraph::new()
        .source(
            "signed",
            FilesystemCopySource::new([stage.pattern("*.sgn")]).unwrap(),
        )
        .filter(
            "unsign",
            CiscoUnsignFilter::new("*.sgn", "fw.tar.gz").unwrap(),
            "signed",
        )
        .filter("unpack", TarFilter::new(["fw.tar.gz"]).unwrap(), "unsign")
        .filter(
            "place",
            CopyFilter::new(["fw.bin"], "images/primary.bin").unwrap(),
            "unpack",
        );
    let manager = InstallationManager::new(graph).unwrap();

    let mut process = manager.new_process();
    let result = process.execute().unwrap();

    assert_eq!(read_rel(&result, "images/primary.bin"), b"unsigned payload");
    process.cleanup();
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// `IncludeFilter(["docs/*"])` admits `docs` and everything below it,
/// and nothing else.
#[test]
fn include_filter_selects_matched_subtree() {
    let stage = StageBuilder::new()
        .with_file("docs/readme.txt", b"readme")
        .with_file("other/x.txt", b"x")
        .build();

    let graph = InstallationGraph::new()
        .source(
            "tree",
            FilesystemCopySource::new([stage.pattern("*")]).unwrap(),
        )
        .filter("pick", IncludeFilter::new(["docs/*"]).unwrap(), "tree");
    let manager = InstallationManager::new(graph).unwrap();

    let mut process = manager.new_process();
    let result = process.execute().unwrap();

    assert_eq!(
        list_tree(&result),
        vec!["docs/".to_string(), "docs/readme.txt".to_string()]
    );
    process.cleanup();
}

// ---------------------------------------------------------------------------
// Determinism and lifecycle through the public API
// ---------------------------------------------------------------------------

/// Re-running the same graph against the same source state yields the
/// same result contents (temp paths aside).
#[test]
fn reruns_are_deterministic() {
    let stage = StageBuilder::new()
        .with_zip("fw.zip", &[("a.txt", b"a"), ("b/c.txt", b"c")])
        .build();

    let graph = InstallationGraph::new()
        .source(
            "media",
            FilesystemLinkSource::new([stage.pattern("*.zip")]).unwrap(),
        )
        .filter("unpack", ZipFilter::new(["*.zip"]).unwrap(), "media");
    let manager = InstallationManager::new(graph).unwrap();

    let mut first = manager.new_process();
    let first_result = first.execute().unwrap();
    let first_listing = list_tree(&first_result);

    let mut second = manager.new_process();
    let second_result = second.execute().unwrap();
    assert_eq!(list_tree(&second_result), first_listing);

    first.cleanup();
    second.cleanup();
}

/// A graph whose filters form a cycle with no reachable source fails at
/// manager construction, before any process exists.
#[test]
fn cyclic_graph_is_rejected_up_front() {
    let graph = InstallationGraph::new()
        .filter("f1", ZipFilter::new(["*.zip"]).unwrap(), "f2")
        .filter("f2", ZipFilter::new(["*.zip"]).unwrap(), "f1");
    assert!(matches!(
        InstallationManager::new(graph),
        Err(GraphError::Cycle(_))
    ));
}

/// Cleanup after a failed run never errors and leaves nothing on disk.
#[test]
fn failed_run_cleans_up_and_cleanup_stays_safe() {
    let temp_root = tempfile::tempdir().unwrap();
    let stage = StageBuilder::new().build(); // empty: the filter glob will not match

    let graph = InstallationGraph::new()
        .source(
            "media",
            FilesystemLinkSource::new([stage.pattern("*.zip")]).unwrap(),
        )
        .filter("unpack", ZipFilter::new(["*.zip"]).unwrap(), "media");
    let manager = InstallationManager::new(graph).unwrap();

    let mut process = manager.new_process_in(temp_root.path());
    let err = process.execute().unwrap_err();
    assert!(matches!(
        err,
        InstallError::Execution(ExecutionError::NoMatch(_))
    ));

    process.cleanup();
    process.cleanup();
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}
