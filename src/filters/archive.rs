//! In-process archive extraction: zip and tar (plain, gzip, bzip2).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;

use super::Filter;
use crate::error::{ExecutionError, PatternError};
use crate::resolver::GlobResolver;

fn archive_error(
    path: &Path,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ExecutionError {
    ExecutionError::Archive {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

/// Extracts every matched zip archive into the destination directory,
/// using the paths stored in the archive.
#[derive(Debug, Clone)]
pub struct ZipFilter {
    glob: GlobResolver,
}

impl ZipFilter {
    /// Build from one or more glob patterns matched against the source
    /// directory. Matching nothing at transform time is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for absolute, escaping, or malformed
    /// patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            glob: GlobResolver::new(patterns)?,
        })
    }
}

impl Filter for ZipFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        for entry in self.glob.resolve(src_dir) {
            let path = entry?;
            let file = File::open(&path).map_err(|e| ExecutionError::io(&path, e))?;
            let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(&path, e))?;
            archive
                .extract(dst_dir)
                .map_err(|e| archive_error(&path, e))?;
        }
        Ok(())
    }
}

/// Extracts every matched tar archive into the destination directory.
///
/// Compression is auto-detected from the archive's leading bytes: gzip
/// (`1f 8b`), bzip2 (`BZh`), or none.
#[derive(Debug, Clone)]
pub struct TarFilter {
    glob: GlobResolver,
}

impl TarFilter {
    /// Build from one or more glob patterns matched against the source
    /// directory. Matching nothing at transform time is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for absolute, escaping, or malformed
    /// patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            glob: GlobResolver::new(patterns)?,
        })
    }

    fn open_detected(path: &Path) -> Result<Box<dyn Read>, ExecutionError> {
        let mut file = File::open(path).map_err(|e| ExecutionError::io(path, e))?;
        let mut head = [0u8; 3];
        let read = file
            .read(&mut head)
            .map_err(|e| ExecutionError::io(path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| ExecutionError::io(path, e))?;

        let head = head.get(..read).unwrap_or_default();
        let reader: Box<dyn Read> = if head.starts_with(&[0x1f, 0x8b]) {
            Box::new(GzDecoder::new(file))
        } else if head.starts_with(b"BZh") {
            Box::new(bzip2::read::BzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(reader)
    }
}

impl Filter for TarFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        for entry in self.glob.resolve(src_dir) {
            let path = entry?;
            let reader = Self::open_detected(&path)?;
            tar::Archive::new(reader)
                .unpack(dst_dir)
                .map_err(|e| archive_error(&path, e))?;
        }
        Ok(())
    }
}
