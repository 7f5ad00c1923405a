//! Installation sources: graph nodes that materialize initial files.
//!
//! A source owns no input; it writes into the output directory the
//! pipeline hands it. Unlike filters, source patterns are expanded
//! directly against the filesystem, so absolute patterns are allowed:
//! sources are how files from outside the working area enter a run.

use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, PatternError};
use crate::fs;

/// A graph node with no input that materializes initial files into a
/// directory.
pub trait Source: Send + Sync {
    /// Produce this source's files inside `dst_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the files cannot be materialized;
    /// the error aborts the whole installation run.
    fn produce(&self, dst_dir: &Path) -> Result<(), ExecutionError>;
}

/// Validate glob syntax for source patterns (absolute paths permitted).
fn validate_source_patterns<I, S>(patterns: I) -> Result<Vec<String>, PatternError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut validated = Vec::new();
    for pattern in patterns {
        let pattern = pattern.into();
        glob::Pattern::new(&pattern).map_err(|source| PatternError::Syntax {
            pattern: pattern.clone(),
            source,
        })?;
        validated.push(pattern);
    }
    Ok(validated)
}

/// Expand a raw source pattern against the filesystem.
fn expand(pattern: &str) -> Result<glob::Paths, ExecutionError> {
    glob::glob(pattern).map_err(|e| {
        ExecutionError::Other(anyhow::anyhow!("invalid glob pattern '{pattern}': {e}"))
    })
}

/// A source that symlinks every glob match into the destination directory.
///
/// Links are named by the match's base name. A pattern matching nothing is
/// not an error. Be careful linking directories: a link to a parent of the
/// destination directory is a good way to build a cycle on disk.
#[derive(Debug, Clone)]
pub struct FilesystemLinkSource {
    patterns: Vec<String>,
}

impl FilesystemLinkSource {
    /// Build from one or more glob patterns (absolute paths allowed).
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Syntax`] for invalid glob syntax.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            patterns: validate_source_patterns(patterns)?,
        })
    }
}

impl Source for FilesystemLinkSource {
    fn produce(&self, dst_dir: &Path) -> Result<(), ExecutionError> {
        for pattern in &self.patterns {
            for entry in expand(pattern)? {
                let path =
                    entry.map_err(|e| ExecutionError::io(e.path().to_path_buf(), e.into_error()))?;
                let Some(name) = path.file_name() else {
                    continue;
                };
                fs::symlink(&path, &dst_dir.join(name))?;
            }
        }
        Ok(())
    }
}

/// A source that symlinks exact paths, failing on any path that is absent
/// when the source runs.
///
/// The existence check catches recipe typos early; the file can of course
/// still disappear between the check and the link.
#[derive(Debug, Clone)]
pub struct NonGlobbingFilesystemLinkSource {
    paths: Vec<PathBuf>,
}

impl NonGlobbingFilesystemLinkSource {
    /// Build from one or more literal paths.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Source for NonGlobbingFilesystemLinkSource {
    fn produce(&self, dst_dir: &Path) -> Result<(), ExecutionError> {
        for path in &self.paths {
            if !path.exists() {
                return Err(ExecutionError::MissingPath(path.clone()));
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            fs::symlink(path, &dst_dir.join(name))?;
        }
        Ok(())
    }
}

/// A source that copies every glob match into the destination directory.
///
/// The copying alternative to [`FilesystemLinkSource`] for callers worried
/// about the linked files changing underneath a run. Directories are
/// copied recursively with symlinks followed.
#[derive(Debug, Clone)]
pub struct FilesystemCopySource {
    patterns: Vec<String>,
}

impl FilesystemCopySource {
    /// Build from one or more glob patterns (absolute paths allowed).
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Syntax`] for invalid glob syntax.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            patterns: validate_source_patterns(patterns)?,
        })
    }
}

impl Source for FilesystemCopySource {
    fn produce(&self, dst_dir: &Path) -> Result<(), ExecutionError> {
        for pattern in &self.patterns {
            for entry in expand(pattern)? {
                let path =
                    entry.map_err(|e| ExecutionError::io(e.path().to_path_buf(), e.into_error()))?;
                let Some(name) = path.file_name() else {
                    continue;
                };
                fs::copy_path(&path, &dst_dir.join(name), false)?;
            }
        }
        Ok(())
    }
}

/// A source that adds nothing to the destination directory.
///
/// Mostly useful for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSource;

impl Source for NullSource {
    fn produce(&self, _dst_dir: &Path) -> Result<(), ExecutionError> {
        Ok(())
    }
}
