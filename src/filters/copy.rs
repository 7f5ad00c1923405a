//! Copies glob matches to a declared relative destination.

use std::path::Path;

use super::Filter;
use crate::error::{ExecutionError, PatternError};
use crate::fs;
use crate::resolver::GlobResolver;

/// Copies one or more matched files or directories to a path inside the
/// destination directory.
///
/// The destination string declares its own kind: a trailing `/` means
/// directory, anything else means a single file. The declaration must be
/// explicit because missing directories are created on the way, and the
/// filter cannot guess which kind the recipe meant.
#[derive(Debug, Clone)]
pub struct CopyFilter {
    glob: GlobResolver,
    dst: String,
}

impl CopyFilter {
    /// Build from glob patterns matched against the source directory and a
    /// relative destination path.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for absolute, escaping, or malformed
    /// patterns.
    pub fn new<I, S>(patterns: I, dst: impl Into<String>) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            glob: GlobResolver::new(patterns)?,
            dst: dst.into(),
        })
    }

    fn copy_into_dir(&self, src_dir: &Path, abs_dst: &Path) -> Result<(), ExecutionError> {
        for entry in self.glob.resolve(src_dir) {
            let path = entry?;
            let Some(name) = path.file_name() else {
                continue;
            };
            fs::copy_path(&path, &abs_dst.join(name), true)?;
        }
        Ok(())
    }

    fn copy_to_file(&self, src_dir: &Path, abs_dst: &Path) -> Result<(), ExecutionError> {
        let matches = self.glob.resolve_all(src_dir)?;
        match matches.as_slice() {
            [single] => std::fs::copy(single, abs_dst)
                .map(|_| ())
                .map_err(|e| ExecutionError::io(single, e)),
            other => Err(ExecutionError::AmbiguousMatch { count: other.len() }),
        }
    }
}

impl Filter for CopyFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        let dst_is_dir = self.dst.ends_with('/');
        let abs_dst = dst_dir.join(&self.dst);

        if abs_dst.exists() {
            if abs_dst.is_dir() != dst_is_dir {
                return Err(if dst_is_dir {
                    ExecutionError::DestinationIsFile
                } else {
                    ExecutionError::DestinationIsDirectory
                });
            }
        } else if dst_is_dir {
            std::fs::create_dir_all(&abs_dst).map_err(|e| ExecutionError::io(&abs_dst, e))?;
        } else if let Some(parent) = abs_dst.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExecutionError::io(parent, e))?;
        }

        if dst_is_dir {
            self.copy_into_dir(src_dir, &abs_dst)
        } else {
            self.copy_to_file(src_dir, &abs_dst)
        }
    }
}
