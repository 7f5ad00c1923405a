//! Strips the vendor signature wrapper from signed gzip blobs.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::Filter;
use crate::error::{ExecutionError, PatternError};
use crate::resolver::{self, GlobResolver};

/// How far into the signed blob the gzip stream may start.
const HEAD_LEN: usize = 512;

/// See <https://www.rfc-editor.org/rfc/rfc1952> §2.3.1.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Recovers the gzip payload embedded in a vendor-signed firmware blob.
///
/// The signed pattern may be a glob for convenience, but its expansion
/// must match exactly one file. The blob's first 512 bytes are scanned for
/// the gzip magic number; everything from the magic onward is written to
/// the configured relative path inside the destination directory.
#[derive(Debug, Clone)]
pub struct CiscoUnsignFilter {
    glob: GlobResolver,
    unsigned_path: PathBuf,
}

impl CiscoUnsignFilter {
    /// Build from the signed blob's glob pattern and the relative path the
    /// unsigned payload is written to.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when either path is absolute, escapes
    /// through `..`, or (for the pattern) is malformed glob syntax.
    pub fn new(signed_pattern: &str, unsigned_path: &str) -> Result<Self, PatternError> {
        Ok(Self {
            glob: GlobResolver::new([signed_pattern])?,
            unsigned_path: PathBuf::from(resolver::validate_relative(unsigned_path)?),
        })
    }

    fn single_match(&self, src_dir: &Path) -> Result<PathBuf, ExecutionError> {
        let mut matches = self.glob.resolve_all(src_dir)?;
        match matches.len() {
            1 => Ok(matches.remove(0)),
            count => Err(ExecutionError::AmbiguousMatch { count }),
        }
    }
}

impl Filter for CiscoUnsignFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        let signed = self.single_match(src_dir)?;
        let mut file = File::open(&signed).map_err(|e| ExecutionError::io(&signed, e))?;

        let mut head = Vec::with_capacity(HEAD_LEN);
        Read::by_ref(&mut file)
            .take(HEAD_LEN as u64)
            .read_to_end(&mut head)
            .map_err(|e| ExecutionError::io(&signed, e))?;
        let start = head
            .windows(GZIP_MAGIC.len())
            .position(|window| window == GZIP_MAGIC)
            .ok_or(ExecutionError::MagicNumberNotFound)?;

        let out_path = dst_dir.join(&self.unsigned_path);
        let mut out = File::create(&out_path).map_err(|e| ExecutionError::io(&out_path, e))?;
        out.write_all(head.get(start..).unwrap_or_default())
            .map_err(|e| ExecutionError::io(&out_path, e))?;
        io::copy(&mut file, &mut out).map_err(|e| ExecutionError::io(&out_path, e))?;
        Ok(())
    }
}
