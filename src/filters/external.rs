//! Archive filters that delegate to external unpacking tools.
//!
//! Both tools must be present on the host at run time; there is no
//! startup probe. Tool output is captured and discarded, and failures are
//! reported through the engine's own error types.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::Filter;
use crate::error::{ExecutionError, PatternError};
use crate::exec::{Executor, SystemExecutor};
use crate::resolver::GlobResolver;

const UNRAR: &str = "unrar";
const SEVENZR: &str = "7zr";

fn run_tool(
    executor: &dyn Executor,
    tool: &'static str,
    args: Vec<OsString>,
) -> Result<(), ExecutionError> {
    debug!("executing external command: {tool} {args:?}");
    let result = executor
        .run(tool, &args)
        .map_err(|source| ExecutionError::ToolLaunch { tool, source })?;
    if result.success {
        Ok(())
    } else {
        Err(ExecutionError::Tool {
            tool,
            status: result.code.unwrap_or(-1),
        })
    }
}

/// Extracts every matched rar archive by invoking
/// `unrar e -idq -y <archive> <dst>`.
///
/// Depends on the non-free `unrar` executable being installed.
#[derive(Debug)]
pub struct RarFilter {
    glob: GlobResolver,
    executor: Arc<dyn Executor>,
}

impl RarFilter {
    /// Build from one or more glob patterns matched against the source
    /// directory, using the real system executor.
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
        Self::with_executor(patterns, Arc::new(SystemExecutor))
    }

    /// Build with a caller-supplied [`Executor`], for tests.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] under the same conditions as
    /// [`RarFilter::new`].
    pub fn with_executor<I, S>(
        patterns: I,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            glob: GlobResolver::new(patterns)?,
            executor,
        })
    }
}

impl Filter for RarFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        for entry in self.glob.resolve(src_dir) {
            let archive = entry?;
            let args = vec![
                OsString::from("e"),
                OsString::from("-idq"),
                OsString::from("-y"),
                archive.into_os_string(),
                dst_dir.as_os_str().to_os_string(),
            ];
            run_tool(self.executor.as_ref(), UNRAR, args)?;
        }
        Ok(())
    }
}

/// Extracts every matched 7z archive by invoking
/// `7zr e -bd -o<dst> <archive>`.
///
/// Depends on the `7zr` executable (p7zip). Note that `7zr e` flattens
/// archive subdirectories into the destination root; this filter does not
/// compensate for that.
#[derive(Debug)]
pub struct SevenZipFilter {
    glob: GlobResolver,
    executor: Arc<dyn Executor>,
}

impl SevenZipFilter {
    /// Build from one or more glob patterns matched against the source
    /// directory, using the real system executor.
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
        Self::with_executor(patterns, Arc::new(SystemExecutor))
    }

    /// Build with a caller-supplied [`Executor`], for tests.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] under the same conditions as
    /// [`SevenZipFilter::new`].
    pub fn with_executor<I, S>(
        patterns: I,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            glob: GlobResolver::new(patterns)?,
            executor,
        })
    }
}

impl Filter for SevenZipFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        for entry in self.glob.resolve(src_dir) {
            let archive = entry?;
            let mut out_flag = OsString::from("-o");
            out_flag.push(dst_dir.as_os_str());
            let args = vec![
                OsString::from("e"),
                OsString::from("-bd"),
                out_flag,
                archive.into_os_string(),
            ];
            run_tool(self.executor.as_ref(), SEVENZR, args)?;
        }
        Ok(())
    }
}
