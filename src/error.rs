//! Domain-specific error types for the installation engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Graph validation and pipeline execution return typed errors; custom
//! [`Source`](crate::sources::Source) and [`Filter`](crate::filters::Filter)
//! implementations may return arbitrary errors through
//! [`ExecutionError::Other`].
//!
//! # Error hierarchy
//!
//! ```text
//! InstallError
//! ├── Graph(GraphError)         — structural graph defects, construction time
//! ├── Execution(ExecutionError) — node failures while the pipeline runs
//! └── Pattern(PatternError)     — glob pattern rejected at construction
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the installation engine.
#[derive(Error, Debug)]
pub enum InstallError {
    /// Structural defect in the installation graph, raised only when an
    /// [`InstallationManager`](crate::graph::InstallationManager) is built.
    #[error("installation graph error: {0}")]
    Graph(#[from] GraphError),

    /// A node's produce/transform failed while a process was executing.
    #[error("installation error: {0}")]
    Execution(#[from] ExecutionError),

    /// A glob pattern was rejected when a source or filter was constructed.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),
}

/// Structural defects in an installation graph.
///
/// These are detected eagerly during manager construction and never occur
/// at execution time.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A node identifier is empty or contains characters outside
    /// letters, digits, and underscores.
    #[error("invalid node identifier '{0}'")]
    InvalidIdentifier(String),

    /// The same identifier was declared by more than one node.
    #[error("these identifiers are used by more than one node: {}", .0.join(", "))]
    DuplicateIdentifiers(Vec<String>),

    /// A filter names a dependency that is not declared in the graph.
    #[error("filter '{filter}' depends on unknown filter/source '{dependency}'")]
    UnknownDependency {
        /// The filter whose dependency could not be resolved.
        filter: String,
        /// The missing dependency identifier.
        dependency: String,
    },

    /// Sources that no filter depends on.
    #[error("these sources do not participate in the installation: {}", .0.join(", "))]
    OrphanSources(Vec<String>),

    /// Following dependency edges from the named filter revisits a node
    /// before reaching a source.
    #[error("cycle detected in the installation graph involving '{0}'")]
    Cycle(String),
}

/// Execution-time failures from a node's produce/transform.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Mandatory glob expansion matched nothing.
    #[error(transparent)]
    NoMatch(#[from] NoMatchError),

    /// A literal source path did not exist when the source ran.
    #[error("path doesn't exist: {}", .0.display())]
    MissingPath(PathBuf),

    /// A glob that must match exactly one file matched several.
    #[error("glob pattern matched {count} files, expected exactly one")]
    AmbiguousMatch {
        /// Number of files the pattern expanded to.
        count: usize,
    },

    /// Copy destination exists as a file but a directory was declared.
    #[error("destination exists and is a file but should be a directory")]
    DestinationIsFile,

    /// Copy destination exists as a directory but a file was declared.
    #[error("destination exists and is a directory but should be a file")]
    DestinationIsDirectory,

    /// No gzip magic number in the head of a signed blob.
    #[error("couldn't find gzip magic number in the signed file")]
    MagicNumberNotFound,

    /// An external unpacking tool exited with a non-zero status.
    #[error("{tool} returned status code {status}")]
    Tool {
        /// Name of the external executable.
        tool: &'static str,
        /// Exit status code (`-1` if the tool was killed by a signal).
        status: i32,
    },

    /// An external unpacking tool could not be spawned at all.
    #[error("failed to launch {tool}: {source}")]
    ToolLaunch {
        /// Name of the external executable.
        tool: &'static str,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// An archive could not be decoded.
    #[error("failed to extract archive {}: {source}", .path.display())]
    Archive {
        /// Path of the offending archive.
        path: PathBuf,
        /// Underlying decoder error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A filesystem operation failed; the original error is preserved.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// `execute()` was called on a process that already ran.
    #[error("installation process already executed")]
    AlreadyExecuted,

    /// Escape hatch for user-written sources and filters.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecutionError {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Glob pattern(s) matched nothing when at least one match was mandatory.
///
/// Produced by [`GlobResolver`](crate::resolver::GlobResolver) when built
/// with its strict constructor.
#[derive(Error, Debug)]
#[error("the glob patterns {patterns:?} did not match anything in directory '{}'", .directory.display())]
pub struct NoMatchError {
    /// The patterns that were expanded.
    pub patterns: Vec<String>,
    /// The directory they were expanded in.
    pub directory: PathBuf,
}

/// A glob pattern rejected at source/filter construction time.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Patterns resolved against a source directory must be relative.
    #[error("path name '{0}' is an absolute path")]
    Absolute(String),

    /// Patterns must not escape the directory they are resolved in.
    #[error("path name '{0}' makes reference to the parent directory")]
    ParentReference(String),

    /// The pattern is not valid glob syntax.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Syntax {
        /// The offending pattern.
        pattern: String,
        /// Underlying parse error from the `glob` crate.
        source: glob::PatternError,
    },
}
