//! Glob pattern resolution against arbitrary base directories.
//!
//! The `glob` crate works from the current directory; [`GlobResolver`]
//! wraps it so one or more *relative* patterns can be expanded inside any
//! directory, with the path-escape validation every filter relies on.

use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, NoMatchError, PatternError};

/// Expands relative glob patterns inside a caller-supplied base directory.
///
/// Patterns are validated at construction: absolute paths and patterns
/// that escape upward through `..` are rejected, as is invalid glob
/// syntax. [`GlobResolver::new`] makes an empty combined expansion an
/// error at resolve time; [`GlobResolver::allow_empty`] tolerates it.
#[derive(Debug, Clone)]
pub struct GlobResolver {
    patterns: Vec<String>,
    require_match: bool,
}

impl GlobResolver {
    /// Build a resolver that errors when no pattern matches anything.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if any pattern is absolute, refers to the
    /// parent directory, or is not valid glob syntax.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(patterns, true)
    }

    /// Build a resolver for which an empty expansion is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] under the same conditions as
    /// [`GlobResolver::new`].
    pub fn allow_empty<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(patterns, false)
    }

    fn build<I, S>(patterns: I, require_match: bool) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut validated = Vec::new();
        for pattern in patterns {
            let pattern = pattern.into();
            let normalized = validate_relative(&pattern)?;
            glob::Pattern::new(&normalized).map_err(|source| PatternError::Syntax {
                pattern: pattern.clone(),
                source,
            })?;
            validated.push(normalized);
        }
        Ok(Self {
            patterns: validated,
            require_match,
        })
    }

    /// The validated, normalized patterns in declaration order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Lazily expand every pattern inside `base_dir`, in pattern order.
    ///
    /// Matches are yielded as absolute paths. When the resolver was built
    /// with [`GlobResolver::new`] and the combined expansion over all
    /// patterns is empty, the iterator's final item is an
    /// [`ExecutionError::NoMatch`].
    pub fn resolve<'a>(&'a self, base_dir: &Path) -> Matches<'a> {
        Matches {
            base: base_dir.to_path_buf(),
            patterns: self.patterns.iter(),
            all_patterns: &self.patterns,
            current: None,
            require_match: self.require_match,
            matched: false,
            finished: false,
        }
    }

    /// Materialize [`GlobResolver::resolve`] into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first error the lazy expansion yields, including the
    /// no-match error for strict resolvers.
    pub fn resolve_all(&self, base_dir: &Path) -> Result<Vec<PathBuf>, ExecutionError> {
        self.resolve(base_dir).collect()
    }
}

/// Lazy iterator over glob matches, created by [`GlobResolver::resolve`].
pub struct Matches<'a> {
    base: PathBuf,
    patterns: std::slice::Iter<'a, String>,
    all_patterns: &'a [String],
    current: Option<glob::Paths>,
    require_match: bool,
    matched: bool,
    finished: bool,
}

impl std::fmt::Debug for Matches<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matches")
            .field("base", &self.base)
            .field("patterns", &self.all_patterns)
            .finish_non_exhaustive()
    }
}

impl Iterator for Matches<'_> {
    type Item = Result<PathBuf, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(paths) = self.current.as_mut() {
                match paths.next() {
                    Some(Ok(path)) => {
                        self.matched = true;
                        return Some(Ok(path));
                    }
                    Some(Err(e)) => {
                        let path = e.path().to_path_buf();
                        return Some(Err(ExecutionError::io(path, e.into_error())));
                    }
                    None => self.current = None,
                }
            } else if let Some(pattern) = self.patterns.next() {
                let full = self.base.join(pattern);
                match glob::glob(&full.to_string_lossy()) {
                    Ok(paths) => self.current = Some(paths),
                    // Patterns are validated at construction; this can only
                    // trip on metacharacters inside `base` itself.
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(ExecutionError::Other(anyhow::anyhow!(
                            "invalid glob pattern '{}': {e}",
                            full.display()
                        ))));
                    }
                }
            } else {
                if self.require_match && !self.matched && !self.finished {
                    self.finished = true;
                    return Some(Err(NoMatchError {
                        patterns: self.all_patterns.to_vec(),
                        directory: self.base.clone(),
                    }
                    .into()));
                }
                return None;
            }
        }
    }
}

/// Validate that `name` is relative and does not escape upward, returning
/// its lexically normalized form.
///
/// Shared between pattern construction and the unsign filter's destination
/// path check.
pub(crate) fn validate_relative(name: &str) -> Result<String, PatternError> {
    if Path::new(name).is_absolute() {
        return Err(PatternError::Absolute(name.to_string()));
    }
    let normalized = lexical_normalize(name);
    if normalized == ".." || normalized.starts_with("../") {
        return Err(PatternError::ParentReference(name.to_string()));
    }
    Ok(normalized)
}

/// Collapse `.` components and resolve `a/..` pairs without touching the
/// filesystem.
fn lexical_normalize(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for comp in name.split('/') {
        match comp {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&"..") | None => parts.push(".."),
                Some(_) => {
                    parts.pop();
                }
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
