//! Predicate-driven tree filters: copy a selected subset of the source
//! directory into the destination.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::Filter;
use crate::error::{ExecutionError, PatternError};

/// Walk `src_dir` depth-first and copy every selected entry to `dst_dir`.
///
/// `select(rel_path, abs_path)` decides inclusion. A rejected directory is
/// pruned: its descendants are never visited. An accepted directory is
/// created in the destination, but its children are still tested
/// individually; accepting a directory does not accept its contents.
fn copy_selected(
    src_dir: &Path,
    dst_dir: &Path,
    select: &mut dyn FnMut(&Path, &Path) -> bool,
) -> Result<(), ExecutionError> {
    let mut dir_stack: Vec<PathBuf> = vec![PathBuf::new()];
    while let Some(rel_dir) = dir_stack.pop() {
        let abs_dir = src_dir.join(&rel_dir);
        for entry in std::fs::read_dir(&abs_dir).map_err(|e| ExecutionError::io(&abs_dir, e))? {
            let entry = entry.map_err(|e| ExecutionError::io(&abs_dir, e))?;
            let rel = rel_dir.join(entry.file_name());
            let abs = src_dir.join(&rel);
            if select(&rel, &abs) {
                let target = dst_dir.join(&rel);
                if abs.is_dir() {
                    std::fs::create_dir(&target).map_err(|e| ExecutionError::io(&target, e))?;
                    dir_stack.push(rel);
                } else {
                    std::fs::copy(&abs, &target).map_err(|e| ExecutionError::io(&abs, e))?;
                }
            }
        }
    }
    Ok(())
}

/// Compile match patterns for the include/exclude specializations.
///
/// These are matched against relative paths (not expanded on disk), with
/// the `glob` crate's default options: a `*` may span separators, like
/// classic `fnmatch`.
fn compile_patterns<I, S>(patterns: I) -> Result<Vec<glob::Pattern>, PatternError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.into();
            glob::Pattern::new(&pattern).map_err(|source| PatternError::Syntax {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn matches_any(patterns: &[glob::Pattern], rel: &Path) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(rel))
}

/// A generic tree filter driven by a caller-supplied predicate.
///
/// See [`ExcludeFilter`] and [`IncludeFilter`] for the two pattern-driven
/// specializations.
pub struct IncludeExcludeFilter<F> {
    predicate: F,
}

impl<F> IncludeExcludeFilter<F>
where
    F: Fn(&Path, &Path) -> bool + Send + Sync,
{
    /// Build from a predicate receiving each entry's path relative to the
    /// source directory and its absolute path.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> std::fmt::Debug for IncludeExcludeFilter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncludeExcludeFilter")
            .field("predicate", &"<fn>")
            .finish()
    }
}

impl<F> Filter for IncludeExcludeFilter<F>
where
    F: Fn(&Path, &Path) -> bool + Send + Sync,
{
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        copy_selected(src_dir, dst_dir, &mut |rel, abs| (self.predicate)(rel, abs))
    }
}

/// Copies the source tree minus every entry matching one of the patterns.
///
/// Excluding a directory excludes its whole subtree.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    patterns: Vec<glob::Pattern>,
}

impl ExcludeFilter {
    /// Build from one or more match patterns.
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
            patterns: compile_patterns(patterns)?,
        })
    }
}

impl Filter for ExcludeFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        copy_selected(src_dir, dst_dir, &mut |rel, _abs| {
            !matches_any(&self.patterns, rel)
        })
    }
}

/// Copies only the entries matching one of the patterns, plus everything
/// below a matched directory.
///
/// Once a directory is admitted its descendants are included without
/// having to match a pattern themselves. The inclusion state is rebuilt on
/// every transform, so a filter instance can be reused across runs.
#[derive(Debug, Clone)]
pub struct IncludeFilter {
    patterns: Vec<glob::Pattern>,
}

impl IncludeFilter {
    /// Build from one or more match patterns.
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
            patterns: compile_patterns(patterns)?,
        })
    }

    /// A directory also counts as matched when a pattern names content
    /// beneath it: `docs/*` must admit `docs` itself or nothing below it
    /// could ever be reached.
    fn dir_matches(&self, rel: &Path) -> bool {
        let with_sep = format!("{}/", rel.to_string_lossy());
        self.patterns.iter().any(|pattern| pattern.matches(&with_sep))
    }
}

impl Filter for IncludeFilter {
    fn transform(&self, src_dir: &Path, dst_dir: &Path) -> Result<(), ExecutionError> {
        let mut included_dirs: HashSet<PathBuf> = HashSet::new();
        copy_selected(src_dir, dst_dir, &mut |rel, abs| {
            let parent_included = rel
                .parent()
                .is_some_and(|parent| included_dirs.contains(parent));
            let is_dir = abs.is_dir();
            if parent_included
                || matches_any(&self.patterns, rel)
                || (is_dir && self.dir_matches(rel))
            {
                if is_dir {
                    included_dirs.insert(rel.to_path_buf());
                }
                true
            } else {
                false
            }
        })
    }
}
