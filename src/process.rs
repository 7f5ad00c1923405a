//! One-shot execution of a validated installation graph.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, error};

use crate::error::{ExecutionError, InstallError};
use crate::graph::{InstallationManager, NodePayload};

/// Lifecycle of a process. `execute()` is only valid from `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Executing,
    Completed,
    Failed,
}

/// A single installation run bound to a validated manager.
///
/// The process allocates its own temporary working area on
/// [`execute`](InstallationProcess::execute): one `node_<id>` directory
/// per non-terminal node plus a shared `result` directory that terminal
/// nodes write into. Nodes run strictly sequentially in dependency order.
///
/// On success the `result` path is returned and the working area (result
/// included) is retained until [`cleanup`](InstallationProcess::cleanup).
/// On failure the whole working area is removed best-effort before the
/// error is returned. Dropping the process also removes whatever is left,
/// so a forgotten `cleanup()` cannot leak temporary trees.
pub struct InstallationProcess<'a> {
    manager: &'a InstallationManager,
    temp_root: Option<PathBuf>,
    state: State,
    work_dir: Option<TempDir>,
}

impl<'a> InstallationProcess<'a> {
    pub(crate) fn new(manager: &'a InstallationManager, temp_root: Option<PathBuf>) -> Self {
        Self {
            manager,
            temp_root,
            state: State::Created,
            work_dir: None,
        }
    }

    /// Run the whole graph and return the absolute path of the result
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::AlreadyExecuted`] when called a second
    /// time, and propagates the first node failure otherwise. Any failure
    /// tears the working area down before returning.
    pub fn execute(&mut self) -> Result<PathBuf, InstallError> {
        if self.state != State::Created {
            return Err(ExecutionError::AlreadyExecuted.into());
        }
        self.state = State::Executing;

        let builder_result = match &self.temp_root {
            Some(root) => tempfile::Builder::new().prefix("fwinstall-").tempdir_in(root),
            None => tempfile::Builder::new().prefix("fwinstall-").tempdir(),
        };
        let work_dir = builder_result.map_err(|e| {
            self.state = State::Failed;
            InstallError::from(ExecutionError::io(
                self.temp_root.clone().unwrap_or_else(std::env::temp_dir),
                e,
            ))
        })?;

        match self.run_nodes(work_dir.path()) {
            Ok(result_dir) => {
                self.state = State::Completed;
                self.work_dir = Some(work_dir);
                Ok(result_dir)
            }
            Err(e) => {
                error!("error during installation run: {e}");
                self.state = State::Failed;
                // Dropping the TempDir removes the working area, partial
                // result included, best-effort.
                drop(work_dir);
                Err(e)
            }
        }
    }

    fn run_nodes(&self, base_dir: &Path) -> Result<PathBuf, InstallError> {
        let nodes = self.manager.nodes();

        // Requirement map: reverse of the dependency edges.
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            if let NodePayload::Filter { depends_on, .. } = &node.payload {
                if let Some(entry) = dependents.get_mut(*depends_on) {
                    entry.push(index);
                }
            }
        }

        // Terminal nodes share `result`; every other node gets its own
        // directory, pre-created so dependents can rely on it existing.
        let result_dir = base_dir.join("result");
        std::fs::create_dir(&result_dir).map_err(|e| ExecutionError::io(&result_dir, e))?;
        let mut output_dirs: Vec<PathBuf> = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if dependents.get(index).is_some_and(|d| d.is_empty()) {
                output_dirs.push(result_dir.clone());
            } else {
                let dir = base_dir.join(format!("node_{}", node.id));
                std::fs::create_dir(&dir).map_err(|e| ExecutionError::io(&dir, e))?;
                output_dirs.push(dir);
            }
        }

        // Execution plan: seed with the sources, release each dependent as
        // its (single) dependency is popped. Filters having exactly one
        // dependency is what makes this a valid linearization.
        let mut queue: VecDeque<usize> = (0..self.manager.source_count()).collect();
        let mut queued: Vec<bool> = (0..nodes.len())
            .map(|index| index < self.manager.source_count())
            .collect();
        while let Some(index) = queue.pop_front() {
            let Some(node) = nodes.get(index) else {
                continue;
            };
            let Some(output_dir) = output_dirs.get(index) else {
                continue;
            };
            match &node.payload {
                NodePayload::Source(source) => {
                    debug!("executing source node {}", node.id);
                    source.produce(output_dir)?;
                }
                NodePayload::Filter { filter, depends_on } => {
                    let Some(input_dir) = output_dirs.get(*depends_on) else {
                        continue;
                    };
                    debug!("executing filter node {}", node.id);
                    filter.transform(input_dir, output_dir)?;
                }
            }
            for &dependent in dependents.get(index).map_or(&[][..], Vec::as_slice) {
                if let Some(flag) = queued.get_mut(dependent) {
                    if !*flag {
                        *flag = true;
                        queue.push_back(dependent);
                    }
                }
            }
        }

        Ok(result_dir)
    }

    /// Remove the working directory, including the result.
    ///
    /// Safe to call whether or not the process ran, and safe to call more
    /// than once; removal failures are logged and swallowed.
    pub fn cleanup(&mut self) {
        if let Some(work_dir) = self.work_dir.take() {
            if let Err(e) = work_dir.close() {
                debug!("failed to remove working directory: {e}");
            }
        }
    }
}

impl std::fmt::Debug for InstallationProcess<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationProcess")
            .field("state", &self.state)
            .field("temp_root", &self.temp_root)
            .field("work_dir", &self.work_dir.as_ref().map(TempDir::path))
            .finish_non_exhaustive()
    }
}
