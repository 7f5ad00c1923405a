//! Installation graph construction and validation.
//!
//! An [`InstallationGraph`] is the declarative input: named sources and
//! named filters-with-one-dependency, in declaration order. An
//! [`InstallationManager`] validates the graph once, eagerly, and is the
//! only way to obtain an executable
//! [`InstallationProcess`](crate::process::InstallationProcess).

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::GraphError;
use crate::filters::Filter;
use crate::process::InstallationProcess;
use crate::sources::Source;

/// Declarative description of one installation: sources plus filters.
///
/// Node identifiers must be non-empty strings of ASCII letters, digits,
/// and underscores, unique across sources and filters together. Each
/// filter names exactly one dependency: the source or filter whose output
/// directory it reads.
#[derive(Default)]
pub struct InstallationGraph {
    sources: Vec<(String, Box<dyn Source>)>,
    filters: Vec<(String, Box<dyn Filter>, String)>,
}

impl InstallationGraph {
    /// Start an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a source node.
    #[must_use]
    pub fn source(mut self, id: impl Into<String>, source: impl Source + 'static) -> Self {
        self.sources.push((id.into(), Box::new(source)));
        self
    }

    /// Declare a filter node reading the output of `depends_on`.
    #[must_use]
    pub fn filter(
        mut self,
        id: impl Into<String>,
        filter: impl Filter + 'static,
        depends_on: impl Into<String>,
    ) -> Self {
        self.filters
            .push((id.into(), Box::new(filter), depends_on.into()));
        self
    }
}

impl std::fmt::Debug for InstallationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationGraph")
            .field(
                "sources",
                &self.sources.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .field(
                "filters",
                &self
                    .filters
                    .iter()
                    .map(|(id, _, dep)| (id, dep))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A validated node. Sources occupy the front of the manager's node list,
/// so `depends_on` indices always resolve within it.
pub(crate) struct Node {
    pub(crate) id: String,
    pub(crate) payload: NodePayload,
}

pub(crate) enum NodePayload {
    Source(Box<dyn Source>),
    Filter {
        filter: Box<dyn Filter>,
        depends_on: usize,
    },
}

/// A validated, immutable installation graph that spawns processes.
///
/// Construction performs all structural checks; once a manager exists, no
/// graph defect can surface at execution time. A single manager can spawn
/// any number of independent processes.
pub struct InstallationManager {
    nodes: Vec<Node>,
    source_count: usize,
}

impl InstallationManager {
    /// Validate `graph` and build a manager from it.
    ///
    /// Checks, in order: identifier syntax, duplicate identifiers, unknown
    /// dependencies, orphan sources (sources no filter consumes), cycles.
    /// The first violation is returned.
    ///
    /// # Errors
    ///
    /// Returns the corresponding [`GraphError`] for the first violated
    /// invariant.
    pub fn new(graph: InstallationGraph) -> Result<Self, GraphError> {
        let InstallationGraph { sources, filters } = graph;

        let declared_ids = sources
            .iter()
            .map(|(id, _)| id)
            .chain(filters.iter().map(|(id, _, _)| id));
        for id in declared_ids.clone() {
            if !valid_identifier(id) {
                return Err(GraphError::InvalidIdentifier(id.clone()));
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for id in declared_ids {
            if !seen.insert(id.as_str()) && !duplicates.contains(id) {
                duplicates.push(id.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(GraphError::DuplicateIdentifiers(duplicates));
        }

        let index_of: HashMap<String, usize> = sources
            .iter()
            .map(|(id, _)| id.clone())
            .chain(filters.iter().map(|(id, _, _)| id.clone()))
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();
        for (id, _, depends_on) in &filters {
            if !index_of.contains_key(depends_on.as_str()) {
                return Err(GraphError::UnknownDependency {
                    filter: id.clone(),
                    dependency: depends_on.clone(),
                });
            }
        }

        let consumed: HashSet<&str> = filters
            .iter()
            .map(|(_, _, depends_on)| depends_on.as_str())
            .collect();
        let orphans: Vec<String> = sources
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !consumed.contains(id.as_str()))
            .cloned()
            .collect();
        if !orphans.is_empty() {
            return Err(GraphError::OrphanSources(orphans));
        }

        let source_count = sources.len();
        let mut nodes: Vec<Node> = sources
            .into_iter()
            .map(|(id, source)| Node {
                id,
                payload: NodePayload::Source(source),
            })
            .collect();
        for (id, filter, depends_on) in filters {
            let depends_on = match index_of.get(depends_on.as_str()) {
                Some(&index) => index,
                None => {
                    return Err(GraphError::UnknownDependency {
                        filter: id,
                        dependency: depends_on,
                    });
                }
            };
            nodes.push(Node {
                id,
                payload: NodePayload::Filter { filter, depends_on },
            });
        }

        check_acyclic(&nodes, source_count)?;

        Ok(Self {
            nodes,
            source_count,
        })
    }

    /// A fresh, unexecuted process using the system temporary directory.
    #[must_use]
    pub fn new_process(&self) -> InstallationProcess<'_> {
        InstallationProcess::new(self, None)
    }

    /// A fresh, unexecuted process whose working area is created under
    /// `temp_root`.
    #[must_use]
    pub fn new_process_in(&self, temp_root: impl Into<PathBuf>) -> InstallationProcess<'_> {
        InstallationProcess::new(self, Some(temp_root.into()))
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn source_count(&self) -> usize {
        self.source_count
    }
}

impl std::fmt::Debug for InstallationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationManager")
            .field(
                "nodes",
                &self.nodes.iter().map(|n| &n.id).collect::<Vec<_>>(),
            )
            .field("source_count", &self.source_count)
            .finish()
    }
}

fn valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Follow each filter's dependency chain; revisiting a node before
/// reaching a source means the filters reference each other transitively.
fn check_acyclic(nodes: &[Node], source_count: usize) -> Result<(), GraphError> {
    let mut cleared: HashSet<usize> = HashSet::new();
    for start in source_count..nodes.len() {
        if cleared.contains(&start) {
            continue;
        }
        let mut chain: HashSet<usize> = HashSet::from([start]);
        let mut current = start;
        loop {
            let next = match nodes.get(current).map(|n| &n.payload) {
                Some(NodePayload::Filter { depends_on, .. }) => *depends_on,
                _ => break,
            };
            if next < source_count {
                break;
            }
            if !chain.insert(next) {
                let id = nodes
                    .get(next)
                    .map_or_else(String::new, |n| n.id.clone());
                return Err(GraphError::Cycle(id));
            }
            current = next;
        }
        cleared.extend(chain);
    }
    Ok(())
}
