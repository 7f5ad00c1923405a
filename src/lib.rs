//! Firmware package installation pipeline engine.
//!
//! Transforms a set of *sources* (nodes that materialize files from
//! nothing) through chains of single-input *filters* (archive extraction,
//! vendor unsigning, include/exclude selection, copying) into one final
//! result directory, with eager graph validation, strictly ordered
//! synchronous execution, and guaranteed cleanup of intermediate state.
//!
//! The public API is organised into four layers:
//!
//! - **[`sources`] / [`filters`]** — the node library: `produce` and
//!   `transform` primitives over directories
//! - **[`resolver`]** — glob expansion inside a base directory, with
//!   path-escape validation
//! - **[`graph`]** — declarative graph input and one-time validation
//! - **[`process`]** — the one-shot executor owning a temporary working
//!   area
//!
//! ```no_run
//! use fwinstall::filters::{TarFilter, IncludeFilter};
//! use fwinstall::sources::FilesystemLinkSource;
//! use fwinstall::{InstallationGraph, InstallationManager};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = InstallationGraph::new()
//!     .source("download", FilesystemLinkSource::new(["/var/cache/fw/*.tar.gz"])?)
//!     .filter("unpack", TarFilter::new(["*.tar.gz"])?, "download")
//!     .filter("firmware", IncludeFilter::new(["firmware/*"])?, "unpack");
//!
//! let manager = InstallationManager::new(graph)?;
//! let mut process = manager.new_process();
//! let result_dir = process.execute()?;
//! // ... register result_dir's contents somewhere persistent ...
//! process.cleanup();
//! # Ok(())
//! # }
//! ```
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod error;
pub mod exec;
pub mod filters;
mod fs;
pub mod graph;
pub mod process;
pub mod resolver;
pub mod sources;

pub use error::{ExecutionError, GraphError, InstallError, NoMatchError, PatternError};
pub use graph::{InstallationGraph, InstallationManager};
pub use process::InstallationProcess;
