//! high-level operations over a block store

mod directory;
mod export;
mod get;
mod import;
pub mod layout;
mod ls;
mod stat;

pub use directory::import_directory;
pub use export::{cat, export, ContentStream, ExportEntry, Exporter};
pub use get::{get, GetStats};
pub use import::{import, import_path, import_reader, ImportOptions, ImportResult, Source};
pub use layout::{BalancedLayout, DEFAULT_MAX_LINKS};
pub use ls::{ls, LsEntry};
pub use stat::{repo_stats, stat, NodeStat, RepoStats};
