use std::path::PathBuf;

use cid::Cid;

use crate::types::DataType;

/// error type for dagfs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("{0} is a directory, import it with recursive enabled")]
    NotRecursive(PathBuf),

    #[error("read error in {source_name} at byte {offset}: {source}")]
    SourceRead {
        source_name: String,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("storage error during {op} of {target}: {source}")]
    Storage {
        op: &'static str,
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("block not found: {0}")]
    NotFound(Cid),

    #[error("corrupt block: digest mismatch for {0}")]
    CorruptBlock(Cid),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("malformed node: {0}")]
    MalformedNode(String),

    #[error("unsupported envelope type: {0}")]
    UnsupportedType(DataType),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("invalid import options: {0}")]
    InvalidOptions(String),

    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),

    #[error("repository not found at {0}")]
    NoRepo(PathBuf),

    #[error("repository already exists at {0}")]
    RepoExists(PathBuf),

    #[error("destination not empty: {0}")]
    TargetNotEmpty(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
