use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use cid::Cid;

use crate::chunker::{Chunker, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use crate::config::ImportConfig;
use crate::error::{Error, Result};
use crate::ops::directory::import_directory;
use crate::ops::layout::{BalancedLayout, DEFAULT_MAX_LINKS};
use crate::store::BlockStore;

/// what to import
pub enum Source {
    /// a file, or a directory when importing recursively
    Path(PathBuf),
    /// bytes already in memory
    Buffer(Bytes),
    /// a stream of unknown length
    Reader(Box<dyn Read>),
}

impl Source {
    pub fn reader(reader: impl Read + 'static) -> Self {
        Source::Reader(Box::new(reader))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Source::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            Source::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<Bytes> for Source {
    fn from(bytes: Bytes) -> Self {
        Source::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Buffer(bytes.into())
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Source::Buffer(Bytes::copy_from_slice(bytes))
    }
}

/// import options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// maximum chunk length in bytes
    pub chunk_size: usize,
    /// maximum links per file node
    pub max_links: usize,
    /// allow directory sources
    pub recursive: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_links: DEFAULT_MAX_LINKS,
            recursive: false,
        }
    }
}

impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            max_links: config.max_links,
            recursive: false,
        }
    }
}

impl ImportOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = max_links;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidOptions("chunk size must be positive".into()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidOptions(format!(
                "chunk size {} exceeds the {} byte limit",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        if self.max_links < 2 {
            return Err(Error::InvalidOptions(format!(
                "max links must be at least 2, got {}",
                self.max_links
            )));
        }
        Ok(())
    }
}

/// outcome of one import
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportResult {
    /// root identifier
    pub cid: Cid,
    /// cumulative DAG size of the root
    pub size: u64,
    /// logical content bytes imported
    pub bytes: u64,
    /// nodes created, counting repeats of identical content
    pub nodes: u64,
}

/// import a path, buffer or stream into `store`
///
/// children are always stored before the parents that link to them. on
/// failure nothing is rolled back; whatever was stored stays valid.
pub fn import<S, T>(store: &S, source: T, options: &ImportOptions) -> Result<ImportResult>
where
    S: BlockStore + ?Sized,
    T: Into<Source>,
{
    options.validate()?;

    let source: Source = source.into();
    let result = match source {
        Source::Path(path) => import_path(store, &path, options)?,
        Source::Buffer(bytes) => import_reader(store, &bytes[..], "<buffer>", options)?,
        Source::Reader(reader) => import_reader(store, reader, "<reader>", options)?,
    };

    tracing::info!(
        cid = %result.cid,
        bytes = result.bytes,
        nodes = result.nodes,
        "import complete"
    );

    Ok(result)
}

/// import a file, or a directory when `options.recursive` is set
pub fn import_path<S>(store: &S, path: &Path, options: &ImportOptions) -> Result<ImportResult>
where
    S: BlockStore + ?Sized,
{
    let meta = fs::metadata(path).map_err(|e| source_error(path, e))?;

    if meta.is_dir() {
        if !options.recursive {
            return Err(Error::NotRecursive(path.to_path_buf()));
        }
        return import_directory(store, path, options);
    }

    import_file(store, path, options)
}

/// import a single file's contents
pub(crate) fn import_file<S>(
    store: &S,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportResult>
where
    S: BlockStore + ?Sized,
{
    let file = File::open(path).map_err(|e| source_error(path, e))?;
    import_reader(store, file, &path.display().to_string(), options)
}

/// classify a failure to reach a source path
pub(crate) fn source_error(path: &Path, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::NotFound {
        Error::SourceNotFound(path.to_path_buf())
    } else {
        Error::SourceRead {
            source_name: path.display().to_string(),
            offset: 0,
            source,
        }
    }
}

/// chunk a byte stream and build its file DAG
pub fn import_reader<S, R>(
    store: &S,
    reader: R,
    source_name: &str,
    options: &ImportOptions,
) -> Result<ImportResult>
where
    S: BlockStore + ?Sized,
    R: Read,
{
    let mut layout = BalancedLayout::new(store, options.max_links);
    for chunk in Chunker::new(reader, options.chunk_size, source_name) {
        layout.push_chunk(chunk?)?;
    }
    let result = layout.finish()?;

    tracing::debug!(source = source_name, cid = %result.cid, bytes = result.bytes, "imported file");

    Ok(result)
}
