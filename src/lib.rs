//! dagfs - files as merkle DAGs
//!
//! splits byte streams and directory trees into a DAG of immutable,
//! content-addressed nodes, and walks such a DAG back into byte streams and
//! directory layouts. node and envelope encodings are byte-compatible with
//! dag-pb / unixfs, so identifiers are CIDv0 strings (`Qm...`).
//!
//! # Core concepts
//!
//! - **Node**: opaque payload plus ordered, named, sized links to children
//! - **Envelope**: the typed payload of a node (raw, file, directory, ...)
//!   with per-child block sizes for offset computation
//! - **BlockStore**: where nodes live; a filesystem [`Repo`] or a [`MemoryStore`]
//!
//! # Layout
//!
//! files are cut into fixed-size chunks (256 KiB by default). a file that
//! fits in one chunk is a single raw leaf; larger files get `File` parents
//! of up to 174 links each, layered until one root remains. directories link
//! their entries by name, sorted by file name.
//!
//! # Example usage
//!
//! ```
//! use dagfs::{ops, MemoryStore};
//! use std::io::Read;
//!
//! let store = MemoryStore::new();
//! let result = ops::import(&store, &b"hello world"[..], &ops::ImportOptions::default()).unwrap();
//! assert_eq!(result.cid.to_string(), "QmSBXgu23B6wbx5mERMyiNd34zBksCvSEpN24Zawa1uq1D");
//!
//! let mut contents = String::new();
//! ops::cat(&store, &result.cid).unwrap().read_to_string(&mut contents).unwrap();
//! assert_eq!(contents, "hello world");
//! ```

mod config;
mod error;
mod hash;
mod repo;

pub mod chunker;
pub mod object;
pub mod ops;
pub mod store;
pub mod types;

pub use cid::Cid;
pub use config::{Config, ImportConfig};
pub use error::{Error, IoResultExt, Result};
pub use hash::{compute_cid, parse_cid, verify_cid};
pub use repo::Repo;
pub use store::{BlockStore, MemoryStore};
pub use types::{DataType, Envelope, Link, Node};
