use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::ops::import::{import_file, source_error, ImportOptions, ImportResult};
use crate::store::BlockStore;
use crate::types::{validate_link_name, Envelope, Link, Node};

/// import a directory tree, depth-first, children before parents
///
/// entries are linked in file-name order. symlinks and special files are
/// skipped. the first failing child aborts the whole directory.
pub fn import_directory<S>(store: &S, dir: &Path, options: &ImportOptions) -> Result<ImportResult>
where
    S: BlockStore + ?Sized,
{
    let mut links = Vec::new();
    let mut bytes = 0u64;
    let mut nodes = 0u64;

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk error"));
            source_error(&path, source)
        })?;

        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| {
                Error::InvalidEntryName(format!(
                    "non-utf8 name: {}",
                    entry.file_name().to_string_lossy()
                ))
            })?
            .to_string();
        validate_link_name(&name)?;

        let file_type = entry.file_type();
        let child = if file_type.is_dir() {
            import_directory(store, entry.path(), options)?
        } else if file_type.is_file() {
            import_file(store, entry.path(), options)?
        } else {
            tracing::warn!(
                path = %entry.path().display(),
                "skipping entry that is not a file or directory"
            );
            continue;
        };

        bytes += child.bytes;
        nodes += child.nodes;
        links.push(Link::new(name, child.cid, child.size));
    }

    let node = Node::with_envelope(&Envelope::directory(), links)?;
    let cid = store.put(&node)?;
    let size = node.cumulative_size()?;

    tracing::debug!(
        path = %dir.display(),
        %cid,
        entries = node.links().len(),
        "stored directory node"
    );

    Ok(ImportResult {
        cid,
        size,
        bytes,
        nodes: nodes + 1,
    })
}
