use std::fs;

use cid::Cid;
use walkdir::WalkDir;

use crate::error::Result;
use crate::hash::from_path_components;
use crate::repo::Repo;
use crate::store::BlockStore;
use crate::types::DataType;

/// summary of a single node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStat {
    pub cid: Cid,
    pub data_type: DataType,
    /// logical content bytes below this node
    pub file_size: u64,
    /// encoded node plus everything it links to
    pub cumulative_size: u64,
    /// encoded length of this node alone
    pub block_size: usize,
    pub links: usize,
    pub block_sizes: Vec<u64>,
}

/// inspect the node at `cid` without walking its children
pub fn stat<S>(store: &S, cid: &Cid) -> Result<NodeStat>
where
    S: BlockStore + ?Sized,
{
    let node = store.get(cid)?;
    let envelope = node.envelope()?;

    Ok(NodeStat {
        cid: *cid,
        data_type: envelope.data_type,
        file_size: envelope.file_size(),
        cumulative_size: node.cumulative_size()?,
        block_size: node.encoded_len()?,
        links: node.links().len(),
        block_sizes: envelope.block_sizes,
    })
}

/// block counts for a repository
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepoStats {
    pub blocks: usize,
    pub bytes: u64,
    /// files under blocks/ whose path is not a valid identifier
    pub stray_files: usize,
}

/// count stored blocks and their encoded bytes
pub fn repo_stats(repo: &Repo) -> Result<RepoStats> {
    let mut stats = RepoStats::default();
    let dir = repo.blocks_path();
    if !dir.exists() {
        return Ok(stats);
    }

    for entry in WalkDir::new(&dir).min_depth(2).max_depth(2) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable entry in block store");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let parent = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let name = entry.file_name().to_str();
        let valid = match (parent, name) {
            (Some(d), Some(f)) => from_path_components(d, f).is_some(),
            _ => false,
        };
        if !valid {
            stats.stray_files += 1;
            continue;
        }

        stats.blocks += 1;
        if let Ok(meta) = fs::metadata(entry.path()) {
            stats.bytes += meta.len();
        }
    }

    Ok(stats)
}
