use bytes::Bytes;
use cid::Cid;

use crate::error::Result;
use crate::ops::import::ImportResult;
use crate::store::BlockStore;
use crate::types::{Envelope, Link, Node};

/// default fan-out of file nodes
pub const DEFAULT_MAX_LINKS: usize = 174;

/// a persisted node waiting to be linked from its parent
#[derive(Clone, Copy, Debug)]
struct Child {
    cid: Cid,
    /// cumulative DAG size, used as the link size
    size: u64,
    /// logical content bytes, used as the block size
    file_size: u64,
}

/// incremental builder for a balanced file DAG
///
/// leaves are fed in order; whenever a level fills up to `max_links` it is
/// collapsed into one `File` node on the level above. only one partial batch
/// per level is held in memory.
pub struct BalancedLayout<'s, S: BlockStore + ?Sized> {
    store: &'s S,
    max_links: usize,
    levels: Vec<Vec<Child>>,
    bytes: u64,
    nodes: u64,
}

impl<'s, S: BlockStore + ?Sized> BalancedLayout<'s, S> {
    pub fn new(store: &'s S, max_links: usize) -> Self {
        Self {
            store,
            max_links: max_links.max(2),
            levels: vec![Vec::new()],
            bytes: 0,
            nodes: 0,
        }
    }

    /// persist a chunk as a leaf and append it
    pub fn push_chunk(&mut self, chunk: Bytes) -> Result<()> {
        let len = chunk.len() as u64;
        let leaf = Node::with_envelope(&Envelope::raw(chunk), vec![])?;
        let child = self.persist(&leaf, len)?;
        self.bytes += len;
        self.push(0, child)
    }

    /// collapse everything pushed so far into a single root
    ///
    /// a single leaf is its own root; no chunks at all yields one empty leaf.
    pub fn finish(mut self) -> Result<ImportResult> {
        if self.levels.iter().all(Vec::is_empty) {
            self.push_chunk(Bytes::new())?;
        }

        let mut depth = 0;
        loop {
            let top = depth + 1 == self.levels.len();
            let level = &self.levels[depth];
            if top && level.len() == 1 {
                let root = level[0];
                return Ok(ImportResult {
                    cid: root.cid,
                    size: root.size,
                    bytes: self.bytes,
                    nodes: self.nodes,
                });
            }
            if !level.is_empty() {
                self.flush(depth)?;
            }
            depth += 1;
        }
    }

    fn push(&mut self, depth: usize, child: Child) -> Result<()> {
        if self.levels.len() == depth {
            self.levels.push(Vec::new());
        }
        self.levels[depth].push(child);
        if self.levels[depth].len() == self.max_links {
            self.flush(depth)?;
        }
        Ok(())
    }

    // link every pending child of `depth` under one new node on `depth + 1`
    fn flush(&mut self, depth: usize) -> Result<()> {
        let children = std::mem::take(&mut self.levels[depth]);

        let envelope = Envelope::file(children.iter().map(|c| c.file_size).collect());
        let file_size = envelope.file_size();
        let links = children
            .iter()
            .map(|c| Link::unnamed(c.cid, c.size))
            .collect();

        let parent = Node::with_envelope(&envelope, links)?;
        let child = self.persist(&parent, file_size)?;
        self.push(depth + 1, child)
    }

    fn persist(&mut self, node: &Node, file_size: u64) -> Result<Child> {
        let cid = self.store.put(node)?;
        let size = node.cumulative_size()?;
        self.nodes += 1;
        tracing::debug!(%cid, size, links = node.links().len(), "stored file node");
        Ok(Child {
            cid,
            size,
            file_size,
        })
    }
}
