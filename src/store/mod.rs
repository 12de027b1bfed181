//! block storage seam used by import and export

mod memory;

pub use memory::MemoryStore;

use cid::Cid;

use crate::error::Result;
use crate::object::{block_exists, read_block, write_block};
use crate::repo::Repo;
use crate::types::Node;

/// content-addressed node storage
///
/// `put` must be idempotent and a successful `put` must be visible to any
/// later `get` of the returned identifier.
pub trait BlockStore {
    /// persist a node, returning its identifier
    fn put(&self, node: &Node) -> Result<Cid>;

    /// fetch a node; unknown identifiers yield `Error::NotFound`
    fn get(&self, cid: &Cid) -> Result<Node>;

    /// check whether a node is present
    fn has(&self, cid: &Cid) -> Result<bool>;
}

impl<S: BlockStore + ?Sized> BlockStore for &S {
    fn put(&self, node: &Node) -> Result<Cid> {
        (**self).put(node)
    }

    fn get(&self, cid: &Cid) -> Result<Node> {
        (**self).get(cid)
    }

    fn has(&self, cid: &Cid) -> Result<bool> {
        (**self).has(cid)
    }
}

impl BlockStore for Repo {
    fn put(&self, node: &Node) -> Result<Cid> {
        write_block(self, &node.encode()?)
    }

    fn get(&self, cid: &Cid) -> Result<Node> {
        Node::decode(&read_block(self, cid)?)
    }

    fn has(&self, cid: &Cid) -> Result<bool> {
        Ok(block_exists(self, cid))
    }
}
