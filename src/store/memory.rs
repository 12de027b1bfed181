use std::collections::HashMap;

use bytes::Bytes;
use cid::Cid;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::hash::compute_cid;
use crate::store::BlockStore;
use crate::types::Node;

/// in-memory block store keyed by identifier
///
/// blocks are kept in their encoded form so every `get` goes through the
/// node decoder, exactly like an on-disk store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<Cid, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// store already-encoded node bytes
    pub fn put_block(&self, encoded: impl Into<Bytes>) -> Result<Cid> {
        let encoded = encoded.into();
        let cid = compute_cid(&encoded)?;
        self.blocks.write().entry(cid).or_insert(encoded);
        Ok(cid)
    }

    /// fetch encoded node bytes
    pub fn get_block(&self, cid: &Cid) -> Option<Bytes> {
        self.blocks.read().get(cid).cloned()
    }

    /// remove a block, returning whether it was present
    pub fn remove(&self, cid: &Cid) -> bool {
        self.blocks.write().remove(cid).is_some()
    }

    /// number of stored blocks
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl BlockStore for MemoryStore {
    fn put(&self, node: &Node) -> Result<Cid> {
        self.put_block(node.encode()?)
    }

    fn get(&self, cid: &Cid) -> Result<Node> {
        let encoded = self.get_block(cid).ok_or(Error::NotFound(*cid))?;
        Node::decode(&encoded)
    }

    fn has(&self, cid: &Cid) -> Result<bool> {
        Ok(self.blocks.read().contains_key(cid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_block_dedup() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        let a = store.put_block(vec![0x0a, 0x02, 0x08, 0x01]).unwrap();
        let b = store.put_block(vec![0x0a, 0x02, 0x08, 0x01]).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_block(&a).unwrap().len(), 4);
    }

    #[test]
    fn test_remove() {
        let store = MemoryStore::new();
        let cid = store.put_block(vec![0x0a, 0x02, 0x08, 0x01]).unwrap();
        assert!(store.remove(&cid));
        assert!(!store.remove(&cid));
        assert!(matches!(store.get(&cid), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_get_undecodable_block() {
        let store = MemoryStore::new();
        let cid = store.put_block(vec![0xff]).unwrap();
        assert!(matches!(store.get(&cid), Err(Error::MalformedNode(_))));
    }
}
