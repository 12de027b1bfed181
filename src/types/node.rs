use bytes::Bytes;
use cid::Cid;

use crate::error::{Error, Result};
use crate::types::Envelope;

/// an immutable DAG node: opaque payload plus ordered links
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    data: Bytes,
    links: Vec<Link>,
}

impl Node {
    pub fn new(data: impl Into<Bytes>, links: Vec<Link>) -> Self {
        Self {
            data: data.into(),
            links,
        }
    }

    /// build a node whose payload is the encoded envelope
    pub fn with_envelope(envelope: &Envelope, links: Vec<Link>) -> Result<Self> {
        Ok(Self::new(envelope.encode()?, links))
    }

    /// raw payload bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// links in stored order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// decode the payload as a filesystem envelope
    pub fn envelope(&self) -> Result<Envelope> {
        Envelope::decode(&self.data)
    }

    /// encode to the node wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        crate::object::encode_node(self)
    }

    /// decode from the node wire format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        crate::object::decode_node(bytes)
    }

    /// length of the encoded node in bytes
    pub fn encoded_len(&self) -> Result<usize> {
        crate::object::encoded_node_len(self)
    }

    /// content identifier of the encoded node
    pub fn cid(&self) -> Result<Cid> {
        crate::hash::compute_cid(&self.encode()?)
    }

    /// encoded size of this node plus the cumulative sizes of everything it links to
    pub fn cumulative_size(&self) -> Result<u64> {
        let own = self.encoded_len()? as u64;
        Ok(self.links.iter().fold(own, |acc, l| acc.saturating_add(l.size)))
    }
}

/// a named, sized reference to a child node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// entry name; empty for file chunks
    pub name: String,
    pub cid: Cid,
    /// cumulative size of the subtree rooted at the child
    pub size: u64,
}

impl Link {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            size,
        }
    }

    /// unnamed link, as used between file nodes
    pub fn unnamed(cid: Cid, size: u64) -> Self {
        Self::new(String::new(), cid, size)
    }
}

/// validate a directory link name
///
/// names become path components on export, so they must be a single
/// non-special component.
pub fn validate_link_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName("empty name".to_string()));
    }
    if name.contains('/') {
        return Err(Error::InvalidEntryName(format!(
            "name contains '/': {}",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName(format!(
            "name contains null byte: {}",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidEntryName(format!("reserved name: {}", name)));
    }
    Ok(())
}
