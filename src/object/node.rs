use bytes::Bytes;
use ipld_core::codec::Codec;
use ipld_dagpb::{DagPbCodec, PbLink, PbNode};

use crate::error::{Error, Result};
use crate::types::{Link, Node};

impl From<&Link> for PbLink {
    fn from(link: &Link) -> Self {
        PbLink {
            cid: link.cid,
            name: Some(link.name.clone()),
            size: Some(link.size),
        }
    }
}

impl From<PbLink> for Link {
    fn from(link: PbLink) -> Self {
        Link {
            name: link.name.unwrap_or_default(),
            cid: link.cid,
            size: link.size.unwrap_or(0),
        }
    }
}

fn to_pb(node: &Node) -> PbNode {
    PbNode {
        links: node.links().iter().map(Into::into).collect(),
        data: (!node.data().is_empty()).then(|| node.data().clone()),
    }
}

/// serialize a node to its canonical wire bytes
///
/// links go first, then the payload when it is non-empty. named links are
/// written in byte order of their names; unnamed links keep their order.
pub fn encode_node(node: &Node) -> Result<Vec<u8>> {
    DagPbCodec::encode_to_vec(&to_pb(node))
        .map_err(|e| Error::MalformedNode(format!("encode: {}", e)))
}

/// length of the encoded node in bytes
pub fn encoded_node_len(node: &Node) -> Result<usize> {
    encode_node(node).map(|bytes| bytes.len())
}

/// parse wire bytes into a node
pub fn decode_node(bytes: &[u8]) -> Result<Node> {
    let pb: PbNode =
        <DagPbCodec as Codec<PbNode>>::decode_from_slice(bytes).map_err(|e| Error::MalformedNode(e.to_string()))?;

    Ok(Node::new(
        pb.data.unwrap_or_else(Bytes::new),
        pb.links.into_iter().map(Into::into).collect(),
    ))
}
