use cid::Cid;

use crate::error::Result;
use crate::store::BlockStore;
use crate::types::DataType;

/// one link of a listed node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LsEntry {
    pub name: String,
    pub cid: Cid,
    /// cumulative size recorded on the link
    pub size: u64,
    /// envelope type of the linked node
    pub data_type: DataType,
}

/// list the links of the node at `cid`, fetching each child for its type
pub fn ls<S>(store: &S, cid: &Cid) -> Result<Vec<LsEntry>>
where
    S: BlockStore + ?Sized,
{
    let node = store.get(cid)?;
    node.links()
        .iter()
        .map(|link| {
            let child = store.get(&link.cid)?;
            Ok(LsEntry {
                name: link.name.clone(),
                cid: link.cid,
                size: link.size,
                data_type: child.envelope()?.data_type,
            })
        })
        .collect()
}
