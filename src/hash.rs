use cid::multihash::Multihash;
use cid::Cid;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// multicodec code for sha2-256
pub const SHA2_256: u64 = 0x12;

/// digest length of sha2-256 in bytes
pub const SHA2_256_LEN: usize = 32;

/// compute the CIDv0 of an encoded node
///
/// the identifier is the multihash `0x12 0x20 <sha256(bytes)>`, which renders
/// as a base-58 `Qm...` string.
pub fn compute_cid(encoded: &[u8]) -> Result<Cid> {
    let digest: [u8; SHA2_256_LEN] = Sha256::digest(encoded).into();
    cid_from_digest(&digest)
}

/// wrap a raw sha2-256 digest into a CIDv0
pub fn cid_from_digest(digest: &[u8; SHA2_256_LEN]) -> Result<Cid> {
    let mh = Multihash::<64>::wrap(SHA2_256, digest)
        .map_err(|e| Error::InvalidCid(e.to_string()))?;
    Cid::new_v0(mh).map_err(|e| Error::InvalidCid(e.to_string()))
}

/// parse a CID from its string form
pub fn parse_cid(s: &str) -> Result<Cid> {
    Cid::try_from(s).map_err(|e| Error::InvalidCid(format!("{}: {}", s, e)))
}

/// check that `encoded` hashes to `cid`
///
/// only sha2-256 identifiers can be verified; others are accepted as-is.
pub fn verify_cid(cid: &Cid, encoded: &[u8]) -> bool {
    if cid.hash().code() != SHA2_256 {
        return true;
    }
    Sha256::digest(encoded).as_slice() == cid.hash().digest()
}

/// split a CID into path components for the block store
/// returns (first 2 hex chars of the digest, remaining hex chars)
pub fn to_path_components(cid: &Cid) -> (String, String) {
    let hex = hex::encode(cid.hash().digest());
    (hex[..2].to_string(), hex[2..].to_string())
}

/// inverse of [`to_path_components`] for sha2-256 blocks
pub fn from_path_components(dir: &str, file: &str) -> Option<Cid> {
    let bytes = hex::decode(format!("{}{}", dir, file)).ok()?;
    let digest: [u8; SHA2_256_LEN] = bytes.try_into().ok()?;
    cid_from_digest(&digest).ok()
}
