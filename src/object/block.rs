use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cid::Cid;

use crate::error::{Error, Result};
use crate::hash::{compute_cid, to_path_components, verify_cid};
use crate::repo::Repo;

fn storage(op: &'static str, target: impl ToString) -> impl FnOnce(io::Error) -> Error {
    let target = target.to_string();
    move |source| Error::Storage { op, target, source }
}

/// write encoded node bytes to the block store
///
/// the identifier is the CIDv0 of `encoded`. writing a block that already
/// exists is a no-op.
pub fn write_block(repo: &Repo, encoded: &[u8]) -> Result<Cid> {
    let cid = compute_cid(encoded)?;

    let (dir, file) = to_path_components(&cid);
    let block_dir = repo.blocks_path().join(&dir);
    let block_path = block_dir.join(&file);

    // dedup: identical content, identical path
    if block_path.exists() {
        return Ok(cid);
    }

    fs::create_dir_all(&block_dir).map_err(storage("put", cid))?;

    // atomic write: temp -> fsync -> rename
    let tmp_path = repo.tmp_path().join(uuid::Uuid::new_v4().to_string());
    {
        let mut tmp_file = File::create(&tmp_path).map_err(storage("put", cid))?;
        tmp_file.write_all(encoded).map_err(storage("put", cid))?;
        tmp_file.sync_all().map_err(storage("put", cid))?;
    }

    fs::rename(&tmp_path, &block_path).map_err(storage("put", cid))?;

    fsync_dir(&block_dir).map_err(storage("put", cid))?;

    Ok(cid)
}

/// read encoded node bytes from the block store, verifying the digest
pub fn read_block(repo: &Repo, cid: &Cid) -> Result<Vec<u8>> {
    let path = block_path(repo, cid);

    let encoded = fs::read(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::NotFound(*cid)
        } else {
            storage("get", cid)(e)
        }
    })?;

    if !verify_cid(cid, &encoded) {
        return Err(Error::CorruptBlock(*cid));
    }

    Ok(encoded)
}

/// get the path to a block
pub fn block_path(repo: &Repo, cid: &Cid) -> PathBuf {
    let (dir, file) = to_path_components(cid);
    repo.blocks_path().join(dir).join(file)
}

/// check if a block exists
pub fn block_exists(repo: &Repo, cid: &Cid) -> bool {
    block_path(repo, cid).exists()
}

fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
