use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use cid::Cid;

use crate::error::{Error, IoResultExt, Result};
use crate::ops::export::{export, ContentStream};
use crate::store::BlockStore;

/// counts of what `get` wrote
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// materialize the DAG rooted at `cid` at `dest`
///
/// a directory root becomes `dest` itself, which must be absent or empty.
/// a file root is written to `dest`, or to `dest/<cid>` when `dest` is an
/// empty directory. stops at the first entry that fails to export; a file
/// only appears at its target once all of its contents were written.
pub fn get<S>(store: &S, cid: &Cid, dest: &Path) -> Result<GetStats>
where
    S: BlockStore + ?Sized,
{
    if dest.is_dir() {
        let is_empty = dest.read_dir().with_path(dest)?.next().is_none();
        if !is_empty {
            return Err(Error::TargetNotEmpty(dest.to_path_buf()));
        }
    } else if dest.exists() {
        return Err(Error::TargetNotEmpty(dest.to_path_buf()));
    }

    let root = cid.to_string();
    let mut stats = GetStats::default();

    for entry in export(store, *cid) {
        let entry = entry?;
        let target = target_path(dest, &root, &entry.path, entry.is_dir());

        match entry.content {
            None => {
                fs::create_dir_all(&target).with_path(&target)?;
                stats.directories += 1;
            }
            Some(content) => {
                stats.bytes += write_file(&target, content)?;
                stats.files += 1;
            }
        }
        tracing::debug!(path = %target.display(), "materialized entry");
    }

    Ok(stats)
}

// stream into a sibling temp file, then rename it over `target`
fn write_file<S>(target: &Path, content: ContentStream<'_, S>) -> Result<u64>
where
    S: BlockStore + ?Sized,
{
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_path(parent)?;

    let tmp_path = parent.join(format!(".dagfs-{}.partial", uuid::Uuid::new_v4()));
    let result = write_tmp(&tmp_path, content)
        .and_then(|written| fs::rename(&tmp_path, target).with_path(target).map(|_| written));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_tmp<S>(tmp_path: &Path, content: ContentStream<'_, S>) -> Result<u64>
where
    S: BlockStore + ?Sized,
{
    let mut file = File::create(tmp_path).with_path(tmp_path)?;
    let mut written = 0u64;
    for chunk in content {
        let chunk = chunk?;
        file.write_all(&chunk).with_path(tmp_path)?;
        written += chunk.len() as u64;
    }
    file.sync_all().with_path(tmp_path)?;
    Ok(written)
}

// map an export path (rooted at the cid string) under dest
fn target_path(dest: &Path, root: &str, path: &str, is_dir: bool) -> PathBuf {
    let rel = path
        .strip_prefix(root)
        .unwrap_or(path)
        .trim_start_matches('/');
    if !rel.is_empty() {
        dest.join(rel)
    } else if !is_dir && dest.is_dir() {
        dest.join(root)
    } else {
        dest.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::import::{import, ImportOptions};
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    #[test]
    fn test_get_directory_roundtrip() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("top.txt"), b"top level").unwrap();
        fs::create_dir(src.path().join("empty")).unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/b/deep.txt"), vec![7u8; 5000]).unwrap();

        let store = MemoryStore::new();
        let options = ImportOptions::default().with_recursive(true).with_chunk_size(1024);
        let result = import(&store, src.path(), &options).unwrap();

        let out = tempdir().unwrap();
        let dest = out.path().join("restored");
        let stats = get(&store, &result.cid, &dest).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.bytes, 5009);
        assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top level");
        assert_eq!(
            fs::read(dest.join("a/b/deep.txt")).unwrap(),
            vec![7u8; 5000]
        );
        assert!(dest.join("empty").is_dir());

        // importing the restored tree gives the same root
        let again = import(&store, dest.as_path(), &options).unwrap();
        assert_eq!(again.cid, result.cid);
    }

    #[test]
    fn test_get_file_into_empty_dir() {
        let store = MemoryStore::new();
        let result = import(&store, &b"just a file"[..], &ImportOptions::default()).unwrap();

        let out = tempdir().unwrap();
        let stats = get(&store, &result.cid, out.path()).unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(
            fs::read(out.path().join(result.cid.to_string())).unwrap(),
            b"just a file"
        );
    }

    #[test]
    fn test_get_file_to_new_path() {
        let store = MemoryStore::new();
        let result = import(&store, &b"named"[..], &ImportOptions::default()).unwrap();

        let out = tempdir().unwrap();
        let dest = out.path().join("named.txt");
        get(&store, &result.cid, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"named");
    }

    #[test]
    fn test_get_refuses_non_empty_target() {
        let store = MemoryStore::new();
        let result = import(&store, &b"x"[..], &ImportOptions::default()).unwrap();

        let out = tempdir().unwrap();
        fs::write(out.path().join("existing"), b"keep me").unwrap();
        assert!(matches!(
            get(&store, &result.cid, out.path()),
            Err(Error::TargetNotEmpty(_))
        ));
        assert!(matches!(
            get(&store, &result.cid, &out.path().join("existing")),
            Err(Error::TargetNotEmpty(_))
        ));
    }

    #[test]
    fn test_get_leaves_no_partial_file() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("a.txt"), b"abcdefghij").unwrap();

        let store = MemoryStore::new();
        let options = ImportOptions::default().with_recursive(true).with_chunk_size(4);
        let result = import(&store, src.path(), &options).unwrap();

        let dir = store.get(&result.cid).unwrap();
        let file = store.get(&dir.links()[0].cid).unwrap();
        assert!(store.remove(&file.links()[2].cid));

        let out = tempdir().unwrap();
        let dest = out.path().join("restored");
        assert!(matches!(get(&store, &result.cid, &dest), Err(Error::NotFound(_))));
        assert!(!dest.join("a.txt").exists());
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_get_missing_root() {
        let store = MemoryStore::new();
        let cid = crate::hash::compute_cid(b"nowhere").unwrap();
        let out = tempdir().unwrap();
        assert!(matches!(
            get(&store, &cid, &out.path().join("dest")),
            Err(Error::NotFound(_))
        ));
    }
}
