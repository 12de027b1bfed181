use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes};
use cid::Cid;

use crate::error::{Error, Result};
use crate::store::BlockStore;
use crate::types::{validate_link_name, DataType, Envelope, Node};

/// one exported file or empty directory
pub struct ExportEntry<'s, S: BlockStore + ?Sized> {
    /// root identifier followed by link names, joined with `/`
    pub path: String,
    pub cid: Cid,
    /// file contents; `None` marks a directory
    pub content: Option<ContentStream<'s, S>>,
}

impl<S: BlockStore + ?Sized> ExportEntry<'_, S> {
    pub fn is_dir(&self) -> bool {
        self.content.is_none()
    }
}

impl<S: BlockStore + ?Sized> fmt::Debug for ExportEntry<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportEntry")
            .field("path", &self.path)
            .field("cid", &self.cid)
            .field("size", &self.content.as_ref().map(|c| c.size()))
            .finish()
    }
}

enum Frame {
    Visit { path: String, cid: Cid },
    Failed(Error),
}

/// depth-first walk over a DAG, yielding files and empty directories
///
/// non-empty directories are not yielded themselves; their entries carry
/// their path. an error only consumes the entry it belongs to and the walk
/// continues with the next sibling.
pub struct Exporter<'s, S: BlockStore + ?Sized> {
    store: &'s S,
    stack: Vec<Frame>,
}

impl<'s, S: BlockStore + ?Sized> Exporter<'s, S> {
    fn visit(&mut self, path: String, cid: Cid) -> Result<Option<ExportEntry<'s, S>>> {
        let node = self.store.get(&cid)?;
        let envelope = node.envelope()?;

        match envelope.data_type {
            DataType::Raw | DataType::File => {
                let content = ContentStream::new(self.store, &node, envelope)?;
                tracing::debug!(%path, size = content.size(), "exporting file");
                Ok(Some(ExportEntry {
                    path,
                    cid,
                    content: Some(content),
                }))
            }
            DataType::Directory if node.links().is_empty() => {
                tracing::debug!(%path, "exporting empty directory");
                Ok(Some(ExportEntry {
                    path,
                    cid,
                    content: None,
                }))
            }
            DataType::Directory => {
                for link in node.links().iter().rev() {
                    let frame = match validate_link_name(&link.name) {
                        Ok(()) => Frame::Visit {
                            path: format!("{}/{}", path, link.name),
                            cid: link.cid,
                        },
                        Err(e) => Frame::Failed(Error::MalformedNode(format!(
                            "bad link name under {}: {}",
                            path, e
                        ))),
                    };
                    self.stack.push(frame);
                }
                Ok(None)
            }
            other => Err(Error::UnsupportedType(other)),
        }
    }
}

impl<'s, S: BlockStore + ?Sized> Iterator for Exporter<'s, S> {
    type Item = Result<ExportEntry<'s, S>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            let result = match frame {
                Frame::Visit { path, cid } => self.visit(path, cid),
                Frame::Failed(e) => Err(e),
            };
            match result {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping export entry");
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// walk the DAG rooted at `cid`
pub fn export<S: BlockStore + ?Sized>(store: &S, cid: Cid) -> Exporter<'_, S> {
    Exporter {
        store,
        stack: vec![Frame::Visit {
            path: cid.to_string(),
            cid,
        }],
    }
}

/// stream the contents of the file rooted at `cid`
pub fn cat<'s, S>(store: &'s S, cid: &Cid) -> Result<ContentStream<'s, S>>
where
    S: BlockStore + ?Sized,
{
    let node = store.get(cid)?;
    let envelope = node.envelope()?;
    if !envelope.data_type.is_content() {
        return Err(Error::UnsupportedType(envelope.data_type));
    }
    ContentStream::new(store, &node, envelope)
}

// upper bound on what `read_all` reserves up front
const READ_ALL_RESERVE: u64 = 1 << 20;

enum Segment {
    Inline(Bytes),
    Block { cid: Cid, expected: Option<u64> },
}

/// lazily reassembled file contents
///
/// blocks are fetched one at a time, in link order, only when the previous
/// bytes have been handed out. the first error ends the stream.
pub struct ContentStream<'s, S: BlockStore + ?Sized> {
    store: &'s S,
    /// pending segments, next on top
    segments: Vec<Segment>,
    current: Bytes,
    size: u64,
    failed: bool,
}

impl<'s, S: BlockStore + ?Sized> ContentStream<'s, S> {
    fn new(store: &'s S, root: &Node, envelope: Envelope) -> Result<Self> {
        let size = envelope.file_size();
        let mut stream = Self {
            store,
            segments: Vec::new(),
            current: Bytes::new(),
            size,
            failed: false,
        };
        stream.expand(root, envelope)?;
        Ok(stream)
    }

    /// logical file size recorded in the root envelope
    pub fn size(&self) -> u64 {
        self.size
    }

    /// read the remaining contents into memory
    ///
    /// the recorded size is only a hint for the initial reservation; a root
    /// that overstates it fails once the mismatching block is fetched.
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size.min(READ_ALL_RESERVE) as usize);
        for chunk in Iterator::by_ref(&mut self) {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    // queue a node's inline data and children in front of everything pending
    fn expand(&mut self, node: &Node, envelope: Envelope) -> Result<()> {
        let links = node.links();
        if !envelope.block_sizes.is_empty() && envelope.block_sizes.len() != links.len() {
            return Err(Error::MalformedNode(format!(
                "{} block sizes for {} links",
                envelope.block_sizes.len(),
                links.len()
            )));
        }

        for (i, link) in links.iter().enumerate().rev() {
            self.segments.push(Segment::Block {
                cid: link.cid,
                expected: envelope.block_sizes.get(i).copied(),
            });
        }
        if !envelope.data.is_empty() {
            self.segments.push(Segment::Inline(envelope.data));
        }
        Ok(())
    }

    fn fetch(&mut self, cid: Cid, expected: Option<u64>) -> Result<()> {
        let node = self.store.get(&cid)?;
        let envelope = node.envelope()?;
        if !envelope.data_type.is_content() {
            return Err(Error::MalformedNode(format!(
                "file block {} has type {}",
                cid, envelope.data_type
            )));
        }
        if let Some(expected) = expected {
            let actual = envelope.file_size();
            if actual != expected {
                return Err(Error::MalformedNode(format!(
                    "block {} holds {} bytes, parent records {}",
                    cid, actual, expected
                )));
            }
        }
        self.expand(&node, envelope)
    }
}

impl<S: BlockStore + ?Sized> Iterator for ContentStream<'_, S> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_empty() {
            return Some(Ok(std::mem::take(&mut self.current)));
        }
        if self.failed {
            return None;
        }
        while let Some(segment) = self.segments.pop() {
            match segment {
                Segment::Inline(bytes) => return Some(Ok(bytes)),
                Segment::Block { cid, expected } => {
                    if let Err(e) = self.fetch(cid, expected) {
                        self.failed = true;
                        self.segments.clear();
                        return Some(Err(e));
                    }
                }
            }
        }
        None
    }
}

impl<S: BlockStore + ?Sized> Read for ContentStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current.is_empty() {
            match self.next() {
                Some(Ok(bytes)) => self.current = bytes,
                Some(Err(e)) => return Err(io::Error::other(e)),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::import::{import, ImportOptions};
    use crate::store::MemoryStore;
    use crate::types::Link;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 13 % 256) as u8).collect()
    }

    fn collect<S>(exporter: Exporter<'_, S>) -> HashMap<String, Option<Vec<u8>>>
    where
        S: BlockStore + ?Sized,
    {
        exporter
            .map(|entry| {
                let entry = entry.unwrap();
                let content = entry.content.map(|c| c.read_all().unwrap());
                (entry.path, content)
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_sizes() {
        for len in [0, 1, 262144, 200, 1200 * 1024] {
            let store = MemoryStore::new();
            let data = pattern(len);
            let result = import(&store, data.clone(), &ImportOptions::default()).unwrap();

            let mut entries: Vec<_> = export(&store, result.cid).collect();
            assert_eq!(entries.len(), 1);
            let entry = entries.pop().unwrap().unwrap();
            assert_eq!(entry.path, result.cid.to_string());
            let content = entry.content.unwrap();
            assert_eq!(content.size(), len as u64);
            assert_eq!(content.read_all().unwrap(), data, "length {}", len);
        }
    }

    #[test]
    fn test_read_impl_small_buffers() {
        let store = MemoryStore::new();
        let data = pattern(10_000);
        let options = ImportOptions::default().with_chunk_size(333).with_max_links(4);
        let result = import(&store, data.clone(), &options).unwrap();

        let mut stream = cat(&store, &result.cid).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 17];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_stream_is_pull_based() {
        let store = MemoryStore::new();
        let options = ImportOptions::default().with_chunk_size(4);
        let result = import(&store, &b"abcdefghij"[..], &options).unwrap();

        let mut stream = cat(&store, &result.cid).unwrap();
        assert_eq!(stream.next().unwrap().unwrap(), &b"abcd"[..]);

        // later blocks are only fetched on demand
        let root = store.get(&result.cid).unwrap();
        assert!(store.remove(&root.links()[2].cid));
        assert_eq!(stream.next().unwrap().unwrap(), &b"efgh"[..]);
        assert!(matches!(stream.next(), Some(Err(Error::NotFound(_)))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_directory_paths() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let small = pattern(200);
        fs::write(root.join("200Bytes.txt"), &small).unwrap();
        fs::create_dir(root.join("dir-another")).unwrap();
        fs::create_dir_all(root.join("level-1/level-2")).unwrap();
        fs::write(root.join("level-1/200Bytes.txt"), &small).unwrap();

        let store = MemoryStore::new();
        let options = ImportOptions::default().with_recursive(true);
        let result = import(&store, root, &options).unwrap();
        let base = result.cid.to_string();

        let entries = collect(export(&store, result.cid));
        let mut paths: Vec<_> = entries.keys().cloned().collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                format!("{}/200Bytes.txt", base),
                format!("{}/dir-another", base),
                format!("{}/level-1/200Bytes.txt", base),
                format!("{}/level-1/level-2", base),
            ]
        );
        assert_eq!(
            entries[&format!("{}/200Bytes.txt", base)],
            Some(small.clone())
        );
        assert_eq!(
            entries[&format!("{}/level-1/200Bytes.txt", base)],
            Some(small)
        );
        assert_eq!(entries[&format!("{}/dir-another", base)], None);
        assert_eq!(entries[&format!("{}/level-1/level-2", base)], None);
    }

    #[test]
    fn test_entries_follow_link_order() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/inner"), b"1").unwrap();
        fs::write(dir.path().join("a"), b"2").unwrap();
        fs::write(dir.path().join("c"), b"3").unwrap();

        let store = MemoryStore::new();
        let options = ImportOptions::default().with_recursive(true);
        let result = import(&store, dir.path(), &options).unwrap();
        let base = result.cid.to_string();

        let paths: Vec<_> = export(&store, result.cid)
            .map(|e| e.unwrap().path)
            .collect();
        assert_eq!(
            paths,
            vec![
                format!("{}/a", base),
                format!("{}/b/inner", base),
                format!("{}/c", base),
            ]
        );
    }

    #[test]
    fn test_empty_root_directory() {
        let store = MemoryStore::new();
        let cid = store
            .put(&Node::with_envelope(&Envelope::directory(), vec![]).unwrap())
            .unwrap();

        let entries: Vec<_> = export(&store, cid).map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_dir());
        assert_eq!(entries[0].path, cid.to_string());
    }

    #[test]
    fn test_missing_root() {
        let store = MemoryStore::new();
        let cid = crate::hash::compute_cid(b"absent").unwrap();

        let mut exporter = export(&store, cid);
        assert!(matches!(exporter.next(), Some(Err(Error::NotFound(c))) if c == cid));
        assert!(exporter.next().is_none());
    }

    #[test]
    fn test_missing_child_isolated() {
        let store = MemoryStore::new();
        let a = store
            .put(&Node::with_envelope(&Envelope::raw(&b"aaa"[..]), vec![]).unwrap())
            .unwrap();
        let gone = crate::hash::compute_cid(b"gone").unwrap();
        let c = store
            .put(&Node::with_envelope(&Envelope::raw(&b"ccc"[..]), vec![]).unwrap())
            .unwrap();
        let dir = Node::with_envelope(
            &Envelope::directory(),
            vec![
                Link::new("a", a, 11),
                Link::new("b", gone, 11),
                Link::new("c", c, 11),
            ],
        )
        .unwrap();
        let root = store.put(&dir).unwrap();

        let results: Vec<_> = export(&store, root).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::NotFound(_))));
        let last = results.into_iter().nth(2).unwrap().unwrap();
        assert_eq!(last.content.unwrap().read_all().unwrap(), b"ccc");
    }

    #[test]
    fn test_bad_link_names_rejected() {
        let store = MemoryStore::new();
        let leaf = store
            .put(&Node::with_envelope(&Envelope::raw(&b"x"[..]), vec![]).unwrap())
            .unwrap();
        let dir = Node::with_envelope(
            &Envelope::directory(),
            vec![
                Link::new("..", leaf, 9),
                Link::new("a/b", leaf, 9),
                Link::new("ok", leaf, 9),
            ],
        )
        .unwrap();
        let root = store.put(&dir).unwrap();

        let results: Vec<_> = export(&store, root).collect();
        assert!(matches!(results[0], Err(Error::MalformedNode(_))));
        assert!(matches!(results[1], Err(Error::MalformedNode(_))));
        assert!(results[2].as_ref().unwrap().path.ends_with("/ok"));
    }

    #[test]
    fn test_unsupported_types() {
        let store = MemoryStore::new();
        let symlink = Envelope {
            data_type: DataType::Symlink,
            data: Bytes::from_static(b"target"),
            block_sizes: vec![],
        };
        let cid = store.put(&Node::with_envelope(&symlink, vec![]).unwrap()).unwrap();

        let mut exporter = export(&store, cid);
        assert!(matches!(
            exporter.next(),
            Some(Err(Error::UnsupportedType(DataType::Symlink)))
        ));

        let dir = store
            .put(&Node::with_envelope(&Envelope::directory(), vec![]).unwrap())
            .unwrap();
        assert!(matches!(
            cat(&store, &dir),
            Err(Error::UnsupportedType(DataType::Directory))
        ));
    }

    #[test]
    fn test_block_size_mismatch() {
        let store = MemoryStore::new();
        let leaf_node = Node::with_envelope(&Envelope::raw(&b"abc"[..]), vec![]).unwrap();
        let leaf = store.put(&leaf_node).unwrap();

        // parent claims the child holds 5 bytes
        let parent = Node::with_envelope(
            &Envelope::file(vec![5]),
            vec![Link::unnamed(leaf, leaf_node.cumulative_size().unwrap())],
        )
        .unwrap();
        let root = store.put(&parent).unwrap();
        let mut stream = cat(&store, &root).unwrap();
        assert!(matches!(stream.next(), Some(Err(Error::MalformedNode(_)))));

        // block sizes that do not line up with the links
        let uneven = Node::with_envelope(
            &Envelope::file(vec![3, 3]),
            vec![Link::unnamed(leaf, leaf_node.cumulative_size().unwrap())],
        )
        .unwrap();
        let root = store.put(&uneven).unwrap();
        assert!(matches!(cat(&store, &root), Err(Error::MalformedNode(_))));
    }

    #[test]
    fn test_read_all_with_overstated_size() {
        let store = MemoryStore::new();
        let leaf_node = Node::with_envelope(&Envelope::raw(&b"abc"[..]), vec![]).unwrap();
        let leaf = store.put(&leaf_node).unwrap();

        let parent = Node::with_envelope(
            &Envelope::file(vec![1 << 62]),
            vec![Link::unnamed(leaf, leaf_node.cumulative_size().unwrap())],
        )
        .unwrap();
        let root = store.put(&parent).unwrap();

        let stream = cat(&store, &root).unwrap();
        assert_eq!(stream.size(), 1 << 62);
        assert!(matches!(stream.read_all(), Err(Error::MalformedNode(_))));
    }

    #[test]
    fn test_cat_read_to_string() {
        let store = MemoryStore::new();
        let result = import(&store, &b"hello world"[..], &ImportOptions::default()).unwrap();

        let mut contents = String::new();
        cat(&store, &result.cid).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello world");
    }
}
