use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// default chunk length: 256 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// largest accepted chunk length: 1 MiB
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

// size of each read from the source
const READ_BUF_SIZE: usize = 64 * 1024;

/// fixed-size splitter over a byte source
///
/// every chunk except the last is exactly `chunk_size` bytes; the last is
/// shorter and never empty. an empty source yields nothing. short reads from
/// the source are coalesced, so chunk boundaries depend only on the bytes.
/// memory held per chunk tracks the bytes actually read, not `chunk_size`.
pub struct Chunker<R> {
    reader: R,
    chunk_size: usize,
    scratch: Box<[u8]>,
    source_name: String,
    offset: u64,
    done: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(reader: R, chunk_size: usize, source_name: impl Into<String>) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            reader,
            chunk_size,
            scratch: vec![0; chunk_size.min(READ_BUF_SIZE)].into_boxed_slice(),
            source_name: source_name.into(),
            offset: 0,
            done: false,
        }
    }

    fn fill(&mut self) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::new();

        while buf.len() < self.chunk_size {
            let want = (self.chunk_size - buf.len()).min(self.scratch.len());
            match self.reader.read(&mut self.scratch[..want]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => {
                    buf.extend_from_slice(&self.scratch[..n]);
                    self.offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    self.done = true;
                    return Err(Error::SourceRead {
                        source_name: self.source_name.clone(),
                        offset: self.offset,
                        source,
                    });
                }
            }
        }

        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.fill().transpose()
    }
}
