use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

/// filesystem type carried in a node's envelope
///
/// the discriminants are the wire values of the `Type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Raw = 0,
    Directory = 1,
    File = 2,
    Metadata = 3,
    Symlink = 4,
}

impl DataType {
    /// wire value of this type tag
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// get the type name for display and error messages
    pub fn type_name(self) -> &'static str {
        match self {
            DataType::Raw => "raw",
            DataType::Directory => "directory",
            DataType::File => "file",
            DataType::Metadata => "metadata",
            DataType::Symlink => "symlink",
        }
    }

    /// raw and file nodes carry byte content
    pub fn is_content(self) -> bool {
        matches!(self, DataType::Raw | DataType::File)
    }
}

impl TryFrom<i32> for DataType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(DataType::Raw),
            1 => Ok(DataType::Directory),
            2 => Ok(DataType::File),
            3 => Ok(DataType::Metadata),
            4 => Ok(DataType::Symlink),
            other => Err(Error::MalformedEnvelope(format!(
                "unknown type tag {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.type_name())
    }
}

/// decoded filesystem envelope of a node payload
///
/// `file_size()` is derived: inline data length plus the sum of `block_sizes`.
/// `block_sizes` has one entry per link of the owning node, in link order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub data_type: DataType,
    pub data: Bytes,
    pub block_sizes: Vec<u64>,
}

impl Envelope {
    /// leaf envelope holding a chunk inline
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self {
            data_type: DataType::Raw,
            data: data.into(),
            block_sizes: vec![],
        }
    }

    /// interior file envelope describing its children's logical sizes
    pub fn file(block_sizes: Vec<u64>) -> Self {
        Self {
            data_type: DataType::File,
            data: Bytes::new(),
            block_sizes,
        }
    }

    /// directory envelope
    pub fn directory() -> Self {
        Self {
            data_type: DataType::Directory,
            data: Bytes::new(),
            block_sizes: vec![],
        }
    }

    /// total logical bytes represented by this node and its descendants
    ///
    /// saturates instead of overflowing; the decoder rejects envelopes whose
    /// sizes do not fit in a u64.
    pub fn file_size(&self) -> u64 {
        self.block_sizes
            .iter()
            .fold(self.data.len() as u64, |acc, s| acc.saturating_add(*s))
    }

    /// encode to the envelope wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        crate::object::encode_envelope(self)
    }

    /// decode from the envelope wire format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        crate::object::decode_envelope(bytes)
    }
}
