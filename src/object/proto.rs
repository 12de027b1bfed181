//! protobuf message for the unixfs `Data` envelope
//!
//! kept in the shape pb-rs generates. empty optional fields are skipped by
//! the codec layer rather than here, and `blocksizes` is written unpacked.

use std::borrow::Cow;

use quick_protobuf::sizeofs::{sizeof_len, sizeof_varint};
use quick_protobuf::{BytesReader, MessageRead, MessageWrite, Result, Writer, WriterBackend};

const TAG_DATA_TYPE: u32 = 8; // field 1, varint
const TAG_DATA_DATA: u32 = 18; // field 2, length-delimited
const TAG_DATA_FILESIZE: u32 = 24; // field 3, varint
const TAG_DATA_BLOCKSIZE: u32 = 32; // field 4, varint
const TAG_DATA_BLOCKSIZES_PACKED: u32 = 34; // field 4, length-delimited

#[derive(Debug, Default, PartialEq, Clone)]
pub struct UnixFsData<'a> {
    pub data_type: Option<i32>,
    pub data: Option<Cow<'a, [u8]>>,
    pub filesize: Option<u64>,
    pub blocksizes: Vec<u64>,
}

impl<'a> MessageRead<'a> for UnixFsData<'a> {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes) {
                Ok(TAG_DATA_TYPE) => msg.data_type = Some(r.read_int32(bytes)?),
                Ok(TAG_DATA_DATA) => msg.data = Some(r.read_bytes(bytes).map(Cow::Borrowed)?),
                Ok(TAG_DATA_FILESIZE) => msg.filesize = Some(r.read_uint64(bytes)?),
                Ok(TAG_DATA_BLOCKSIZE) => msg.blocksizes.push(r.read_uint64(bytes)?),
                Ok(TAG_DATA_BLOCKSIZES_PACKED) => {
                    let packed = r.read_packed(bytes, |r, bytes| r.read_uint64(bytes))?;
                    msg.blocksizes.extend(packed);
                }
                Ok(t) => {
                    r.read_unknown(bytes, t)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(msg)
    }
}

impl MessageWrite for UnixFsData<'_> {
    fn get_size(&self) -> usize {
        self.data_type.map_or(0, |t| 1 + sizeof_varint(t as u64))
            + self.data.as_ref().map_or(0, |d| 1 + sizeof_len(d.len()))
            + self.filesize.map_or(0, |s| 1 + sizeof_varint(s))
            + self
                .blocksizes
                .iter()
                .map(|s| 1 + sizeof_varint(*s))
                .sum::<usize>()
    }

    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> Result<()> {
        if let Some(data_type) = self.data_type {
            w.write_with_tag(TAG_DATA_TYPE, |w| w.write_int32(data_type))?;
        }
        if let Some(data) = &self.data {
            w.write_with_tag(TAG_DATA_DATA, |w| w.write_bytes(data))?;
        }
        if let Some(filesize) = self.filesize {
            w.write_with_tag(TAG_DATA_FILESIZE, |w| w.write_uint64(filesize))?;
        }
        for size in &self.blocksizes {
            w.write_with_tag(TAG_DATA_BLOCKSIZE, |w| w.write_uint64(*size))?;
        }
        Ok(())
    }
}

/// serialize a message without the length prefix `serialize_into_vec` adds
pub fn to_vec<M: MessageWrite>(msg: &M) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(msg.get_size());
    let mut writer = Writer::new(&mut buf);
    msg.write_message(&mut writer)?;
    Ok(buf)
}

/// parse a top-level message spanning all of `bytes`
pub fn from_slice<'a, M: MessageRead<'a>>(bytes: &'a [u8]) -> Result<M> {
    let mut reader = BytesReader::from_bytes(bytes);
    M::from_reader(&mut reader, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_blocksizes_accepted() {
        // Type=File, blocksizes packed [4, 4, 2]
        let bytes = [0x08, 0x02, 0x22, 0x03, 0x04, 0x04, 0x02];
        let msg: UnixFsData = from_slice(&bytes).unwrap();
        assert_eq!(msg.data_type, Some(2));
        assert_eq!(msg.blocksizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_unknown_fields_skipped() {
        // Type=Directory, then field 15 varint
        let bytes = [0x08, 0x01, 0x78, 0x05];
        let msg: UnixFsData = from_slice(&bytes).unwrap();
        assert_eq!(msg.data_type, Some(1));
        assert!(msg.data.is_none());
    }

    #[test]
    fn test_truncated_input_fails() {
        // data tag with no length
        assert!(from_slice::<UnixFsData>(&[0x12]).is_err());
        // filesize varint cut off mid-byte
        assert!(from_slice::<UnixFsData>(&[0x08, 0x02, 0x18, 0x80]).is_err());
    }
}
