use std::borrow::Cow;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::object::proto::{self, UnixFsData};
use crate::types::{DataType, Envelope};

/// serialize an envelope to its wire bytes
///
/// `filesize` is only emitted for content types with a nonzero size, and
/// inline data only when present.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    let size = envelope_size(envelope)?;
    let filesize = if envelope.data_type.is_content() && size > 0 {
        Some(size)
    } else {
        None
    };

    let msg = UnixFsData {
        data_type: Some(envelope.data_type.as_i32()),
        data: if envelope.data.is_empty() {
            None
        } else {
            Some(Cow::Borrowed(envelope.data.as_ref()))
        },
        filesize,
        blocksizes: envelope.block_sizes.clone(),
    };

    proto::to_vec(&msg).map_err(|e| Error::MalformedEnvelope(format!("encode: {}", e)))
}

/// parse wire bytes into an envelope
///
/// rejects a missing or unknown type tag and a `filesize` that disagrees with
/// the inline data plus the block sizes.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    let msg: UnixFsData =
        proto::from_slice(bytes).map_err(|e| Error::MalformedEnvelope(e.to_string()))?;

    let tag = msg
        .data_type
        .ok_or_else(|| Error::MalformedEnvelope("missing type".to_string()))?;
    let data_type = DataType::try_from(tag)?;

    let envelope = Envelope {
        data_type,
        data: msg
            .data
            .map(|d| Bytes::copy_from_slice(&d))
            .unwrap_or_default(),
        block_sizes: msg.blocksizes,
    };

    let size = envelope_size(&envelope)?;
    if let Some(filesize) = msg.filesize {
        if filesize != size {
            return Err(Error::MalformedEnvelope(format!(
                "filesize {} does not match data plus block sizes {}",
                filesize, size
            )));
        }
    }

    Ok(envelope)
}

// checked variant of Envelope::file_size
fn envelope_size(envelope: &Envelope) -> Result<u64> {
    envelope
        .block_sizes
        .iter()
        .try_fold(envelope.data.len() as u64, |acc, s| acc.checked_add(*s))
        .ok_or_else(|| Error::MalformedEnvelope("file size overflows u64".to_string()))
}
