//! Value envelope collaborators.
//!
//! The wire envelope carries opaque bytes; turning caller values into those
//! bytes is the codec's job. The client never inspects the payload.

use bytes::Bytes;

use crate::error::Result;

/// Converts caller values to and from the opaque byte payload on the wire.
///
/// `decode(encode(v))` must equal `v` for every value a caller stores, and
/// `encode` must stay stable across processes sharing a pool: a value
/// written by one client has to decode in another.
pub trait ValueCodec {
    type Value;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>>;
    fn decode(&self, raw: &[u8]) -> Result<Self::Value>;
}

/// Passthrough codec: values are the raw bytes themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCodec;

impl ValueCodec for RawCodec {
    type Value = Bytes;

    fn encode(&self, value: &Bytes) -> Result<Vec<u8>> {
        Ok(value.to_vec())
    }

    fn decode(&self, raw: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(raw))
    }
}
