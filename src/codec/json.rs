//! JSON record codec
//!
//! Default [`RecordCodec`] backed by serde_json. Records are written
//! pretty-printed so package internals stay readable in a file manager.

use super::{Record, RecordCodec};
use crate::error::CodecError;

/// Serde-backed record codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(record)
            .map_err(|e| CodecError(format!("record encode: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError(format!("record decode: {e}")))
    }
}
