//! Content codecs
//!
//! Structured-record and raster-image content live in leaves as typed values
//! and cross the disk boundary as bytes. The traits here are the narrow seams
//! where a host application injects its own formats; the crate ships a JSON
//! record codec and a farbfeld image codec as defaults.

pub mod farbfeld;
pub mod json;

use crate::error::CodecError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered key → value structured content.
///
/// Keys are strings; values are strings, integers, nested sequences, or
/// nested records. Key order is insertion order and survives encoding.
pub type Record = IndexMap<String, Value>;

/// A single structured-record value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Sequence(Vec<Value>),
    Record(Record),
}

/// Decoded raster image: 8-bit RGBA rows, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Encodes and decodes structured records.
pub trait RecordCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError>;
}

/// Encodes and decodes a single raster container format.
pub trait ImageCodec {
    fn encode(&self, image: &Image) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Image, CodecError>;
}

/// Codec bundle handed to content accessors and the persistence engine.
pub struct Codecs {
    pub record: Box<dyn RecordCodec>,
    pub image: Box<dyn ImageCodec>,
}

impl Default for Codecs {
    fn default() -> Self {
        Codecs {
            record: Box::new(json::JsonCodec),
            image: Box::new(farbfeld::FarbfeldCodec),
        }
    }
}
