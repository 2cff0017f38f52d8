//! Typed leaf content with single-interpretation coercion.
//!
//! A leaf stores exactly one canonical interpretation of its content at a
//! time: raw bytes, text, a structured record, or an image. Accessors for a
//! non-canonical kind succeed only when the canonical content is raw bytes
//! and the requested kind decodes from them; the decoded value is cached
//! without promoting the canonical tag, so byte access survives. Updating
//! content replaces the canonical value and invalidates every cache.

use crate::codec::{Codecs, Image, Record};
use crate::error::CodecError;

/// Canonical leaf content.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Bytes(Vec<u8>),
    Text(String),
    Record(Record),
    Image(Image),
}

impl Default for Content {
    fn default() -> Self {
        Content::Bytes(Vec::new())
    }
}

/// Content storage for a leaf: the canonical value plus lazily decoded
/// alternate interpretations.
///
/// Caches are only ever populated while the canonical content is `Bytes`.
#[derive(Debug, Default)]
pub(crate) struct ContentCell {
    content: Content,
    text_cache: Option<String>,
    record_cache: Option<Record>,
    image_cache: Option<Image>,
}

impl ContentCell {
    pub(crate) fn new(content: Content) -> Self {
        ContentCell {
            content,
            text_cache: None,
            record_cache: None,
            image_cache: None,
        }
    }

    /// Replace the canonical content and invalidate cached interpretations.
    pub(crate) fn update(&mut self, content: Content) {
        self.content = content;
        self.text_cache = None;
        self.record_cache = None;
        self.image_cache = None;
    }

    /// Raw bytes, available only while they are the canonical content.
    pub(crate) fn as_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Text: canonical text directly, or a cached UTF-8 decode of canonical
    /// bytes. Failed decodes are retried on the next call.
    pub(crate) fn as_text(&mut self) -> Option<&str> {
        if let Content::Bytes(bytes) = &self.content {
            if self.text_cache.is_none() {
                self.text_cache = std::str::from_utf8(bytes).ok().map(str::to_owned);
            }
            return self.text_cache.as_deref();
        }
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Structured record: canonical record directly, or a cached decode of
    /// canonical bytes through the injected codec.
    pub(crate) fn as_record(&mut self, codecs: &Codecs) -> Option<&Record> {
        if let Content::Bytes(bytes) = &self.content {
            if self.record_cache.is_none() {
                self.record_cache = codecs.record.decode(bytes).ok();
            }
            return self.record_cache.as_ref();
        }
        match &self.content {
            Content::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Image: canonical image directly, or a cached decode of canonical
    /// bytes through the injected codec.
    pub(crate) fn as_image(&mut self, codecs: &Codecs) -> Option<&Image> {
        if let Content::Bytes(bytes) = &self.content {
            if self.image_cache.is_none() {
                self.image_cache = codecs.image.decode(bytes).ok();
            }
            return self.image_cache.as_ref();
        }
        match &self.content {
            Content::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Canonical bytes for persistence: bytes verbatim, text as UTF-8,
    /// records and images through their codecs.
    pub(crate) fn encoded(&self, codecs: &Codecs) -> Result<Vec<u8>, CodecError> {
        match &self.content {
            Content::Bytes(bytes) => Ok(bytes.clone()),
            Content::Text(text) => Ok(text.as_bytes().to_vec()),
            Content::Record(record) => codecs.record.encode(record),
            Content::Image(image) => codecs.image.encode(image),
        }
    }
}
