//! Farbfeld image codec
//!
//! Default [`ImageCodec`] using the farbfeld container: the 8-byte magic
//! `farbfeld`, big-endian u32 width and height, then pixels as 16-bit RGBA.
//! 8-bit channels are widened by replication (`v * 257`) so encode → decode
//! round-trips exactly. Hosts needing PNG or JPEG inject a platform codec.

use super::{Image, ImageCodec};
use crate::error::CodecError;

const MAGIC: &[u8; 8] = b"farbfeld";
const HEADER_LEN: usize = 16;

/// Pure-Rust farbfeld codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct FarbfeldCodec;

impl ImageCodec for FarbfeldCodec {
    fn encode(&self, image: &Image) -> Result<Vec<u8>, CodecError> {
        let pixels = image.width as usize * image.height as usize;
        if image.rgba.len() != pixels * 4 {
            return Err(CodecError(format!(
                "image encode: {}x{} needs {} rgba bytes, got {}",
                image.width,
                image.height,
                pixels * 4,
                image.rgba.len()
            )));
        }
        let mut out = Vec::with_capacity(HEADER_LEN + pixels * 8);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&image.width.to_be_bytes());
        out.extend_from_slice(&image.height.to_be_bytes());
        for &channel in &image.rgba {
            out.extend_from_slice(&(u16::from(channel) * 257).to_be_bytes());
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Image, CodecError> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
            return Err(CodecError("image decode: not a farbfeld stream".to_string()));
        }
        let width = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let height = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let expected = HEADER_LEN as u64 + width as u64 * height as u64 * 8;
        if bytes.len() as u64 != expected {
            return Err(CodecError(format!(
                "image decode: {width}x{height} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        let rgba = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(|pair| (u16::from_be_bytes([pair[0], pair[1]]) >> 8) as u8)
            .collect();
        Ok(Image { width, height, rgba })
    }
}
