use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::{Error, Result};

/// Image encodings the relay is known to push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// One decoded still image ready for a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePayload {
    /// Raw image bytes
    pub data: Vec<u8>,

    /// Sniffed encoding
    pub format: ImageFormat,
}

impl FramePayload {
    /// Frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode a base64 frame payload into image bytes.
///
/// The relay sends bare base64 without a data-URI prefix. Anything that is
/// empty, not valid base64, or not a recognizable image encoding is
/// rejected; callers treat that as a recoverable per-frame glitch.
pub fn decode_frame(encoded: &str) -> Result<FramePayload> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(Error::frame("Empty frame payload"));
    }

    let data = STANDARD
        .decode(trimmed)
        .map_err(|e| Error::frame(format!("Invalid base64: {}", e)))?;

    let format = sniff_format(&data)
        .ok_or_else(|| Error::frame("Payload is not a recognizable image"))?;

    Ok(FramePayload { data, format })
}

/// Identify the image encoding from its magic bytes
fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    if data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Some(ImageFormat::Jpeg);
    }
    if data.len() >= 8 && data[..8] == PNG_SIGNATURE {
        return Some(ImageFormat::Png);
    }
    None
}
