//! PNG encoding of finished tokens and `data:` URI handling.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::foundation::error::{TokenError, TokenResult};
use crate::raster::PixelBuffer;

pub const PNG_MIME: &str = "image/png";

pub fn encode_png(buf: &PixelBuffer) -> TokenResult<Vec<u8>> {
    if buf.is_empty() {
        return Err(TokenError::encode(format!(
            "cannot encode a {}x{} image as PNG",
            buf.width(),
            buf.height()
        )));
    }
    let mut out = Vec::new();
    PngEncoder::new(Cursor::new(&mut out))
        .write_image(buf.data(), buf.width(), buf.height(), ExtendedColorType::Rgba8)
        .map_err(|e| TokenError::encode(format!("png: {e}")))?;
    Ok(out)
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn is_data_uri(s: &str) -> bool {
    s.trim_start()
        .get(..5)
        .is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// Payload bytes of a `data:` URI. Base64 payloads are decoded, anything else is returned as is.
pub fn decode_data_uri(uri: &str) -> TokenResult<Vec<u8>> {
    let uri = uri.trim();
    if !is_data_uri(uri) {
        return Err(TokenError::decode("not a data: URI"));
    }
    let (meta, payload) = uri[5..]
        .split_once(',')
        .ok_or_else(|| TokenError::decode("data: URI has no payload separator"))?;
    if meta
        .rsplit(';')
        .next()
        .is_some_and(|p| p.eq_ignore_ascii_case("base64"))
    {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| TokenError::decode(format!("data: URI base64: {e}")))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// A styled token: final pixels plus their PNG encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenImage {
    pixels: PixelBuffer,
    png: Vec<u8>,
}

impl TokenImage {
    pub fn encode(pixels: PixelBuffer) -> TokenResult<Self> {
        let png = encode_png(&pixels)?;
        Ok(Self { pixels, png })
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn to_data_uri(&self) -> String {
        to_data_uri(PNG_MIME, &self.png)
    }

    pub fn into_parts(self) -> (PixelBuffer, Vec<u8>) {
        (self.pixels, self.png)
    }
}

impl std::fmt::Debug for TokenImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenImage")
            .field("dimensions", &self.pixels.dimensions())
            .field("png_len", &self.png.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/encode.rs"]
mod tests;
