use std::fmt;

use image::{DynamicImage, RgbaImage};

use crate::foundation::error::{TokenError, TokenResult};

/// A straight-alpha RGBA8 pixel.
pub type Rgba8 = [u8; 4];

pub const TRANSPARENT: Rgba8 = [0, 0, 0, 0];

/// Mutable 2D grid of straight (non-premultiplied) RGBA8 pixels, row-major, tightly packed.
///
/// `data.len() == width * height * 4` always holds. Operations that change dimensions allocate
/// a new buffer. Zero-sized buffers are allowed; they are what trimming a fully transparent
/// image produces.
///
/// Coordinate policy: reads outside the buffer yield transparent black, writes outside the
/// buffer are ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent buffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; byte_len(width, height)],
        }
    }

    /// Wrap existing RGBA8 bytes. Fails if the length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> TokenResult<Self> {
        let expected = checked_byte_len(width, height)?;
        if data.len() != expected {
            return Err(TokenError::shape(format!(
                "pixel data has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Buffer where every pixel is `px`.
    pub fn filled(width: u32, height: u32, px: Rgba8) -> Self {
        Self {
            width,
            height,
            data: px.repeat((width as usize) * (height as usize)),
        }
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        Self::from(img.to_rgba8())
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length invariant guarantees `from_raw` accepts the data.
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// Read a pixel; transparent black outside the buffer.
    pub fn pixel(&self, x: i64, y: i64) -> Rgba8 {
        if !self.contains(x, y) {
            return TRANSPARENT;
        }
        let i = self.index(x as u32, y as u32);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Write a pixel; ignored outside the buffer.
    pub fn put_pixel(&mut self, x: i64, y: i64, px: Rgba8) {
        if !self.contains(x, y) {
            return;
        }
        let i = self.index(x as u32, y as u32);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Whole backing array.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Replace the whole backing array with `data` of identical length.
    pub fn put_data(&mut self, data: &[u8]) -> TokenResult<()> {
        if data.len() != self.data.len() {
            return Err(TokenError::shape(format!(
                "put_data expects {} bytes, got {}",
                self.data.len(),
                data.len()
            )));
        }
        self.data.copy_from_slice(data);
        Ok(())
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * 4
}

fn checked_byte_len(width: u32, height: u32) -> TokenResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| TokenError::shape("pixel buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
