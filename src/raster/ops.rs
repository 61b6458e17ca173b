use rayon::prelude::*;

use crate::foundation::math::to_byte;
use crate::raster::buffer::PixelBuffer;
use crate::raster::convolve::Channel;
use crate::raster::sample::{composite_at, draw_scaled, resample};

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl PixelBuffer {
    /// Copy of the sub-rectangle; areas outside this buffer come back transparent.
    pub fn crop(&self, x: i64, y: i64, width: u32, height: u32) -> PixelBuffer {
        let mut out = PixelBuffer::new(width, height);
        for dy in 0..i64::from(height) {
            for dx in 0..i64::from(width) {
                out.put_pixel(dx, dy, self.pixel(x + dx, y + dy));
            }
        }
        out
    }

    /// Smallest rectangle containing every pixel with alpha > 0, or all zeros if there is none.
    pub fn bounding_box(&self) -> PixelRect {
        let (w, h) = self.dimensions();
        let mut left = w;
        let mut top = h;
        let mut right = 0u32;
        let mut bottom = 0u32;
        let mut any = false;
        for (y, row) in self.data().chunks_exact(self.stride().max(4)).enumerate().take(h as usize) {
            for (x, px) in row.chunks_exact(4).enumerate() {
                if px[3] > 0 {
                    let (x, y) = (x as u32, y as u32);
                    left = left.min(x);
                    top = top.min(y);
                    right = right.max(x);
                    bottom = bottom.max(y);
                    any = true;
                }
            }
        }
        if !any {
            return PixelRect::default();
        }
        PixelRect::new(left, top, right - left + 1, bottom - top + 1)
    }

    /// Copy cropped to the visible pixels.
    pub fn trim(&self) -> PixelBuffer {
        let b = self.bounding_box();
        self.crop(i64::from(b.x), i64::from(b.y), b.width, b.height)
    }

    /// Copy resampled to exactly `width` x `height`.
    pub fn resized(&self, width: u32, height: u32) -> PixelBuffer {
        resample(self, width, height)
    }

    /// Copy scaled by `factor`; new dimensions are truncated to whole pixels.
    pub fn scaled(&self, factor: f64) -> PixelBuffer {
        let w = (f64::from(self.width()) * factor).max(0.0) as u32;
        let h = (f64::from(self.height()) * factor).max(0.0) as u32;
        resample(self, w, h)
    }

    /// Same-size copy with content moved by `(dx, dy)`; uncovered area is transparent.
    pub fn offset(&self, dx: f64, dy: f64) -> PixelBuffer {
        let mut out = PixelBuffer::new(self.width(), self.height());
        composite_at(&mut out, self, dx.round() as i64, dy.round() as i64);
        out
    }

    /// Draw `source` into the rectangle `(x, y, w, h)` of this buffer, letterboxed so its aspect
    /// ratio is kept and the spare space is split evenly. No-op for zero-sized inputs.
    pub fn paste_zoomed(&mut self, source: &PixelBuffer, x: f64, y: f64, w: f64, h: f64) -> &mut Self {
        if source.is_empty() || w <= 0.0 || h <= 0.0 {
            return self;
        }
        let source_aspect = f64::from(source.width()) / f64::from(source.height());
        let target_aspect = w / h;
        let (mut dst_x, mut dst_y, mut dst_w, mut dst_h) = (x, y, w, h);
        if source_aspect > target_aspect {
            let extra = h - (w / source_aspect).floor();
            dst_y += extra / 2.0;
            dst_h -= extra;
        } else {
            let extra = w - (h * source_aspect).floor();
            dst_x += extra / 2.0;
            dst_w -= extra;
        }
        draw_scaled(self, source, dst_x, dst_y, dst_w, dst_h);
        self
    }

    /// Letterboxed copy in a fresh `width` x `height` buffer.
    pub fn fit(&self, width: u32, height: u32) -> PixelBuffer {
        let mut out = PixelBuffer::new(width, height);
        out.paste_zoomed(self, 0.0, 0.0, f64::from(width), f64::from(height));
        out
    }

    /// In place: draw `overlay` over this buffer at the origin.
    pub fn alpha_composite(&mut self, overlay: &PixelBuffer) {
        composite_at(self, overlay, 0, 0);
    }

    /// In place: multiply-blend `mult` into RGB over the overlapping region.
    ///
    /// Each channel moves from `old` towards `old * m / 255` by the multiply layer's alpha, so a
    /// transparent layer pixel changes nothing. Alpha is untouched.
    pub fn multiply(&mut self, mult: &PixelBuffer) {
        let w = self.width().min(mult.width()) as usize;
        let h = self.height().min(mult.height()) as usize;
        if w == 0 || h == 0 {
            return;
        }
        let stride = self.stride();
        let mult_stride = mult.stride();
        let m = mult.data();
        self.data_mut()
            .par_chunks_exact_mut(stride)
            .take(h)
            .enumerate()
            .for_each(|(y, row)| {
                let mrow = &m[y * mult_stride..y * mult_stride + w * 4];
                for (d, mp) in row[..w * 4].chunks_exact_mut(4).zip(mrow.chunks_exact(4)) {
                    let effect = f64::from(mp[3]) / 255.0;
                    for c in 0..3 {
                        let old = f64::from(d[c]);
                        let blended = old * f64::from(mp[c]) / 255.0;
                        d[c] = to_byte(old + effect * (blended - old));
                    }
                }
            });
    }

    /// In place: force RGB of every pixel, leaving alpha alone.
    pub fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        for px in self.data_mut().chunks_exact_mut(4) {
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    }

    /// In place: remap every pixel; results are clamped to bytes.
    pub fn transform<F>(&mut self, f: F)
    where
        F: Fn([u8; 4]) -> [f64; 4] + Sync,
    {
        self.data_mut().par_chunks_exact_mut(4).for_each(|px| {
            let out = f([px[0], px[1], px[2], px[3]]);
            for c in 0..4 {
                px[c] = to_byte(out[c]);
            }
        });
    }

    /// In place: remap one channel; results are clamped to bytes.
    pub fn transform_channel<F>(&mut self, channel: Channel, f: F)
    where
        F: Fn(u8) -> f64 + Sync,
    {
        let c = channel.index();
        self.data_mut()
            .par_chunks_exact_mut(4)
            .for_each(|px| px[c] = to_byte(f(px[c])));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/ops.rs"]
mod tests;
