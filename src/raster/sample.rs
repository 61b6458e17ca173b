//! Resampling and positioned compositing.
//!
//! These are the primitives the geometry operations are built from. Interpolation happens in
//! premultiplied space so fully transparent neighbours never bleed their (meaningless) colour
//! into visible pixels; buffers stay straight-alpha on both sides.

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage};

use crate::foundation::math::{premultiply_f32, unpremultiply_f32};
use crate::raster::buffer::{PixelBuffer, Rgba8};

/// Resample `src` to exactly `width` x `height`, ignoring aspect ratio.
pub(crate) fn resample(src: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    if width == 0 || height == 0 || src.is_empty() {
        return PixelBuffer::new(width, height);
    }
    if src.dimensions() == (width, height) {
        return src.clone();
    }

    let mut premul = Rgba32FImage::new(src.width(), src.height());
    for (px, s) in premul.pixels_mut().zip(src.data().chunks_exact(4)) {
        *px = Rgba(premultiply_f32([s[0], s[1], s[2], s[3]]));
    }
    let scaled = imageops::resize(&premul, width, height, FilterType::Triangle);

    let mut out = PixelBuffer::new(width, height);
    for (d, px) in out.data_mut().chunks_exact_mut(4).zip(scaled.pixels()) {
        d.copy_from_slice(&unpremultiply_f32(px.0));
    }
    out
}

/// Source-over of one straight-alpha pixel onto another.
pub(crate) fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    let sa = f32::from(src[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (f32::from(src[c]) * sa + f32::from(dst[c]) * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

/// Draw `src` onto `dst` with its top-left corner at `(x, y)`; parts outside `dst` are clipped.
pub(crate) fn composite_at(dst: &mut PixelBuffer, src: &PixelBuffer, x: i64, y: i64) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    for dy in y0..y1 {
        for dx in x0..x1 {
            let s = src.pixel(dx - x, dy - y);
            if s[3] == 0 {
                continue;
            }
            let d = dst.pixel(dx, dy);
            dst.put_pixel(dx, dy, over(d, s));
        }
    }
}

/// Scale `src` into the rectangle `(x, y, w, h)` of `dst` and composite it there.
///
/// The rectangle's edges are rounded to whole pixels.
pub(crate) fn draw_scaled(dst: &mut PixelBuffer, src: &PixelBuffer, x: f64, y: f64, w: f64, h: f64) {
    let left = x.round();
    let top = y.round();
    let right = (x + w).round();
    let bottom = (y + h).round();
    if right <= left || bottom <= top {
        return;
    }
    let scaled = resample(src, (right - left) as u32, (bottom - top) as u32);
    composite_at(dst, &scaled, left as i64, top as i64);
}

#[cfg(test)]
#[path = "../../tests/unit/raster/sample.rs"]
mod tests;
