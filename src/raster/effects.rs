//! Silhouette effects: edge detection, border and drop shadow.

use rayon::prelude::*;

use crate::foundation::error::TokenResult;
use crate::raster::buffer::PixelBuffer;
use crate::raster::convolve::Channel;

/// Alpha at or below this counts as "outside" the silhouette.
pub const EDGE_ALPHA_THRESHOLD: u8 = 127;

/// Drop shadows are blurred at this fraction of full resolution, then scaled back up.
pub const DROP_SHADOW_DOWNSCALE: f64 = 0.25;

impl PixelBuffer {
    /// White outline wherever the 3x3 neighbourhood (clipped at the border) straddles the alpha
    /// threshold relative to the centre pixel. Everything else is transparent white.
    pub fn edge_detect(&self) -> PixelBuffer {
        let (width, height) = self.dimensions();
        let mut out = PixelBuffer::new(width, height);
        if self.is_empty() {
            return out;
        }
        let w = i64::from(width);
        let h = i64::from(height);
        let stride = self.stride();
        let src = self.data();
        let inside = |x: i64, y: i64| src[(y as usize) * stride + (x as usize) * 4 + 3] > EDGE_ALPHA_THRESHOLD;

        out.data_mut()
            .par_chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(row_idx, row)| {
                let y = row_idx as i64;
                for x in 0..w {
                    let center = inside(x, y);
                    let mut edge = false;
                    'scan: for ny in (y - 1).max(0)..=(y + 1).min(h - 1) {
                        for nx in (x - 1).max(0)..=(x + 1).min(w - 1) {
                            if inside(nx, ny) != center {
                                edge = true;
                                break 'scan;
                            }
                        }
                    }
                    let i = (x as usize) * 4;
                    row[i..i + 4].copy_from_slice(&[255, 255, 255, if edge { 255 } else { 0 }]);
                }
            });
        out
    }

    /// In place: outline the silhouette.
    ///
    /// `intensity == 0` draws the raw 1px edge. Anything else blurs the edge alpha with radius
    /// `intensity`; above 1 the blurred alpha is also amplified by `intensity`. There is no
    /// continuous transition between the two regimes.
    pub fn add_border(&mut self, intensity: f64) -> TokenResult<()> {
        if intensity == 0.0 {
            let edges = self.edge_detect();
            self.alpha_composite(&edges);
            return Ok(());
        }

        let mut overlay = self
            .edge_detect()
            .gaussian_blur_channel(Channel::Alpha, intensity)?;

        // Only the alpha scaling matters here. The white RGB write is a no-op on these
        // straight-alpha buffers; it mirrors a workaround for canvas backends that read
        // back premultiplied pixels and would otherwise darken faint edges.
        if intensity > 1.0 {
            overlay.transform(|[_, _, _, a]| [255.0, 255.0, 255.0, 255.0 * intensity * f64::from(a) / 255.0]);
        }
        self.alpha_composite(&overlay);
        Ok(())
    }

    /// New buffer: a blurred, offset black silhouette at `opacity`, with this image on top.
    ///
    /// The blur runs at quarter resolution (16x fewer pixels) and the result is scaled back to
    /// this buffer's exact size, which also softens the shadow beyond what the kernel alone does.
    pub fn add_drop_shadow(
        &self,
        size: f64,
        offset_x: f64,
        offset_y: f64,
        opacity: f64,
    ) -> TokenResult<PixelBuffer> {
        let mut silhouette = self.clone();
        silhouette.set_rgb(0, 0, 0);
        let mut shadow = silhouette
            .scaled(DROP_SHADOW_DOWNSCALE)
            .gaussian_blur(size * DROP_SHADOW_DOWNSCALE)?
            .resized(self.width(), self.height())
            .offset(offset_x, offset_y);
        shadow.transform_channel(Channel::Alpha, |a| opacity * f64::from(a));
        shadow.alpha_composite(self);
        Ok(shadow)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/effects.rs"]
mod tests;
