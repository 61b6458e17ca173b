use rayon::prelude::*;

use crate::foundation::error::TokenResult;
use crate::foundation::math::to_byte;
use crate::raster::buffer::PixelBuffer;
use crate::raster::kernel::{Kernel, make_gaussian_kernel};

/// One of the four interleaved channels of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

impl Channel {
    pub fn index(self) -> usize {
        self as usize
    }

    fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

const ALL_CHANNELS: u8 = 0b1111;

impl PixelBuffer {
    /// Convolve all four channels with `kernel`.
    ///
    /// Near the borders only the in-bounds part of the kernel contributes and the result is
    /// renormalized by the weights actually used, so edges neither darken nor fade.
    pub fn convolve(&self, kernel: &Kernel) -> TokenResult<PixelBuffer> {
        convolve_masked(self, kernel, ALL_CHANNELS)
    }

    /// Convolve a single channel; the other three are copied through unchanged.
    pub fn convolve_channel(&self, channel: Channel, kernel: &Kernel) -> TokenResult<PixelBuffer> {
        convolve_masked(self, kernel, channel.mask())
    }

    pub fn gaussian_blur(&self, radius: f64) -> TokenResult<PixelBuffer> {
        self.convolve(&make_gaussian_kernel(radius))
    }

    pub fn gaussian_blur_channel(&self, channel: Channel, radius: f64) -> TokenResult<PixelBuffer> {
        self.convolve_channel(channel, &make_gaussian_kernel(radius))
    }
}

fn convolve_masked(src: &PixelBuffer, kernel: &Kernel, mask: u8) -> TokenResult<PixelBuffer> {
    kernel.check_odd()?;

    let (width, height) = src.dimensions();
    let mut out = PixelBuffer::new(width, height);
    if src.is_empty() {
        return Ok(out);
    }

    let w = i64::from(width);
    let h = i64::from(height);
    let x_reach = (kernel.cols() / 2) as i64;
    let y_reach = (kernel.rows() / 2) as i64;
    let stride = src.stride();
    let s = src.data();

    out.data_mut()
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(row_idx, row)| {
            let y = row_idx as i64;
            let y0 = (y - y_reach).max(0);
            let y1 = (y + y_reach).min(h - 1);
            for x in 0..w {
                let x0 = (x - x_reach).max(0);
                let x1 = (x + x_reach).min(w - 1);

                let mut acc = [0.0f64; 4];
                let mut weight_sum = 0.0f64;
                for sy in y0..=y1 {
                    let ky = (sy - y + y_reach) as usize;
                    let src_row = (sy as usize) * stride;
                    for sx in x0..=x1 {
                        let weight = kernel.weight(ky, (sx - x + x_reach) as usize);
                        weight_sum += weight;
                        let si = src_row + (sx as usize) * 4;
                        for (c, a) in acc.iter_mut().enumerate() {
                            if mask & (1 << c) != 0 {
                                *a += weight * f64::from(s[si + c]);
                            }
                        }
                    }
                }

                let di = (x as usize) * 4;
                let si = row_idx * stride + di;
                for c in 0..4 {
                    row[di + c] = if mask & (1 << c) != 0 && weight_sum != 0.0 {
                        to_byte(acc[c] / weight_sum)
                    } else {
                        s[si + c]
                    };
                }
            }
        });

    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/convolve.rs"]
mod tests;
