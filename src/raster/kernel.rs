use crate::foundation::error::{TokenError, TokenResult};
use crate::foundation::math::gaussian;

/// Radii below this produce the 1x1 identity kernel instead of dividing by a zero sigma.
pub const MIN_GAUSSIAN_RADIUS: f64 = 1e-3;

/// Dense 2D convolution weights, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Arbitrary kernel. Parity is checked by the convolution, not here.
    pub fn new(rows: usize, cols: usize, weights: Vec<f64>) -> TokenResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(TokenError::shape("kernel must have at least one row and column"));
        }
        if weights.len() != rows * cols {
            return Err(TokenError::shape(format!(
                "kernel has {} weights, expected {rows}x{cols}",
                weights.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            weights,
        })
    }

    pub fn from_rows(rows: &[&[f64]]) -> TokenResult<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != cols) {
            return Err(TokenError::shape("kernel rows must all have the same length"));
        }
        Self::new(rows.len(), cols, rows.concat())
    }

    pub fn identity() -> Self {
        Self {
            rows: 1,
            cols: 1,
            weights: vec![1.0],
        }
    }

    /// Normalized 2D Gaussian of size `2 * ceil(radius) + 1` with `sigma = radius / 2`.
    pub fn gaussian(radius: f64) -> Self {
        if !radius.is_finite() || radius < MIN_GAUSSIAN_RADIUS {
            return Self::identity();
        }
        let reach = radius.ceil() as usize;
        let size = 2 * reach + 1;
        let center = reach as f64;
        let sigma = radius / 2.0;

        let profile: Vec<f64> = (0..size)
            .map(|i| gaussian(i as f64, center, sigma))
            .collect();
        let mut weights = Vec::with_capacity(size * size);
        for &g1 in &profile {
            for &g2 in &profile {
                weights.push(g1 * g2);
            }
        }
        let sum: f64 = weights.iter().sum();
        if sum > 0.0 {
            for w in &mut weights {
                *w /= sum;
            }
        }
        Self {
            rows: size,
            cols: size,
            weights,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn weight(&self, row: usize, col: usize) -> f64 {
        self.weights[row * self.cols + col]
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub(crate) fn check_odd(&self) -> TokenResult<()> {
        if self.rows % 2 == 0 || self.cols % 2 == 0 {
            return Err(TokenError::shape(format!(
                "convolution expects odd kernel dimensions, got {}x{}",
                self.rows, self.cols
            )));
        }
        Ok(())
    }
}

/// `Kernel::gaussian` under the name the rest of the pipeline uses.
pub fn make_gaussian_kernel(radius: f64) -> Kernel {
    Kernel::gaussian(radius)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/kernel.rs"]
mod tests;
