/// Clamp to `[0, 255]` and truncate toward zero. NaN maps to 0.
pub fn to_byte(x: f64) -> u8 {
    if x.is_nan() {
        return 0;
    }
    x.clamp(0.0, 255.0) as u8
}

/// Unnormalized Gaussian bell: `exp(-0.5 * ((x - mu) / sigma)^2)`.
pub fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    let a = (x - mu) / sigma;
    (-0.5 * a * a).exp()
}

/// Straight RGBA8 to premultiplied linear-float RGBA in `[0, 1]`.
pub(crate) fn premultiply_f32(px: [u8; 4]) -> [f32; 4] {
    let a = f32::from(px[3]) / 255.0;
    [
        f32::from(px[0]) / 255.0 * a,
        f32::from(px[1]) / 255.0 * a,
        f32::from(px[2]) / 255.0 * a,
        a,
    ]
}

/// Inverse of [`premultiply_f32`], rounding to the nearest byte.
pub(crate) fn unpremultiply_f32(px: [f32; 4]) -> [u8; 4] {
    let a = px[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let c = |v: f32| ((v / a).clamp(0.0, 1.0) * 255.0).round() as u8;
    [c(px[0]), c(px[1]), c(px[2]), (a * 255.0).round() as u8]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
