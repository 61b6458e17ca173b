use super::*;

#[test]
fn to_byte_clamps_and_truncates() {
    assert_eq!(to_byte(-3.0), 0);
    assert_eq!(to_byte(254.9), 254);
    assert_eq!(to_byte(300.0), 255);
    assert_eq!(to_byte(f64::NAN), 0);
}

#[test]
fn gaussian_peaks_at_mu() {
    assert!((gaussian(2.0, 2.0, 1.0) - 1.0).abs() < 1e-12);
    assert!(gaussian(3.0, 2.0, 1.0) < 1.0);
    assert!((gaussian(1.0, 2.0, 1.0) - gaussian(3.0, 2.0, 1.0)).abs() < 1e-12);
}

#[test]
fn premultiply_roundtrip_keeps_opaque_and_clears_transparent() {
    assert_eq!(unpremultiply_f32(premultiply_f32([10, 20, 30, 255])), [10, 20, 30, 255]);
    assert_eq!(unpremultiply_f32(premultiply_f32([10, 20, 30, 0])), [0, 0, 0, 0]);
}
