use super::*;

fn square_on_canvas(cw: u32, ch: u32, x: u32, y: u32, w: u32, h: u32, px: [u8; 4]) -> PixelBuffer {
    let mut buf = PixelBuffer::new(cw, ch);
    for yy in y..y + h {
        for xx in x..x + w {
            buf.put_pixel(i64::from(xx), i64::from(yy), px);
        }
    }
    buf
}

/// Bounding box of pixels with alpha above `min_alpha`.
fn opaque_extent(buf: &PixelBuffer, min_alpha: u8) -> PixelRect {
    let mut t = buf.clone();
    t.transform_channel(Channel::Alpha, |a| if a > min_alpha { 255.0 } else { 0.0 });
    t.bounding_box()
}

#[test]
fn crop_outside_bounds_is_transparent() {
    let buf = PixelBuffer::filled(4, 4, [1, 2, 3, 255]);
    let c = buf.crop(2, -1, 4, 3);
    assert_eq!(c.dimensions(), (4, 3));
    assert_eq!(c.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(c.pixel(0, 1), [1, 2, 3, 255]);
    assert_eq!(c.pixel(1, 2), [1, 2, 3, 255]);
    assert_eq!(c.pixel(2, 1), [0, 0, 0, 0]);
}

#[test]
fn bounding_box_is_inclusive() {
    let buf = square_on_canvas(10, 10, 3, 4, 2, 5, [9, 9, 9, 1]);
    assert_eq!(buf.bounding_box(), PixelRect::new(3, 4, 2, 5));

    let mut single = PixelBuffer::new(5, 5);
    single.put_pixel(2, 3, [0, 0, 0, 10]);
    assert_eq!(single.bounding_box(), PixelRect::new(2, 3, 1, 1));
}

#[test]
fn bounding_box_of_transparent_image_is_zero() {
    let buf = PixelBuffer::filled(6, 6, [255, 255, 255, 0]);
    assert_eq!(buf.bounding_box(), PixelRect::default());
    assert!(buf.trim().is_empty());
}

#[test]
fn trim_is_idempotent() {
    let mut buf = square_on_canvas(20, 12, 5, 2, 7, 4, [200, 10, 10, 255]);
    buf.put_pixel(15, 9, [0, 0, 0, 3]);
    let once = buf.trim();
    assert_eq!(once.dimensions(), (11, 8));
    let twice = once.trim();
    assert_eq!(once, twice);
}

#[test]
fn scaled_truncates_dimensions() {
    let buf = PixelBuffer::new(10, 7);
    assert_eq!(buf.scaled(0.25).dimensions(), (2, 1));
    assert_eq!(buf.scaled(4.0).dimensions(), (40, 28));
    assert_eq!(buf.resized(3, 9).dimensions(), (3, 9));
}

#[test]
fn offset_moves_content_and_discards_overflow() {
    let buf = square_on_canvas(5, 5, 0, 0, 2, 2, [7, 7, 7, 255]);
    let moved = buf.offset(4.0, 1.0);
    assert_eq!(moved.dimensions(), (5, 5));
    assert_eq!(moved.pixel(4, 1), [7, 7, 7, 255]);
    assert_eq!(moved.pixel(4, 2), [7, 7, 7, 255]);
    assert_eq!(moved.pixel(0, 0), [0, 0, 0, 0]);
    let visible = moved.data().chunks_exact(4).filter(|p| p[3] > 0).count();
    assert_eq!(visible, 2);
}

#[test]
fn paste_zoomed_preserves_aspect_and_centers() {
    let src = PixelBuffer::filled(100, 50, [0, 0, 255, 255]);
    let mut dst = PixelBuffer::new(540, 540);
    dst.paste_zoomed(&src, 120.0, 50.0, 300.0, 300.0);
    let placed = opaque_extent(&dst, 127);
    assert_eq!(placed.x, 120);
    assert_eq!(placed.width, 300);
    assert!((i64::from(placed.height) - 150).abs() <= 1);
    let pad_top = i64::from(placed.y) - 50;
    let pad_bottom = 350 - i64::from(placed.y + placed.height);
    assert!((pad_top - pad_bottom).abs() <= 1);

    let tall = PixelBuffer::filled(30, 90, [0, 255, 0, 255]);
    let fitted = tall.fit(60, 60);
    let placed = opaque_extent(&fitted, 127);
    assert_eq!(placed.height, 60);
    assert!((i64::from(placed.width) - 20).abs() <= 1);
    assert!((i64::from(placed.x) - 20).abs() <= 1);
}

#[test]
fn paste_zoomed_ignores_degenerate_input() {
    let mut dst = PixelBuffer::new(8, 8);
    let before = dst.clone();
    dst.paste_zoomed(&PixelBuffer::new(0, 4), 0.0, 0.0, 8.0, 8.0);
    dst.paste_zoomed(&PixelBuffer::filled(2, 2, [1, 1, 1, 255]), 0.0, 0.0, 0.0, 8.0);
    assert_eq!(dst, before);
}

#[test]
fn multiply_with_transparent_layer_is_noop() {
    let mut dst = square_on_canvas(6, 6, 1, 1, 3, 3, [120, 60, 30, 255]);
    let before = dst.clone();
    dst.multiply(&PixelBuffer::filled(6, 6, [0, 0, 0, 0]));
    assert_eq!(dst, before);
}

#[test]
fn multiply_interpolates_by_layer_alpha() {
    let mut dst = PixelBuffer::filled(1, 1, [200, 100, 255, 77]);
    dst.multiply(&PixelBuffer::filled(1, 1, [128, 255, 0, 255]));
    // 200*128/255 = 100.39 -> 100; alpha untouched.
    assert_eq!(dst.pixel(0, 0), [100, 100, 0, 77]);

    let mut dst = PixelBuffer::filled(1, 1, [200, 200, 200, 255]);
    dst.multiply(&PixelBuffer::filled(1, 1, [0, 0, 0, 51]));
    // 200 + 0.2 * (0 - 200) = 160
    assert_eq!(dst.pixel(0, 0), [160, 160, 160, 255]);
}

#[test]
fn multiply_only_touches_overlap() {
    let mut dst = PixelBuffer::filled(4, 2, [255, 255, 255, 255]);
    dst.multiply(&PixelBuffer::filled(2, 4, [0, 0, 0, 255]));
    assert_eq!(dst.pixel(1, 1), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(2, 0), [255, 255, 255, 255]);
}

#[test]
fn set_rgb_keeps_alpha() {
    let mut buf = PixelBuffer::from_rgba(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    buf.set_rgb(255, 0, 9);
    assert_eq!(buf.data(), &[255, 0, 9, 4, 255, 0, 9, 8]);
}

#[test]
fn transforms_clamp_results() {
    let mut buf = PixelBuffer::filled(2, 2, [10, 20, 30, 40]);
    buf.transform(|[r, g, b, a]| {
        [
            f64::from(r) * 100.0,
            -f64::from(g),
            f64::from(b) + 0.9,
            f64::from(a),
        ]
    });
    assert_eq!(buf.pixel(1, 1), [255, 0, 30, 40]);

    buf.transform_channel(Channel::Alpha, |a| f64::from(a) * 0.5);
    assert_eq!(buf.pixel(0, 0)[3], 20);
}

#[test]
fn alpha_composite_draws_at_origin() {
    let mut dst = PixelBuffer::filled(3, 3, [0, 0, 0, 255]);
    let overlay = PixelBuffer::filled(2, 2, [255, 255, 255, 255]);
    dst.alpha_composite(&overlay);
    assert_eq!(dst.pixel(1, 1), [255, 255, 255, 255]);
    assert_eq!(dst.pixel(2, 2), [0, 0, 0, 255]);
}
