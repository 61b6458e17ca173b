use super::*;
use std::sync::Mutex;

use crate::fetch::CancelToken;
use crate::foundation::error::{NetworkFailure, TokenError};

/// Solid-colour gradients and texture, recording what was asked for.
#[derive(Default)]
struct SolidAssets {
    gradient: [u8; 4],
    texture: [u8; 4],
    fail_texture: bool,
    requests: Mutex<Vec<String>>,
}

impl TokenAssets for SolidAssets {
    fn gradient_for_team(
        &self,
        team: Team,
        use_colors: bool,
        width: u32,
        height: u32,
        _cancel: &CancelToken,
    ) -> TokenResult<PixelBuffer> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("gradient {} {use_colors} {width}x{height}", team.id()));
        Ok(PixelBuffer::filled(width, height, self.gradient))
    }

    fn texture(&self, width: u32, height: u32, _cancel: &CancelToken) -> TokenResult<PixelBuffer> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("texture {width}x{height}"));
        if self.fail_texture {
            return Err(TokenError::network(
                crate::assets::TEXTURE_URL,
                NetworkFailure::Timeout,
            ));
        }
        Ok(PixelBuffer::filled(width, height, self.texture))
    }
}

struct NoFetch;

impl Fetch for NoFetch {
    fn fetch(&self, url: &str, _cancel: &CancelToken) -> TokenResult<Vec<u8>> {
        Err(TokenError::network(url, NetworkFailure::Unavailable))
    }
}

fn pipeline(assets: SolidAssets) -> (TokenPipeline, Arc<SolidAssets>) {
    let assets = Arc::new(assets);
    let loader = Arc::new(ImageLoader::new(Arc::new(NoFetch)));
    (TokenPipeline::new(loader, assets.clone()), assets)
}

fn blob(w: u32, h: u32) -> SourceImage {
    let mut buf = PixelBuffer::new(w, h);
    for y in h / 4..h * 3 / 4 {
        for x in w / 4..w * 3 / 4 {
            buf.put_pixel(i64::from(x), i64::from(y), [200, 100, 50, 255]);
        }
    }
    SourceImage::from(buf)
}

#[test]
fn no_source_means_no_icon() {
    let (p, _) = pipeline(SolidAssets::default());
    let out = p
        .render(None, Team::Demon, &TokenStyle::default(), &CancelToken::new())
        .unwrap();
    assert_eq!(out, None);
}

#[test]
fn restyle_off_passes_source_through() {
    let (p, assets) = pipeline(SolidAssets::default());
    let style = TokenStyle {
        should_restyle: false,
        ..TokenStyle::default()
    };
    let src = SourceImage::Url("https://x.org/a.png".to_owned());
    let out = p
        .render(Some(&src), Team::Townsfolk, &style, &CancelToken::new())
        .unwrap()
        .unwrap();
    assert_eq!(out, StyledImage::Unstyled(src));
    assert_eq!(out.to_reference().as_deref(), Some("https://x.org/a.png"));
    assert!(assets.requests.lock().unwrap().is_empty());
}

#[test]
fn fully_transparent_source_yields_no_icon() {
    let (p, _) = pipeline(SolidAssets::default());
    let src = SourceImage::from(PixelBuffer::new(50, 50));
    let out = p
        .render(Some(&src), Team::Townsfolk, &TokenStyle::default(), &CancelToken::new())
        .unwrap();
    assert_eq!(out, None);
}

#[test]
fn colorize_whitens_then_multiplies_gradient() {
    let (p, assets) = pipeline(SolidAssets {
        gradient: [100, 150, 200, 255],
        ..SolidAssets::default()
    });
    let style = TokenStyle {
        should_colorize: true,
        use_outsider_and_minion_colors: true,
        ..TokenStyle::bare()
    };
    let out = p
        .style_pixels(
            PixelBuffer::filled(20, 10, [3, 4, 5, 255]),
            Team::Outsider,
            &style,
            &CancelToken::new(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(out.dimensions(), (FULL_WIDTH, FULL_HEIGHT));
    assert_eq!(out.pixel(270, 270), [100, 150, 200, 255]);
    assert_eq!(out.pixel(270, 0), [0, 0, 0, 0]);
    assert_eq!(
        *assets.requests.lock().unwrap(),
        vec!["gradient outsider true 20x10".to_owned()]
    );
}

#[test]
fn full_style_produces_encoded_token() {
    let (p, assets) = pipeline(SolidAssets {
        gradient: [255, 0, 0, 255],
        texture: [128, 128, 128, 255],
        ..SolidAssets::default()
    });
    let out = p
        .render(Some(&blob(80, 60)), Team::Minion, &TokenStyle::default(), &CancelToken::new())
        .unwrap()
        .unwrap();
    let token = out.as_token().unwrap();
    assert_eq!(token.dimensions(), (FULL_WIDTH, FULL_HEIGHT));
    assert!(out.to_reference().unwrap().starts_with("data:image/png;base64,"));

    // Centre of the placed icon: red gradient darkened by the texture.
    let (x, y, w, h) = placement_rect(1.0);
    let c = token.pixels().pixel((x + w / 2.0) as i64, (y + h / 2.0) as i64);
    assert_eq!(c[3], 255);
    assert!(c[0] > 100 && c[0] < 140, "{c:?}");
    assert_eq!(c[1], 0);

    // The 4:3 icon is letterboxed to 300x225 starting at y=87.5; its shadow sits 10px lower.
    let icon_bottom = 313;
    let below = token.pixels().pixel(270, icon_bottom + 8);
    assert!(below[3] > 0 && below[3] < 255, "{below:?}");
    assert_eq!(token.pixels().pixel(270, 420)[3], 0);

    assert_eq!(assets.requests.lock().unwrap().len(), 2);
}

#[test]
fn asset_failure_aborts_the_run() {
    let (p, _) = pipeline(SolidAssets {
        fail_texture: true,
        ..SolidAssets::default()
    });
    let err = p
        .render(Some(&blob(20, 20)), Team::Demon, &TokenStyle::default(), &CancelToken::new())
        .unwrap_err();
    assert!(err.is_recoverable());
}

#[test]
fn invalid_style_is_rejected_before_work() {
    let (p, assets) = pipeline(SolidAssets::default());
    let style = TokenStyle {
        drop_shadow_opacity: 3.0,
        ..TokenStyle::default()
    };
    let err = p
        .render(Some(&blob(20, 20)), Team::Demon, &style, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, TokenError::Validation(_)));
    assert!(assets.requests.lock().unwrap().is_empty());
}

#[test]
fn oversized_placement_scale_is_rejected_before_drawing() {
    let (p, _) = pipeline(SolidAssets::default());
    let style = TokenStyle {
        should_reposition: true,
        shrink_to_fit: 1000.0,
        ..TokenStyle::bare()
    };
    let red = PixelBuffer::from_rgba(10, 10, [255, 0, 0, 255].repeat(100)).unwrap();
    let err = p
        .style_pixels(red, Team::Townsfolk, &style, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, TokenError::Validation(_)));
}

#[test]
fn placement_rect_shrinks_around_region_center() {
    assert_eq!(placement_rect(1.0), (120.0, 50.0, 300.0, 300.0));
    assert_eq!(placement_rect(0.5), (195.0, 125.0, 150.0, 150.0));
}

#[test]
fn without_reposition_the_whole_canvas_is_used() {
    let (p, _) = pipeline(SolidAssets::default());
    let out = p
        .style_pixels(
            PixelBuffer::filled(10, 20, [1, 2, 3, 255]),
            Team::Townsfolk,
            &TokenStyle::bare(),
            &CancelToken::new(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(out.pixel(270, 0)[3], 255);
    assert_eq!(out.pixel(270, 539)[3], 255);
    assert_eq!(out.pixel(0, 270)[3], 0);
}
