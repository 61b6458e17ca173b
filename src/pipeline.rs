//! Turns an unstyled character portrait into a finished token icon.

use std::sync::Arc;

use crate::assets::{ImageLoader, RemoteAssets, SourceImage, TokenAssets};
use crate::encode::TokenImage;
use crate::fetch::{CancelToken, Fetch};
use crate::foundation::error::TokenResult;
use crate::model::settings::TokenStyle;
use crate::model::team::Team;
use crate::raster::PixelBuffer;

pub const FULL_WIDTH: u32 = 540;
pub const FULL_HEIGHT: u32 = 540;

/// Part of the full canvas a repositioned icon is fitted into.
pub const USABLE_REGION_X: f64 = 120.0;
pub const USABLE_REGION_Y: f64 = 50.0;
pub const USABLE_REGION_WIDTH: f64 = 300.0;
pub const USABLE_REGION_HEIGHT: f64 = 300.0;

/// Result of a regeneration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyledImage {
    /// Restyling is off; the source is shown as is.
    Unstyled(SourceImage),
    Token(TokenImage),
}

impl StyledImage {
    pub fn as_token(&self) -> Option<&TokenImage> {
        match self {
            Self::Token(t) => Some(t),
            Self::Unstyled(_) => None,
        }
    }

    /// Persistable reference: a PNG data URI for tokens, the source reference otherwise.
    pub fn to_reference(&self) -> Option<String> {
        match self {
            Self::Token(t) => Some(t.to_data_uri()),
            Self::Unstyled(src) => src.reference().map(str::to_owned),
        }
    }
}

/// Usable region scaled by `shrink_to_fit` around its center, as `(x, y, w, h)`.
pub fn placement_rect(shrink_to_fit: f64) -> (f64, f64, f64, f64) {
    let w = USABLE_REGION_WIDTH * shrink_to_fit;
    let h = USABLE_REGION_HEIGHT * shrink_to_fit;
    (
        USABLE_REGION_X + (USABLE_REGION_WIDTH - w) / 2.0,
        USABLE_REGION_Y + (USABLE_REGION_HEIGHT - h) / 2.0,
        w,
        h,
    )
}

/// Styling orchestrator. Cheap to clone; clones share the loader cache and assets.
#[derive(Clone)]
pub struct TokenPipeline {
    loader: Arc<ImageLoader>,
    assets: Arc<dyn TokenAssets>,
}

impl TokenPipeline {
    pub fn new(loader: Arc<ImageLoader>, assets: Arc<dyn TokenAssets>) -> Self {
        Self { loader, assets }
    }

    /// Pipeline that loads sources and the standard assets through `fetcher`.
    pub fn from_fetcher(fetcher: Arc<dyn Fetch>) -> Self {
        let loader = Arc::new(ImageLoader::new(fetcher));
        let assets = Arc::new(RemoteAssets::new(Arc::clone(&loader)));
        Self::new(loader, assets)
    }

    pub fn loader(&self) -> &Arc<ImageLoader> {
        &self.loader
    }

    /// Full regeneration for one character.
    ///
    /// `Ok(None)` means "no icon": either there is no source or trimming left nothing visible.
    #[tracing::instrument(skip(self, source, style, cancel))]
    pub fn render(
        &self,
        source: Option<&SourceImage>,
        team: Team,
        style: &TokenStyle,
        cancel: &CancelToken,
    ) -> TokenResult<Option<StyledImage>> {
        let Some(source) = source else {
            return Ok(None);
        };
        if !style.should_restyle {
            tracing::debug!("restyle disabled, passing source through");
            return Ok(Some(StyledImage::Unstyled(source.clone())));
        }
        style.validate()?;

        let working = self
            .loader
            .load(source, FULL_WIDTH, FULL_HEIGHT, cancel)?;
        tracing::debug!(width = working.width(), height = working.height(), "source loaded");

        let Some(styled) = self.style_pixels(working, team, style, cancel)? else {
            return Ok(None);
        };
        Ok(Some(StyledImage::Token(TokenImage::encode(styled)?)))
    }

    /// Steps after intake: trim, colorize, place, texture, border, drop shadow.
    pub fn style_pixels(
        &self,
        mut img: PixelBuffer,
        team: Team,
        style: &TokenStyle,
        cancel: &CancelToken,
    ) -> TokenResult<Option<PixelBuffer>> {
        style.validate()?;
        if style.should_reposition {
            img = img.trim();
            tracing::debug!(width = img.width(), height = img.height(), "trimmed");
        }
        if img.is_empty() {
            tracing::debug!("nothing visible after trim");
            return Ok(None);
        }

        if style.should_colorize {
            let (w, h) = img.dimensions();
            let gradient = self.assets.gradient_for_team(
                team,
                style.use_outsider_and_minion_colors,
                w,
                h,
                cancel,
            )?;
            img.set_rgb(255, 255, 255);
            img.multiply(&gradient.resized(w, h));
            tracing::debug!(%team, "colorized");
        }

        img = if style.should_reposition {
            let (x, y, w, h) = placement_rect(style.shrink_to_fit);
            let mut canvas = PixelBuffer::new(FULL_WIDTH, FULL_HEIGHT);
            canvas.paste_zoomed(&img, x, y, w, h);
            canvas
        } else {
            img.fit(FULL_WIDTH, FULL_HEIGHT)
        };

        if style.use_texture {
            let texture = self.assets.texture(FULL_WIDTH, FULL_HEIGHT, cancel)?;
            img.multiply(&texture.resized(FULL_WIDTH, FULL_HEIGHT));
            tracing::debug!("texture applied");
        }

        if style.use_border {
            img.add_border(style.border_intensity)?;
            tracing::debug!(intensity = style.border_intensity, "border added");
        }

        if style.use_dropshadow {
            img = img.add_drop_shadow(
                style.drop_shadow_size,
                style.drop_shadow_offset_x,
                style.drop_shadow_offset_y,
                style.drop_shadow_opacity,
            )?;
            tracing::debug!(size = style.drop_shadow_size, "drop shadow added");
        }

        Ok(Some(img))
    }
}

impl std::fmt::Debug for TokenPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPipeline")
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
