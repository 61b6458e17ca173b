//! Source image intake and the gradient/texture images a token is styled with.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::encode::{decode_data_uri, is_data_uri};
use crate::fetch::{CancelToken, Fetch};
use crate::foundation::error::{TokenError, TokenResult};
use crate::model::team::Team;
use crate::observe::lock;
use crate::raster::PixelBuffer;

pub const TEXTURE_URL: &str = "./img/texture.png";
pub const TOWNSFOLK_GRADIENT_URL: &str = "./img/townsfolkgradient.png";
pub const OUTSIDER_GRADIENT_URL: &str = "./img/outsidergradient.png";
pub const MINION_GRADIENT_URL: &str = "./img/miniongradient.png";
pub const DEMON_GRADIENT_URL: &str = "./img/demongradient.png";
pub const TRAVELER_GRADIENT_URL: &str = "./img/travelergradient.png";

/// Gradient asset for `team`. Without team colors outsiders share the townsfolk gradient and
/// minions share the demon one.
pub fn gradient_url(team: Team, use_outsider_and_minion_colors: bool) -> &'static str {
    match team {
        Team::Townsfolk => TOWNSFOLK_GRADIENT_URL,
        Team::Outsider if use_outsider_and_minion_colors => OUTSIDER_GRADIENT_URL,
        Team::Outsider => TOWNSFOLK_GRADIENT_URL,
        Team::Minion if use_outsider_and_minion_colors => MINION_GRADIENT_URL,
        Team::Minion => DEMON_GRADIENT_URL,
        Team::Demon => DEMON_GRADIENT_URL,
        Team::Traveler => TRAVELER_GRADIENT_URL,
    }
}

/// Where an unstyled image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceImage {
    /// Already decoded pixels.
    Bitmap(Arc<PixelBuffer>),
    /// Encoded image file bytes (PNG, JPEG, ...).
    Encoded(Arc<Vec<u8>>),
    /// `data:` URI with an encoded image payload.
    DataUri(String),
    /// Asset path or remote URL, resolved through a [`Fetch`].
    Url(String),
}

impl SourceImage {
    /// Classify a stored reference string.
    pub fn from_reference(s: impl Into<String>) -> Self {
        let s = s.into();
        if is_data_uri(&s) {
            Self::DataUri(s)
        } else {
            Self::Url(s)
        }
    }

    /// String form for persistence, if this source has one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::DataUri(s) | Self::Url(s) => Some(s),
            Self::Bitmap(_) | Self::Encoded(_) => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl From<PixelBuffer> for SourceImage {
    fn from(buf: PixelBuffer) -> Self {
        Self::Bitmap(Arc::new(buf))
    }
}

pub fn decode_image(bytes: &[u8]) -> TokenResult<PixelBuffer> {
    let img = image::load_from_memory(bytes).map_err(|e| TokenError::decode(e.to_string()))?;
    Ok(PixelBuffer::from_image(&img))
}

/// Shrink `buf` so it fits inside `max_w` x `max_h`, keeping its aspect ratio. Never enlarges.
pub fn fit_within(buf: PixelBuffer, max_w: u32, max_h: u32) -> PixelBuffer {
    let (w, h) = buf.dimensions();
    if w == 0 || h == 0 {
        return buf;
    }
    let scale = 1.0_f64
        .min(f64::from(max_w) / f64::from(w))
        .min(f64::from(max_h) / f64::from(h));
    if scale >= 1.0 {
        return buf;
    }
    let nw = ((scale * f64::from(w)) as u32).max(1);
    let nh = ((scale * f64::from(h)) as u32).max(1);
    buf.resized(nw, nh)
}

type CacheKey = (String, u32, u32);

/// Turns [`SourceImage`]s into pixel buffers, memoising URL loads by `(url, max_w, max_h)`.
pub struct ImageLoader {
    fetcher: Arc<dyn Fetch>,
    cache: Mutex<HashMap<CacheKey, Arc<PixelBuffer>>>,
}

impl ImageLoader {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Decode `source` and shrink it to fit `max_w` x `max_h`. Nothing is cached.
    pub fn load(
        &self,
        source: &SourceImage,
        max_w: u32,
        max_h: u32,
        cancel: &CancelToken,
    ) -> TokenResult<PixelBuffer> {
        let decoded = match source {
            SourceImage::Bitmap(buf) => PixelBuffer::clone(buf),
            SourceImage::Encoded(bytes) => decode_image(bytes)?,
            SourceImage::DataUri(uri) => decode_image(&decode_data_uri(uri)?)?,
            SourceImage::Url(url) => decode_image(&self.fetcher.fetch(url, cancel)?)?,
        };
        Ok(fit_within(decoded, max_w, max_h))
    }

    /// Like [`ImageLoader::load`] for a reference string, reusing earlier results for URLs.
    /// `data:` URIs bypass the cache.
    pub fn load_cached(
        &self,
        url: &str,
        max_w: u32,
        max_h: u32,
        cancel: &CancelToken,
    ) -> TokenResult<Arc<PixelBuffer>> {
        let source = SourceImage::from_reference(url);
        if !source.is_remote() {
            return self.load(&source, max_w, max_h, cancel).map(Arc::new);
        }

        let key = (url.to_owned(), max_w, max_h);
        if let Some(hit) = lock(&self.cache).get(&key) {
            tracing::trace!(url, "image cache hit");
            return Ok(Arc::clone(hit));
        }

        let loaded = Arc::new(self.load(&source, max_w, max_h, cancel)?);
        // Concurrent misses for one key may both load; the first insert wins.
        let mut cache = lock(&self.cache);
        Ok(Arc::clone(cache.entry(key).or_insert(loaded)))
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

/// Supplier of the fixed images used by the colorize and texture steps.
pub trait TokenAssets: Send + Sync {
    fn gradient_for_team(
        &self,
        team: Team,
        use_outsider_and_minion_colors: bool,
        width: u32,
        height: u32,
        cancel: &CancelToken,
    ) -> TokenResult<PixelBuffer>;

    fn texture(&self, width: u32, height: u32, cancel: &CancelToken) -> TokenResult<PixelBuffer>;
}

/// [`TokenAssets`] backed by the standard asset URLs and a caching [`ImageLoader`].
#[derive(Debug)]
pub struct RemoteAssets {
    loader: Arc<ImageLoader>,
}

impl RemoteAssets {
    pub fn new(loader: Arc<ImageLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<ImageLoader> {
        &self.loader
    }
}

impl TokenAssets for RemoteAssets {
    fn gradient_for_team(
        &self,
        team: Team,
        use_outsider_and_minion_colors: bool,
        width: u32,
        height: u32,
        cancel: &CancelToken,
    ) -> TokenResult<PixelBuffer> {
        let url = gradient_url(team, use_outsider_and_minion_colors);
        let img = self.loader.load_cached(url, width, height, cancel)?;
        Ok(PixelBuffer::clone(&img))
    }

    fn texture(&self, width: u32, height: u32, cancel: &CancelToken) -> TokenResult<PixelBuffer> {
        let img = self.loader.load_cached(TEXTURE_URL, width, height, cancel)?;
        Ok(PixelBuffer::clone(&img))
    }
}

#[cfg(test)]
#[path = "../tests/unit/assets.rs"]
mod tests;
