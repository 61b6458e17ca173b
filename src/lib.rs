//! Character token artwork for custom Blood on the Clocktower editions.
//!
//! A user-supplied portrait is turned into a finished 540x540 token icon:
//!
//! 1. **Intake**: decode the portrait (bitmap, encoded bytes, `data:` URI or URL) and shrink it to
//!    fit the canvas.
//! 2. **Trim**: crop to the visible-pixel bounding box.
//! 3. **Colorize**: whiten the silhouette and multiply the team gradient over it.
//! 4. **Place**: letterbox it into the usable region of the full canvas.
//! 5. **Texture, border, drop shadow**: multiply a grunge texture, outline the silhouette, and
//!    composite it over a blurred offset shadow.
//! 6. **Encode**: PNG bytes and a `data:` URI.
//!
//! Pixels are straight (non-premultiplied) RGBA8 throughout; see [`PixelBuffer`].
//!
//! [`Character`] ties the pipeline to observable inputs and regenerates its token whenever the
//! portrait, team or a styling field changes. Remote images are fetched through a
//! [`FetchThrottle`] that bounds how many requests of one class run at once.
#![forbid(unsafe_code)]

mod assets;
mod encode;
mod fetch;
mod foundation;
mod messages;
mod model;
mod observe;
mod pipeline;
mod raster;

pub use assets::{
    DEMON_GRADIENT_URL, ImageLoader, MINION_GRADIENT_URL, OUTSIDER_GRADIENT_URL, RemoteAssets,
    SourceImage, TEXTURE_URL, TOWNSFOLK_GRADIENT_URL, TRAVELER_GRADIENT_URL, TokenAssets,
    decode_image, fit_within, gradient_url,
};
pub use encode::{PNG_MIME, TokenImage, decode_data_uri, encode_png, is_data_uri, to_data_uri};
pub use fetch::source::{
    DEFAULT_CORS_PROXY, LocalAsset, cors_proxy_url, encode_uri_component, local_asset,
    needs_cors_proxy, url_host,
};
pub use fetch::{
    CancelToken, Fetch, FetchOptions, FetchThrottle, FsFetcher, IMAGE_REQUEST_CLASS,
    MAX_SIMULTANEOUS_IMAGE_REQUESTS, Permit, ThrottledFetcher,
};
pub use foundation::error::{NetworkFailure, TokenError, TokenResult};
pub use foundation::math::{gaussian, to_byte};
pub use messages::{LogMessages, MessageSink, NETWORK_ERROR_TITLE, NetworkReporter};
pub use model::{
    Character, CharacterImageData, ImageSettings, MAX_BORDER_INTENSITY, MAX_DROP_SHADOW_SIZE,
    MAX_SHRINK_TO_FIT, RegenSuspension, Team, TokenStyle, regenerate_all,
};
pub use observe::{ChangeListener, ListenerId, ListenerList, Observable, Property, ValueListener};
pub use pipeline::{
    FULL_HEIGHT, FULL_WIDTH, StyledImage, TokenPipeline, USABLE_REGION_HEIGHT,
    USABLE_REGION_WIDTH, USABLE_REGION_X, USABLE_REGION_Y, placement_rect,
};
pub use raster::effects::{DROP_SHADOW_DOWNSCALE, EDGE_ALPHA_THRESHOLD};
pub use raster::kernel::MIN_GAUSSIAN_RADIUS;
pub use raster::{Channel, Kernel, PixelBuffer, PixelRect, Rgba8, TRANSPARENT, make_gaussian_kernel};
