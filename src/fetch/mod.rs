//! Throttled access to remote and on-disk image bytes.

pub mod source;
pub mod throttle;

pub use source::{CancelToken, Fetch, FetchOptions, FsFetcher, ThrottledFetcher};
pub use throttle::{FetchThrottle, IMAGE_REQUEST_CLASS, MAX_SIMULTANEOUS_IMAGE_REQUESTS, Permit};
