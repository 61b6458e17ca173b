use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetch::throttle::{FetchThrottle, IMAGE_REQUEST_CLASS, MAX_SIMULTANEOUS_IMAGE_REQUESTS};
use crate::foundation::error::{NetworkFailure, TokenError, TokenResult};
use crate::messages::NetworkReporter;

pub const DEFAULT_CORS_PROXY: &str = "https://www.bloodstar.xyz/corsproxy/?url=";

/// Shared flag a transport polls to abandon a request early.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Aborted)` once cancelled.
    pub fn check(&self, url: &str) -> TokenResult<()> {
        if self.is_cancelled() {
            return Err(TokenError::network(url, NetworkFailure::Aborted));
        }
        Ok(())
    }
}

/// Byte transport for image URLs.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> TokenResult<Vec<u8>>;
}

impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> TokenResult<Vec<u8>> {
        (**self).fetch(url, cancel)
    }
}

/// How remote image requests are bounded and routed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchOptions {
    pub timeout_ms: u64,
    pub cors_proxy: String,
    /// Route foreign-host `http(s)` URLs through `cors_proxy`.
    pub use_cors_proxy: bool,
    /// Host the tool itself is served from; URLs on this host are never proxied.
    pub local_host: Option<String>,
    pub request_class: String,
    pub max_simultaneous: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            cors_proxy: DEFAULT_CORS_PROXY.to_owned(),
            use_cors_proxy: false,
            local_host: None,
            request_class: IMAGE_REQUEST_CLASS.to_owned(),
            max_simultaneous: MAX_SIMULTANEOUS_IMAGE_REQUESTS,
        }
    }
}

impl FetchOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The URL actually requested for `url`.
    pub fn route(&self, url: &str) -> String {
        if self.use_cors_proxy && needs_cors_proxy(url, self.local_host.as_deref()) {
            cors_proxy_url(&self.cors_proxy, url)
        } else {
            url.to_owned()
        }
    }
}

/// Host part of an absolute `http(s)` URL, lowercased.
pub fn url_host(url: &str) -> Option<String> {
    let lower = url.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default();
    (!host.is_empty()).then(|| host.to_owned())
}

/// A URL on a host other than `local_host` needs the proxy; relative paths and data URIs never do.
pub fn needs_cors_proxy(url: &str, local_host: Option<&str>) -> bool {
    match (url_host(url), local_host) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(host), Some(local)) => !host.eq_ignore_ascii_case(local),
    }
}

pub fn cors_proxy_url(prefix: &str, url: &str) -> String {
    format!("{prefix}{}", encode_uri_component(url))
}

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn encode_uri_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        let keep = b.is_ascii_alphanumeric()
            || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')');
        if keep {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0f)]));
        }
    }
    out
}

/// Wraps a transport with admission control, a deadline, proxy routing and failure reporting.
pub struct ThrottledFetcher {
    inner: Arc<dyn Fetch>,
    throttle: FetchThrottle,
    options: FetchOptions,
    reporter: Arc<NetworkReporter>,
}

impl ThrottledFetcher {
    pub fn new(inner: Arc<dyn Fetch>, throttle: FetchThrottle, options: FetchOptions) -> Self {
        Self {
            inner,
            throttle,
            options,
            reporter: Arc::new(NetworkReporter::default()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<NetworkReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn throttle(&self) -> &FetchThrottle {
        &self.throttle
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn fetch_routed(&self, url: &str, cancel: &CancelToken) -> TokenResult<Vec<u8>> {
        let routed = self.options.route(url);
        let permit = self
            .throttle
            .acquire(&self.options.request_class, self.options.max_simultaneous);
        cancel.check(url)?;

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let worker_cancel = cancel.clone();
        let target = routed.clone();
        std::thread::spawn(move || {
            let _permit = permit;
            let res = inner.fetch(&target, &worker_cancel);
            let _ = tx.send(res);
        });

        match rx.recv_timeout(self.options.timeout()) {
            Ok(res) => res.map_err(|e| match e {
                // Report the URL the caller asked for, not the proxied one.
                TokenError::Network { failure, .. } => TokenError::network(url, failure),
                other => other,
            }),
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                Err(TokenError::network(url, NetworkFailure::Timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(TokenError::network(url, NetworkFailure::Aborted))
            }
        }
    }
}

impl Fetch for ThrottledFetcher {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> TokenResult<Vec<u8>> {
        let res = self.fetch_routed(url, cancel);
        if let Err(TokenError::Network { failure, .. }) = &res {
            tracing::warn!(url, %failure, "image fetch failed");
            match failure {
                NetworkFailure::Timeout => self
                    .reporter
                    .report_now(&format!("Request timed out trying to reach {url}")),
                NetworkFailure::Aborted => {}
                _ => {
                    self.reporter
                        .report(&format!("Something went wrong while trying to reach {url}"));
                }
            }
        }
        res
    }
}

impl std::fmt::Debug for ThrottledFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledFetcher")
            .field("options", &self.options)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

/// Serves asset paths (`./img/texture.png`) and `file://` URLs from a directory.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> TokenResult<PathBuf> {
        if url_host(url).is_some() {
            return Err(TokenError::network(url, NetworkFailure::Unavailable));
        }
        Ok(match local_asset(url)? {
            LocalAsset::File(path) => path,
            LocalAsset::Relative(rel) => self.root.join(rel),
        })
    }
}

impl Fetch for FsFetcher {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> TokenResult<Vec<u8>> {
        cancel.check(url)?;
        let path = self.resolve(url)?;
        std::fs::read(&path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "asset read failed");
            let failure = if e.kind() == std::io::ErrorKind::NotFound {
                NetworkFailure::Status(404)
            } else {
                NetworkFailure::Unavailable
            };
            TokenError::network(url, failure)
        })
    }
}

/// Where a local asset URL points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalAsset {
    /// `file://` URL, read as is.
    File(PathBuf),
    /// Cleaned path under the assets directory.
    Relative(PathBuf),
}

/// Map an asset URL such as `./img/texture.png?v=2` or `file:///tmp/a.png` to a local path.
///
/// Query and fragment are dropped. Relative paths may not be rooted or climb out with `..`.
pub fn local_asset(url: &str) -> TokenResult<LocalAsset> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(LocalAsset::File(PathBuf::from(path)));
    }
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    if path.starts_with(|c: char| c == '/' || c == '\\') {
        return Err(TokenError::validation(format!("asset url must be relative: {url}")));
    }

    let mut rel = PathBuf::new();
    for part in path.split(|c: char| c == '/' || c == '\\') {
        match part {
            "" | "." => {}
            ".." => {
                return Err(TokenError::validation(format!(
                    "asset url leaves the assets directory: {url}"
                )));
            }
            name => rel.push(name),
        }
    }
    if rel.as_os_str().is_empty() {
        return Err(TokenError::validation(format!("asset url names no file: {url:?}")));
    }
    Ok(LocalAsset::Relative(rel))
}

#[cfg(test)]
#[path = "../../tests/unit/fetch/source.rs"]
mod tests;
