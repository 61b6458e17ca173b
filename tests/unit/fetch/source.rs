use super::*;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

use crate::messages::MessageSink;

#[derive(Default)]
struct Recorder {
    bodies: Mutex<Vec<String>>,
}

impl MessageSink for Recorder {
    fn show(&self, _title: &str, body: &str) {
        self.bodies.lock().unwrap().push(body.to_owned());
    }
}

/// Echoes the requested URL back as the body, optionally after a delay.
struct Echo {
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl Echo {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Fetch for Echo {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> TokenResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.to_owned());
        std::thread::sleep(self.delay);
        cancel.check(url)?;
        if url.contains("missing") {
            return Err(TokenError::network(url, NetworkFailure::Status(404)));
        }
        Ok(url.as_bytes().to_vec())
    }
}

#[test]
fn encode_uri_component_matches_browser_behaviour() {
    assert_eq!(encode_uri_component("abc-_.!~*'()"), "abc-_.!~*'()");
    assert_eq!(
        encode_uri_component("https://a.b/c d?x=1&y=é"),
        "https%3A%2F%2Fa.b%2Fc%20d%3Fx%3D1%26y%3D%C3%A9"
    );
}

#[test]
fn url_host_and_proxy_decision() {
    assert_eq!(url_host("https://User@Example.com:8080/x").as_deref(), Some("example.com"));
    assert_eq!(url_host("./img/texture.png"), None);
    assert_eq!(url_host("data:image/png;base64,AAAA"), None);

    assert!(needs_cors_proxy("https://example.com/a.png", None));
    assert!(!needs_cors_proxy("https://example.com/a.png", Some("EXAMPLE.com")));
    assert!(needs_cors_proxy("https://other.net/a.png", Some("example.com")));
    assert!(!needs_cors_proxy("img/a.png", None));
}

#[test]
fn route_applies_proxy_only_when_enabled() {
    let mut opts = FetchOptions::default();
    assert_eq!(opts.route("https://x.org/a.png"), "https://x.org/a.png");
    opts.use_cors_proxy = true;
    assert_eq!(
        opts.route("https://x.org/a.png"),
        format!("{DEFAULT_CORS_PROXY}https%3A%2F%2Fx.org%2Fa.png")
    );
    assert_eq!(opts.route("./img/a.png"), "./img/a.png");
}

#[test]
fn options_defaults_and_json() {
    let opts = FetchOptions::default();
    assert_eq!(opts.timeout(), Duration::from_secs(30));
    assert_eq!(opts.max_simultaneous, 5);
    assert_eq!(opts.request_class, "imageRequest");

    let parsed: FetchOptions = serde_json::from_str(r#"{"timeoutMs": 15000}"#).unwrap();
    assert_eq!(parsed.timeout(), Duration::from_secs(15));
    assert_eq!(parsed.cors_proxy, DEFAULT_CORS_PROXY);
}

#[test]
fn throttled_fetcher_routes_and_reports_original_url() {
    let echo = Arc::new(Echo::new(Duration::ZERO));
    let rec = Arc::new(Recorder::default());
    let opts = FetchOptions {
        use_cors_proxy: true,
        ..FetchOptions::default()
    };
    let fetcher = ThrottledFetcher::new(echo.clone(), FetchThrottle::new(), opts)
        .with_reporter(Arc::new(NetworkReporter::new(rec.clone())));

    let body = fetcher.fetch("https://x.org/a.png", &CancelToken::new()).unwrap();
    assert!(String::from_utf8(body).unwrap().starts_with(DEFAULT_CORS_PROXY));

    let err = fetcher
        .fetch("https://x.org/missing.png", &CancelToken::new())
        .unwrap_err();
    match err {
        TokenError::Network { url, failure } => {
            assert_eq!(url, "https://x.org/missing.png");
            assert_eq!(failure, NetworkFailure::Status(404));
        }
        other => panic!("unexpected {other:?}"),
    }
    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("https://x.org/missing.png"));
}

#[test]
fn throttled_fetcher_times_out_and_cancels() {
    let echo = Arc::new(Echo::new(Duration::from_millis(200)));
    let opts = FetchOptions {
        timeout_ms: 10,
        ..FetchOptions::default()
    };
    let fetcher = ThrottledFetcher::new(echo, FetchThrottle::new(), opts);
    let cancel = CancelToken::new();
    let err = fetcher.fetch("img/slow.png", &cancel).unwrap_err();
    assert!(matches!(
        err,
        TokenError::Network {
            failure: NetworkFailure::Timeout,
            ..
        }
    ));
    assert!(cancel.is_cancelled());
    assert!(err.is_recoverable());
}

#[test]
fn cancelled_token_aborts_before_transport() {
    let echo = Arc::new(Echo::new(Duration::ZERO));
    let fetcher = ThrottledFetcher::new(echo.clone(), FetchThrottle::new(), FetchOptions::default());
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = fetcher.fetch("img/a.png", &cancel).unwrap_err();
    assert!(matches!(
        err,
        TokenError::Network {
            failure: NetworkFailure::Aborted,
            ..
        }
    ));
    assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn fs_fetcher_reads_relative_and_file_urls() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("img")).unwrap();
    std::fs::write(dir.path().join("img/texture.png"), b"abc").unwrap();

    let fs = FsFetcher::new(dir.path());
    let cancel = CancelToken::new();
    assert_eq!(fs.fetch("./img/texture.png", &cancel).unwrap(), b"abc");
    assert_eq!(fs.fetch("img\\texture.png", &cancel).unwrap(), b"abc");

    let abs = format!("file://{}", dir.path().join("img/texture.png").display());
    assert_eq!(fs.fetch(&abs, &cancel).unwrap(), b"abc");

    assert!(matches!(
        fs.fetch("img/nope.png", &cancel).unwrap_err(),
        TokenError::Network {
            failure: NetworkFailure::Status(404),
            ..
        }
    ));
    assert!(matches!(
        fs.fetch("../secret.png", &cancel).unwrap_err(),
        TokenError::Validation(_)
    ));
    assert!(matches!(
        fs.fetch("https://x.org/a.png", &cancel).unwrap_err(),
        TokenError::Network {
            failure: NetworkFailure::Unavailable,
            ..
        }
    ));
}

#[test]
fn local_asset_urls_map_under_the_root() {
    assert_eq!(
        local_asset("./img//x/./c.png?v=2#top").unwrap(),
        LocalAsset::Relative(PathBuf::from("img/x/c.png"))
    );
    assert_eq!(
        local_asset("img\\texture.png").unwrap(),
        LocalAsset::Relative(PathBuf::from("img/texture.png"))
    );
    assert_eq!(
        local_asset("file:///tmp/a.png").unwrap(),
        LocalAsset::File(PathBuf::from("/tmp/a.png"))
    );
    assert!(local_asset("/abs.png").is_err());
    assert!(local_asset("").is_err());
    assert!(local_asset("./.").is_err());
    assert!(local_asset("?v=1").is_err());
    assert!(matches!(
        local_asset("img/../../secret.png").unwrap_err(),
        TokenError::Validation(_)
    ));
}
