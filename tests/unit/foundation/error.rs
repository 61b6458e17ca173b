use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(TokenError::decode("x").to_string().contains("decode error:"));
    assert!(TokenError::shape("x").to_string().contains("shape error:"));
    assert!(
        TokenError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(TokenError::encode("x").to_string().contains("encode error:"));
    assert!(
        TokenError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn network_error_names_the_url() {
    let err = TokenError::network("./img/texture.png", NetworkFailure::Timeout);
    let msg = err.to_string();
    assert!(msg.contains("./img/texture.png"));
    assert!(msg.contains("timed out"));

    let err = TokenError::network("https://x.test/a.png", NetworkFailure::Status(404));
    assert!(err.to_string().contains("status 404"));
}

#[test]
fn only_network_errors_are_recoverable() {
    assert!(TokenError::network("u", NetworkFailure::Unavailable).is_recoverable());
    assert!(!TokenError::shape("even kernel").is_recoverable());
    assert!(!TokenError::decode("garbage").is_recoverable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TokenError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
