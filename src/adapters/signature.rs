//! HMAC primitives shared by the provider adapters. Comparison is
//! constant-time via `Mac::verify_slice`.

use {
    crate::domain::error::PipelineError,
    axum::http::HeaderMap,
    base64::Engine,
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, signed_content: &[u8]) -> Result<HmacSha256, PipelineError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PipelineError::Verification("invalid signing secret".into()))?;
    mac.update(signed_content);
    Ok(mac)
}

/// Verifies a hex-encoded HMAC-SHA256 digest.
pub fn verify_hex(
    secret: &str,
    signed_content: &[u8],
    claimed: &str,
) -> Result<(), PipelineError> {
    let digest = hex::decode(claimed)
        .map_err(|_| PipelineError::Verification("signature is not valid hex".into()))?;
    mac(secret, signed_content)?
        .verify_slice(&digest)
        .map_err(|_| PipelineError::Verification("signature mismatch".into()))
}

/// Verifies a base64-encoded HMAC-SHA256 digest.
pub fn verify_base64(
    secret: &str,
    signed_content: &[u8],
    claimed: &str,
) -> Result<(), PipelineError> {
    let digest = base64::engine::general_purpose::STANDARD
        .decode(claimed)
        .map_err(|_| PipelineError::Verification("signature is not valid base64".into()))?;
    mac(secret, signed_content)?
        .verify_slice(&digest)
        .map_err(|_| PipelineError::Verification("signature mismatch".into()))
}

/// A missing or non-UTF-8 header is a verification failure, never an
/// implicit "unsigned but trusted".
pub fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, PipelineError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PipelineError::Verification(format!("missing {name} header")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_hex(secret: &str, content: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(content);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn hex_roundtrip_verifies() {
        let sig = sign_hex("whsec_test", b"payload");
        assert!(verify_hex("whsec_test", b"payload", &sig).is_ok());
    }

    #[test]
    fn tampered_content_is_rejected() {
        let sig = sign_hex("whsec_test", b"payload");
        assert!(verify_hex("whsec_test", b"payload2", &sig).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = sign_hex("whsec_test", b"payload");
        assert!(verify_hex("whsec_other", b"payload", &sig).is_err());
    }

    #[test]
    fn garbage_encoding_is_rejected() {
        assert!(verify_hex("whsec_test", b"payload", "zz-not-hex").is_err());
        assert!(verify_base64("whsec_test", b"payload", "!!!").is_err());
    }
}
