use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header the gateway signs webhook deliveries with.
pub const SIGNATURE_HEADER: &str = "YooKassa-Signature";

/// Checks `sha256=<hex>` (or a bare hex digest) against HMAC-SHA256 of the exact raw body.
pub fn verify_webhook_signature(raw_body: &[u8], header: Option<&str>, secret: &str) -> bool {
    let Some(header) = header.map(str::trim).filter(|h| !h.is_empty()) else {
        warn!("webhook signature header missing");
        return false;
    };
    if secret.is_empty() {
        warn!("webhook secret is not configured");
        return false;
    }

    let digest_hex = match header.split_once('=') {
        Some((algo, digest)) if algo.eq_ignore_ascii_case("sha256") => digest,
        Some((algo, _)) => {
            warn!(algorithm = %algo, "unsupported webhook signature algorithm");
            return false;
        }
        None => header,
    };
    let Ok(provided) = hex::decode(digest_hex) else {
        warn!("webhook signature is not valid hex");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    let ok: bool = expected.as_slice().ct_eq(provided.as_slice()).into();
    if !ok {
        warn!("webhook signature mismatch");
    }
    ok
}

#[cfg(test)]
pub(crate) fn sign(raw_body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(raw_body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"type":"notification","event":"payment.succeeded","object":{"id":"p1"}}"#;

    #[test]
    fn accepts_matching_signature() {
        let header = sign(BODY, "s3cret");
        assert!(verify_webhook_signature(BODY, Some(&header), "s3cret"));
        let bare = header.trim_start_matches("sha256=").to_string();
        assert!(verify_webhook_signature(BODY, Some(&bare), "s3cret"));
    }

    #[test]
    fn rejects_tampered_body_or_wrong_secret() {
        let header = sign(BODY, "s3cret");
        let tampered = br#"{"type":"notification","event":"payment.succeeded","object":{"id":"p2"}}"#;
        assert!(!verify_webhook_signature(tampered, Some(&header), "s3cret"));
        assert!(!verify_webhook_signature(BODY, Some(&header), "other"));
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert!(!verify_webhook_signature(BODY, None, "s3cret"));
        assert!(!verify_webhook_signature(BODY, Some(""), "s3cret"));
        assert!(!verify_webhook_signature(BODY, Some("sha256=zz"), "s3cret"));
        assert!(!verify_webhook_signature(BODY, Some("sha256="), "s3cret"));
        let md5ish = sign(BODY, "s3cret").replace("sha256=", "md5=");
        assert!(!verify_webhook_signature(BODY, Some(&md5ish), "s3cret"));
    }

    #[test]
    fn empty_secret_never_verifies() {
        let header = sign(BODY, "");
        assert!(!verify_webhook_signature(BODY, Some(&header), ""));
    }
}
