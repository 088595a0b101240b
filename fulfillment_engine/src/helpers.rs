use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::Sha256;

use crate::db_types::OrderId;

type HmacSha256 = Hmac<Sha256>;

/// Generates a fresh public order id of the form `ord-x7k2m9q4w1zp`.
///
/// The suffix is random rather than sequential so that ids leak nothing about order volume.
pub fn new_order_ref() -> OrderId {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(|c| char::from(c).to_ascii_lowercase()).collect();
    OrderId(format!("ord-{suffix}"))
}

/// The hex-encoded HMAC-SHA256 signature a gateway is expected to send for `body`.
pub fn calculate_hmac(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a webhook signature header against the raw request body.
///
/// The header value is the hex HMAC, optionally prefixed with `sha256=` or `Bearer ` depending on
/// the gateway. Comparison is constant-time via [`Mac::verify_slice`].
pub fn verify_webhook_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let signature = header.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let signature = signature.strip_prefix("Bearer ").unwrap_or(signature);
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn order_refs_have_the_expected_shape() {
        for _ in 0..100 {
            let id = new_order_ref();
            assert!(id.as_str().starts_with("ord-"));
            assert_eq!(id.as_str().len(), 16);
            assert!(id.as_str()[4..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn order_refs_do_not_collide_in_practice() {
        let ids: HashSet<String> = (0..1000).map(|_| new_order_ref().0).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn signature_verification_accepts_a_correctly_signed_body() {
        let secret = "sfg-test-secret";
        let body = br#"{"external_ref":"pay-123","status":"paid","amount":5000}"#;
        let sig = calculate_hmac(secret, body);
        assert!(verify_webhook_signature(secret, body, &sig));
        assert!(verify_webhook_signature(secret, body, &format!("sha256={sig}")));
        assert!(verify_webhook_signature(secret, body, &format!("Bearer {sig}")));
    }

    #[test]
    fn signature_verification_rejects_tampering() {
        let secret = "sfg-test-secret";
        let body = br#"{"external_ref":"pay-123","status":"paid","amount":5000}"#;
        let sig = calculate_hmac(secret, body);
        let tampered = br#"{"external_ref":"pay-123","status":"paid","amount":9999}"#;
        assert!(!verify_webhook_signature(secret, tampered, &sig));
        assert!(!verify_webhook_signature("wrong-secret", body, &sig));
        assert!(!verify_webhook_signature(secret, body, "not-hex"));
        assert!(!verify_webhook_signature(secret, body, ""));
    }
}
