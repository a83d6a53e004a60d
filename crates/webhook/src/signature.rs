//! Webhook signature verification.
//!
//! The gateway signs every delivery with a shared secret and sends
//! `X-Gateway-Signature: t=<unix seconds>,v1=<hex>`, where the hex value is
//! `HMAC-SHA256(secret, "<t>.<raw body>")`.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Default maximum age of a signed delivery.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a delivery's signature is not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Invalid signature encoding")]
    InvalidEncoding,

    #[error("Signature mismatch")]
    Mismatch,

    /// The timestamp is further than the tolerance from now.
    #[error("Signature timestamp outside tolerance ({age_secs}s)")]
    Expired { age_secs: i64 },

    #[error("Invalid signing secret")]
    InvalidSecret,
}

/// Verifies gateway signatures against the shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies a delivery against the current time.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verifies a delivery against the given unix time.
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let mut timestamp = "";
        let mut signature = "";
        for part in header.split(',') {
            let part = part.trim();
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = t;
            } else if let Some(v) = part.strip_prefix("v1=") {
                signature = v;
            }
        }

        if timestamp.is_empty() || signature.is_empty() {
            return Err(SignatureError::MalformedHeader);
        }
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::MalformedHeader)?;
        let expected = hex::decode(signature).map_err(|_| SignatureError::InvalidEncoding)?;

        // verify_slice compares in constant time
        self.mac(timestamp, payload)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)?;

        let age_secs = now - ts;
        if age_secs.abs() > self.tolerance_secs {
            return Err(SignatureError::Expired { age_secs });
        }

        Ok(())
    }

    /// Builds the header value for a payload signed at `timestamp`.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let mac = self.mac(&timestamp.to_string(), payload)?;
        Ok(format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac(&self, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_714_566_600;
    const BODY: &[u8] = br#"{"event_type":"transaction.updated"}"#;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("whsec_test")
    }

    #[test]
    fn test_sign_then_verify() {
        let header = verifier().sign(BODY, NOW).unwrap();

        assert!(header.starts_with(&format!("t={NOW},v1=")));
        assert_eq!(verifier().verify_at(BODY, &header, NOW + 10), Ok(()));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let header = verifier().sign(BODY, NOW).unwrap();

        let result = verifier().verify_at(br#"{"event_type":"other"}"#, &header, NOW);

        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let header = SignatureVerifier::new("other").sign(BODY, NOW).unwrap();
        assert_eq!(
            verifier().verify_at(BODY, &header, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_old_timestamp_is_rejected() {
        let header = verifier().sign(BODY, NOW).unwrap();

        let result = verifier().verify_at(BODY, &header, NOW + 301);

        assert_eq!(result, Err(SignatureError::Expired { age_secs: 301 }));
    }

    #[test]
    fn test_custom_tolerance() {
        let verifier = verifier().with_tolerance_secs(30);
        let header = verifier.sign(BODY, NOW).unwrap();

        assert!(verifier.verify_at(BODY, &header, NOW + 30).is_ok());
        assert!(verifier.verify_at(BODY, &header, NOW + 31).is_err());
    }

    #[test]
    fn test_malformed_headers() {
        let v = verifier();
        assert_eq!(
            v.verify_at(BODY, "", NOW),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            v.verify_at(BODY, "t=abc,v1=00", NOW),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            v.verify_at(BODY, &format!("t={NOW},v1=zz"), NOW),
            Err(SignatureError::InvalidEncoding)
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let output = format!("{:?}", verifier());
        assert!(!output.contains("whsec_test"));
    }
}
