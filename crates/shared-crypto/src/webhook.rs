//! Payment webhook signature verification
//!
//! The processor signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]` where the HMAC-SHA256
//! covers `"{t}.{raw body}"` under the endpoint's shared secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed delivery
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Webhook timestamp outside tolerance ({age}s)")]
    Stale { age: i64 },

    #[error("No signature matched")]
    Mismatch,

    #[error("Invalid webhook secret")]
    BadSecret,
}

struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, WebhookError> {
    if header.trim().is_empty() {
        return Err(WebhookError::MissingHeader);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        if let Some((key, value)) = part.trim().split_once('=') {
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.push(value),
                _ => {}
            }
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(WebhookError::MalformedHeader),
    }
}

fn payload_mac(payload: &[u8], timestamp: i64, secret: &str) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::BadSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify a webhook delivery against `secret` at time `now` (Unix seconds)
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let parsed = parse_header(header)?;

    let age = now - parsed.timestamp;
    if age.abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(WebhookError::Stale { age });
    }

    let mac = payload_mac(payload, parsed.timestamp, secret)?;
    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(WebhookError::Mismatch)
    }
}

/// Produce a signature header for `payload`, as the processor would
pub fn sign_webhook_payload(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, WebhookError> {
    let mac = payload_mac(payload, timestamp, secret)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_735_689_600;

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign_webhook_payload(body, SECRET, NOW).unwrap();
        assert_eq!(verify_webhook_signature(body, &header, SECRET, NOW + 10), Ok(()));
    }

    #[test]
    fn test_any_matching_v1_is_enough() {
        let body = b"{}";
        let good = sign_webhook_payload(body, SECRET, NOW).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);
        assert_eq!(verify_webhook_signature(body, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_header_parsing_errors() {
        assert_eq!(
            verify_webhook_signature(b"{}", "", SECRET, NOW),
            Err(WebhookError::MissingHeader)
        );
        assert_eq!(
            verify_webhook_signature(b"{}", "t=123", SECRET, NOW),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_webhook_signature(b"{}", "v1=abcd", SECRET, NOW),
            Err(WebhookError::MalformedHeader)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"{}";
        let header = sign_webhook_payload(body, SECRET, NOW).unwrap();
        assert_eq!(
            verify_webhook_signature(body, &header, SECRET, NOW + WEBHOOK_TOLERANCE_SECS + 1),
            Err(WebhookError::Stale {
                age: WEBHOOK_TOLERANCE_SECS + 1
            })
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = b"{}";
        let header = sign_webhook_payload(body, "other-secret", NOW).unwrap();
        assert_eq!(
            verify_webhook_signature(body, &header, SECRET, NOW),
            Err(WebhookError::Mismatch)
        );
    }

    #[test]
    fn test_non_hex_signature_is_mismatch() {
        let header = format!("t={},v1=not-hex", NOW);
        assert_eq!(
            verify_webhook_signature(b"{}", &header, SECRET, NOW),
            Err(WebhookError::Mismatch)
        );
    }

    proptest! {
        #[test]
        fn prop_modified_body_never_verifies(
            body in proptest::collection::vec(any::<u8>(), 1..256),
            flip in any::<usize>(),
        ) {
            let header = sign_webhook_payload(&body, SECRET, NOW).unwrap();
            let mut tampered = body.clone();
            let idx = flip % tampered.len();
            tampered[idx] ^= 0x01;
            prop_assert_eq!(
                verify_webhook_signature(&tampered, &header, SECRET, NOW),
                Err(WebhookError::Mismatch)
            );
        }
    }
}
