//! Verification of `Stripe-Signature` webhook headers.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing timestamp in signature header")]
    MissingTimestamp,
    #[error("no v1 signature in signature header")]
    MissingSignature,
    #[error("timestamp outside the tolerance window")]
    Expired,
    #[error("signature does not match payload")]
    Mismatch,
    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a `t=...,v1=...` header against the raw request body.
pub fn verify(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if candidates.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let mac = mac_for(secret, timestamp, payload)?;
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|expected| mac.clone().verify_slice(&expected).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
