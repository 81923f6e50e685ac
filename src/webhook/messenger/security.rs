//! Signature verification for incoming Messenger webhook requests
//!
//! Every callback is signed by the platform with HMAC-SHA1 using the app
//! secret. The signature travels in the `x-hub-signature` header with the
//! format `sha1=<hex_signature>`.
//!
//! # Important Notes
//!
//! - The signature MUST be computed on the raw request body bytes, not parsed JSON
//! - The comparison is constant-time
//! - Only the lowercase hex encoding of the digest is accepted

use crate::consts;
use derive_more::{Display, Error};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Successful verification results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The digest matches the body
    Verified,
    /// No signature header was sent, the caller decides what to do
    Unsigned,
}

/// Reasons a signed request is refused
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[display("unsupported signature method: {_0}")]
    UnsupportedMethod(#[error(not(source))] String),
    #[display("request signature does not match the payload")]
    SignatureMismatch,
}

/// Computes the lowercase hex HMAC-SHA1 of `payload`
pub fn sign(payload: &[u8], secret: &[u8]) -> Option<String> {
    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(m) => m,
        Err(e) => {
            logfire::error!(
                "Failed to create HMAC instance: {error}",
                error = e.to_string()
            );
            return None;
        }
    };

    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies the `x-hub-signature` header against the raw request body
///
/// # Arguments
///
/// * `payload` - The raw request body bytes, left untouched
/// * `signature_header` - The header value if present (e.g. "sha1=abc123...")
/// * `secret` - The app secret
///
/// # Returns
///
/// * `Ok(VerifyOutcome::Unsigned)` when no header was sent
/// * `Ok(VerifyOutcome::Verified)` when the digest matches
/// * `Err(SignatureError)` when the method is not `sha1` or the digest differs
pub fn verify_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: &[u8],
) -> Result<VerifyOutcome, SignatureError> {
    let Some(signature_header) = signature_header else {
        return Ok(VerifyOutcome::Unsigned);
    };

    let (method, signature_hex) = signature_header
        .split_once('=')
        .unwrap_or((signature_header, ""));

    if method != consts::SIGNATURE_METHOD {
        logfire::warn!(
            "Unknown signature method: {method}",
            method = method.to_string()
        );
        return Err(SignatureError::UnsupportedMethod(method.to_string()));
    }

    let Some(expected_signature) = sign(payload, secret) else {
        return Err(SignatureError::SignatureMismatch);
    };
    let is_valid: bool = expected_signature
        .as_bytes()
        .ct_eq(signature_hex.as_bytes())
        .into();

    if !is_valid {
        logfire::warn!("Webhook signature verification failed: signatures do not match");
        return Err(SignatureError::SignatureMismatch);
    }

    Ok(VerifyOutcome::Verified)
}
