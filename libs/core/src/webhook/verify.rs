//! Webhook authentication: signed-body verification and the subscription
//! challenge handshake.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Checks the `X-Hub-Signature-256` header value against the raw body.
///
/// `body` must be the exact bytes as received; re-serializing the JSON
/// first changes the byte sequence being hashed and breaks verification.
pub fn verify_signature(
    body: &[u8],
    signature: &str,
    app_secret: &str,
) -> Result<(), VerificationError> {
    let Some(received) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return Err(VerificationError::MalformedSignature);
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return Err(VerificationError::SignatureMismatch);
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());
    if bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
        Ok(())
    } else {
        Err(VerificationError::SignatureMismatch)
    }
}

/// Answers Meta's one-time subscription handshake (`hub.mode`,
/// `hub.verify_token`, `hub.challenge` query values).
///
/// On success the caller echoes the returned challenge as the response body.
pub fn verify_challenge<'a>(
    mode: &str,
    token: &str,
    challenge: &'a str,
    verify_token: &str,
) -> Result<&'a str, VerificationError> {
    if mode != "subscribe" {
        return Err(VerificationError::UnexpectedMode(mode.to_string()));
    }
    if token != verify_token {
        return Err(VerificationError::TokenMismatch);
    }
    Ok(challenge)
}

#[cfg(test)]
pub(crate) fn sign(body: &[u8], app_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).unwrap();
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}
