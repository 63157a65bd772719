//! x-line-signature: base64(HMAC-SHA256(channel secret, raw body)).

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature on every webhook POST.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

fn mac_for(body: &[u8], secret: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

/// Signature value for `body` as LINE would send it in x-line-signature.
pub fn sign(body: &[u8], secret: &str) -> String {
    let digest = mac_for(body, secret)
        .map(|mac| mac.finalize().into_bytes().to_vec())
        .unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// True when `signature` is the valid signature of the exact `body` bytes.
/// A blank or non-base64 signature never verifies. Comparison is constant-time.
pub fn verify(body: &[u8], secret: &str, signature: &str) -> bool {
    let signature = signature.trim();
    if signature.is_empty() {
        return false;
    }
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };
    match mac_for(body, secret) {
        Some(mac) => mac.verify_slice(&expected).is_ok(),
        None => false,
    }
}
