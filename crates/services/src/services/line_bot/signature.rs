use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// `X-Line-Signature` value for `body`: base64 of its HMAC-SHA256 under the
/// channel secret.
pub fn sign(channel_secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(channel_secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

pub fn verify(channel_secret: &[u8], body: &[u8], signature: &str) -> bool {
    let expected = sign(channel_secret, body);
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.trim().as_bytes()).into()
}
