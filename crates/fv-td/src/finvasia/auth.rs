//! Login credential derivation.
//!
//! The `QuickAuth` endpoint never sees the raw password or API secret:
//!
//! 1. **Password**: sent as the lowercase hex SHA-256 of the plain text.
//! 2. **App key**: the hex SHA-256 of `"<user_id>|<api_secret>"`.
//! 3. **Second factor**: a 6-digit RFC 6238 TOTP (HMAC-SHA1) computed from
//!    the base32 seed issued by the broker.

use data_encoding::BASE32_NOPAD;
use fv_core::error::{FvError, Result};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type HmacSha1 = Hmac<Sha1>;

/// Number of digits in the one-time password.
const TOTP_DIGITS: u32 = 6;

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// The `appkey` login field: SHA-256 of `"<user_id>|<api_secret>"`.
pub fn app_key_hash(user_id: &str, api_secret: &str) -> String {
    sha256_hex(&format!("{user_id}|{api_secret}"))
}

/// Decode a base32 TOTP seed.
///
/// Whitespace, `=` padding and lower case are tolerated since seeds are
/// often copied from a QR-code URI or typed in groups of four.
pub fn decode_seed(seed: &str) -> Result<Vec<u8>> {
    let normalized: String = seed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if normalized.is_empty() {
        return Err(FvError::Config("empty TOTP seed".into()));
    }
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| FvError::Config(format!("invalid TOTP seed: {e}")))
}

/// Compute an RFC 4226 HOTP value for `counter`.
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| FvError::Config(format!("invalid HMAC key: {e}")))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation: low nibble of the last byte picks a 4-byte window.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = binary % 10u32.pow(digits);
    Ok(format!("{code:0width$}", width = digits as usize))
}

/// Compute the TOTP for `unix_secs` with a step of `interval` seconds.
pub fn totp_at(seed: &str, interval: u64, unix_secs: u64) -> Result<String> {
    if interval == 0 {
        return Err(FvError::Config("TOTP interval must be positive".into()));
    }
    let key = decode_seed(seed)?;
    hotp(&key, unix_secs / interval, TOTP_DIGITS)
}

/// Compute the TOTP for the current time.
pub fn totp_now(seed: &str, interval: u64) -> Result<String> {
    let now = u64::try_from(fv_core::time_util::now_secs()).unwrap_or_default();
    totp_at(seed, interval, now)
}
