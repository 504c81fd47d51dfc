//! Short code generation.
//!
//! Codes are random, not derived from the destination, so two creations never
//! share a code by construction only with overwhelming probability. Callers
//! must still treat a storage uniqueness conflict as possible and retry.

use base64::Engine as _;
use regex::Regex;
use std::sync::LazyLock;

/// Length of every generated short code.
pub const SHORT_CODE_LEN: usize = 8;

/// Random bytes per code; 6 bytes encode to exactly 8 base64 characters.
const CODE_ENTROPY_BYTES: usize = 6;

static SHORT_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{8}$").expect("short code pattern is valid"));

/// Generates an 8-character URL-safe code from OS randomness.
///
/// # Errors
///
/// Returns the `getrandom` error if the OS entropy source is unavailable.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code()?;
/// assert_eq!(code.len(), 8);
/// ```
pub fn generate_code() -> Result<String, getrandom::Error> {
    let mut buffer = [0u8; CODE_ENTROPY_BYTES];
    getrandom::fill(&mut buffer)?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer))
}

/// Whether `code` has the shape of a generated short code.
///
/// Lets the redirect path answer "not found" without a storage lookup.
pub fn is_valid_code(code: &str) -> bool {
    SHORT_CODE_REGEX.is_match(code)
}
