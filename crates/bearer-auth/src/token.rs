//! Base64 `identifier:token` credential decoding
//!
//! Decoding is lenient: symbols outside the base64 alphabet are skipped,
//! URL-safe `-`/`_` are accepted, input ends at the first `=`, and a
//! dangling final symbol is dropped. Only the structure of the decoded text
//! is enforced, which must be exactly one `:` separating two parts.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

/// Separator between identifier and token in the decoded payload.
pub const SEPARATOR: char = ':';

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Identifier/token pair carried by a base64 bearer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParts {
    pub identifier: String,
    pub token: String,
}

/// The decoded payload is not a single `identifier:token` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bearer value does not decode to identifier:token")]
pub struct MalformedToken;

/// Decode a base64 bearer value into its identifier and token.
pub fn decode(encoded: &str) -> Result<TokenParts, MalformedToken> {
    let bytes = LENIENT
        .decode(canonical_symbols(encoded))
        .map_err(|_| MalformedToken)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut parts = text.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(identifier), Some(token), None) => Ok(TokenParts {
            identifier: identifier.to_owned(),
            token: token.to_owned(),
        }),
        _ => Err(MalformedToken),
    }
}

/// Reduce the input to standard-alphabet symbols the strict engine accepts.
fn canonical_symbols(encoded: &str) -> String {
    let mut symbols: String = encoded
        .chars()
        .take_while(|c| *c != '=')
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => Some(c),
            '-' => Some('+'),
            '_' => Some('/'),
            _ => None,
        })
        .collect();

    // six bits cannot form a byte
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }
    symbols
}
