//! `Authorization` header parsing
//!
//! Splits the header value on runs of whitespace and expects exactly
//! `<scheme> <credential>`. A missing header or a foreign scheme means this
//! strategy was not offered a credential at all; a `Bearer` scheme with the
//! wrong number of parts is a client protocol error.

use axum::http::{HeaderMap, header};

/// Authentication scheme handled by this crate (matched case-insensitively).
pub const SCHEME: &str = "Bearer";

/// Why no bearer value could be taken from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// No header, an empty one, or a scheme other than `Bearer`
    Missing,
    /// `Bearer` scheme without exactly one credential after it
    Malformed,
}

/// Raw credential that followed the `Bearer` scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerValue(String);

impl BearerValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Extract the bearer value from the first `Authorization` header.
///
/// Header bytes outside visible ASCII are decoded lossily rather than
/// rejected; whatever credential they form is left for the resolver to judge.
pub fn extract(headers: &HeaderMap) -> Result<BearerValue, HeaderError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or(HeaderError::Missing)?;
    parse(&String::from_utf8_lossy(raw.as_bytes()))
}

/// Parse an `Authorization` header value.
pub fn parse(value: &str) -> Result<BearerValue, HeaderError> {
    let mut parts = value.split_whitespace();

    let scheme = parts.next().ok_or(HeaderError::Missing)?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(HeaderError::Missing);
    }

    match (parts.next(), parts.next()) {
        (Some(credential), None) => Ok(BearerValue(credential.to_owned())),
        _ => Err(HeaderError::Malformed),
    }
}
