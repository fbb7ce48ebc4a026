//! HTTP version token (`HTTP/<major>.<minor>`).
//!
//! Modeled as a `(major, minor)` tuple newtype rather than an enum of named
//! variants: RFC 2145 §3.1 defines version ordering as lexicographic
//! major-then-minor comparison, which a derived `Ord` on a tuple gives for
//! free, including for major/minor values the server doesn't itself speak
//! (`HTTP/12.3` orders correctly even though nothing here emits it).

use std::fmt;

use crate::common::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpVersion {
    pub major: u16,
    pub minor: u16,
}

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_1_1: HttpVersion = HttpVersion { major: 1, minor: 1 };

    /// The highest version this server will agree to speak.
    pub const MAX_SUPPORTED: HttpVersion = Self::HTTP_1_1;

    pub fn raw(&self) -> String {
        format!("HTTP/{}.{}", self.major, self.minor)
    }

    /// Parses the `HTTP/<major>.<minor>` token. Rejects anything that isn't
    /// exactly that shape as a bad request rather than guessing a default --
    /// unlike the missing-version two-token request line, which is a
    /// distinct, deliberate `HTTP/0.9`-style fallback handled by the caller.
    pub fn parse(token: &str) -> Result<Self, RequestError> {
        let rest = token
            .strip_prefix("HTTP/")
            .ok_or(RequestError::BadRequest("malformed HTTP version"))?;
        let (major_s, minor_s) = rest
            .split_once('.')
            .ok_or(RequestError::BadRequest("malformed HTTP version"))?;
        let major: u16 = major_s
            .parse()
            .map_err(|_| RequestError::BadRequest("malformed HTTP version"))?;
        let minor: u16 = minor_s
            .parse()
            .map_err(|_| RequestError::BadRequest("malformed HTTP version"))?;
        Ok(HttpVersion { major, minor })
    }

    /// Versions at or above `HTTP/2.0` are refused: this server only
    /// implements the HTTP/1.x request-line/header framing. A literal
    /// three-token `HTTP/0.9` is accepted here (gated on `(major, minor)`
    /// rather than `major == 1`), matching the original's version check.
    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) < (2, 0)
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

impl Default for HttpVersion {
    /// The version attributed to a two-token (`METHOD PATH`, no version
    /// token) request line, per the legacy HTTP/0.9 fallback.
    fn default() -> Self {
        HttpVersion { major: 0, minor: 9 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_lexicographically_by_major_then_minor() {
        assert!(HttpVersion::parse("HTTP/2.4").unwrap() < HttpVersion::parse("HTTP/2.13").unwrap());
        assert!(HttpVersion::parse("HTTP/2.13").unwrap() < HttpVersion::parse("HTTP/12.3").unwrap());
    }

    #[test]
    fn rejects_versions_at_or_above_2_0() {
        assert!(!HttpVersion::parse("HTTP/2.0").unwrap().is_supported());
        assert!(HttpVersion::HTTP_1_1.is_supported());
    }

    #[test]
    fn accepts_a_literal_three_token_http_0_9() {
        assert!(HttpVersion::parse("HTTP/0.9").unwrap().is_supported());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(HttpVersion::parse("HTTP/1").is_err());
        assert!(HttpVersion::parse("1.1").is_err());
        assert!(HttpVersion::parse("HTTP/a.b").is_err());
    }
}
