//! Incremental request-line parsing. Headers and bodies are never parsed --
//! this server serves GET/HEAD with no persistent connections, so nothing
//! downstream of the request line changes its behavior -- but the line
//! itself has to be pulled out of a byte stream that may arrive split
//! across several readable events.

use crate::common::{ascii, RequestError};
use crate::http::method::Method;
use crate::http::version::HttpVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: HttpVersion,
}

/// Scans `buf` for a terminated request line (`\r\n` or a bare `\n`).
/// Returns `None` when no full line is present yet -- the caller should keep
/// buffering and try again on the next readable event. Once a full line is
/// found, returns the parse result together with the number of bytes that
/// line occupied (so the caller can discard them; any remainder belongs to
/// headers this server doesn't parse).
pub fn try_parse(buf: &[u8]) -> Option<(Result<RequestLine, RequestError>, usize)> {
    let lf_pos = buf.iter().position(|&b| b == ascii::LF)?;
    let mut end = lf_pos;
    if end > 0 && buf[end - 1] == ascii::CR {
        end -= 1;
    }
    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    Some((parse_line(&line), lf_pos + 1))
}

fn parse_line(line: &str) -> Result<RequestLine, RequestError> {
    let tokens: Vec<&str> = line.split(ascii::SP as char).filter(|t| !t.is_empty()).collect();

    match tokens.as_slice() {
        [] => Err(RequestError::BadRequest("empty request line")),
        [method, target] => {
            // No version token: legacy HTTP/0.9-style request. Only GET is
            // meaningful without a version to negotiate against, so unlike
            // the three-token form, anything else here is a 400 rather than
            // a 405.
            if *method != "GET" {
                return Err(RequestError::BadRequest("HTTP/0.9 requests must use GET"));
            }
            Ok(RequestLine {
                method: Method::Get,
                target: (*target).to_owned(),
                version: HttpVersion::default(),
            })
        }
        [method, target, version] => {
            // Version is validated before the method is dispatched: an
            // unsupported version (HTTP/2.0 and above) is a 505 regardless
            // of what method the client sent, even one this server doesn't
            // otherwise serve.
            let version = HttpVersion::parse(version)?;
            if !version.is_supported() {
                return Err(RequestError::VersionNotSupported("unsupported HTTP version"));
            }
            let method = Method::try_from(method)?;
            Ok(RequestLine {
                method,
                target: (*target).to_owned(),
                version,
            })
        }
        _ => Err(RequestError::BadRequest("malformed request line")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_token_request_line() {
        let (result, consumed) = try_parse(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        let req = result.unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.target, "/index.html");
        assert_eq!(req.version, HttpVersion::HTTP_1_1);
        assert_eq!(consumed, "GET /index.html HTTP/1.1\r\n".len());
    }

    #[test]
    fn accepts_two_token_request_line_as_http_0_9() {
        let (result, _) = try_parse(b"GET /foo\n").unwrap();
        let req = result.unwrap();
        assert_eq!(req.version, HttpVersion::default());
    }

    #[test]
    fn rejects_non_get_two_token_request_line() {
        let (result, _) = try_parse(b"HEAD /foo\n").unwrap();
        assert!(matches!(result, Err(RequestError::BadRequest(_))));
    }

    #[test]
    fn rejects_unsupported_version() {
        let (result, _) = try_parse(b"GET / HTTP/2.0\r\n").unwrap();
        assert!(matches!(result, Err(RequestError::VersionNotSupported(_))));
    }

    #[test]
    fn rejects_unknown_method() {
        let (result, _) = try_parse(b"POST / HTTP/1.1\r\n").unwrap();
        assert!(matches!(result, Err(RequestError::MethodNotAllowed(_))));
    }

    #[test]
    fn unsupported_version_wins_over_unknown_method() {
        // Version is checked before method dispatch, so an unsupported
        // version reports 505 even when the method is also not one this
        // server serves.
        let (result, _) = try_parse(b"POST / HTTP/3.0\r\n").unwrap();
        assert!(matches!(result, Err(RequestError::VersionNotSupported(_))));
    }

    #[test]
    fn returns_none_without_a_full_line() {
        assert!(try_parse(b"GET /index.html HTTP").is_none());
    }

    #[test]
    fn rejects_too_many_tokens() {
        let (result, _) = try_parse(b"GET / HTTP/1.1 extra\r\n").unwrap();
        assert!(matches!(result, Err(RequestError::BadRequest(_))));
    }
}
