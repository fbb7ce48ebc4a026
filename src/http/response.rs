//! Response framing: status line, header block, RFC 1123 `Date`, and
//! chunked transfer-coding helpers. This module only renders bytes; callers
//! (the static file responder and the connection's error path) decide what
//! headers and body to supply.

use std::time::SystemTime;

use crate::common::ascii;
use crate::http::status::{default_error_body, StatusCode};
use crate::http::version::HttpVersion;

/// The terminal chunk of a chunked-encoded body: a zero-length chunk
/// followed by the final CRLF, with no trailer section.
pub const FINAL_CHUNK: &[u8] = b"0\r\n\r\n";

/// `Server: <server_version> <sys_version>`, mirroring
/// `BaseHTTPRequestHandler.version_string()`'s `"<server_version>
/// <sys_version>"` join in the Python original: a name/crate-version token
/// plus a token identifying the runtime the server is built with.
pub fn server_header_value() -> String {
    format!("staticd/{} {}", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
}

/// Current time rendered as an RFC 1123 `Date` header value, e.g.
/// `Tue, 28 Jul 2026 00:00:00 GMT`.
pub fn date_header_value() -> String {
    httpdate::fmt_http_date(SystemTime::now())
}

/// Builds a status line + header block, CRLF-terminated and ending in the
/// blank line that separates headers from the body. `headers` is rendered
/// in the order given; `Date` is always added first.
///
/// A genuine `HTTP/0.9` request (the legacy two-token `GET path` form) gets
/// no status line, no headers, and no blank line at all -- a `0.9` client
/// understands nothing but a raw body until the connection closes.
pub fn render_head(version: HttpVersion, status: StatusCode, headers: &[(&str, String)]) -> Vec<u8> {
    if version == HttpVersion::default() {
        return Vec::new();
    }
    let mut out = Vec::new();
    out.extend_from_slice(format!("{} {}\r\n", version, status).as_bytes());
    out.extend_from_slice(format!("Server: {}\r\n", server_header_value()).as_bytes());
    out.extend_from_slice(format!("Date: {}\r\n", date_header_value()).as_bytes());
    for (name, value) in headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.push(ascii::CR);
    out.push(ascii::LF);
    out
}

/// Wraps `data` as one chunk: its size in hex, CRLF, the bytes, CRLF. An
/// empty slice produces the terminal chunk (`FINAL_CHUNK`) instead of a
/// zero-size non-terminal chunk, since a zero-length non-terminal chunk
/// would be indistinguishable from end-of-body to the reading client.
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return FINAL_CHUNK.to_vec();
    }
    let mut out = Vec::with_capacity(data.len() + 16);
    out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

/// Renders a full, buffered (non-chunked) error response: head plus an HTML
/// body, with `Content-Length`/`Content-Type` filled in from the body. For
/// `HEAD` requests the caller should render this and then drop the body
/// before writing -- `render_head` already reflects the real `Content-Length`.
pub fn error_response(version: HttpVersion, status: StatusCode, explain: Option<&str>, include_body: bool) -> Vec<u8> {
    let body = default_error_body(status, explain);
    let headers = [
        ("Content-Type".to_string(), "text/html;charset=utf-8".to_string()),
        ("Content-Length".to_string(), body.len().to_string()),
        ("Connection".to_string(), "close".to_string()),
    ];
    let header_refs: Vec<(&str, String)> = headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();
    let mut out = render_head(version, status, &header_refs);
    if include_body {
        out.extend_from_slice(body.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_nonempty_chunk_with_hex_size() {
        let chunk = encode_chunk(b"abc");
        assert_eq!(chunk, b"3\r\nabc\r\n");
    }

    #[test]
    fn encodes_terminal_chunk_for_empty_data() {
        assert_eq!(encode_chunk(b""), FINAL_CHUNK);
    }

    #[test]
    fn render_head_is_empty_for_http_0_9() {
        let head = render_head(HttpVersion::default(), StatusCode::Ok200, &[("Content-Length", "0".to_string())]);
        assert!(head.is_empty());
    }

    #[test]
    fn render_head_ends_in_blank_line() {
        let head = render_head(HttpVersion::HTTP_1_1, StatusCode::Ok200, &[("Content-Length", "0".to_string())]);
        let text = String::from_utf8(head).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn error_response_reports_real_body_length_even_without_body_for_head() {
        let full = error_response(HttpVersion::HTTP_1_1, StatusCode::NotFound404, None, true);
        let head_only = error_response(HttpVersion::HTTP_1_1, StatusCode::NotFound404, None, false);
        let full_text = String::from_utf8(full.clone()).unwrap();
        let head_text = String::from_utf8(head_only).unwrap();
        let content_length_line = full_text
            .lines()
            .find(|l| l.starts_with("Content-Length:"))
            .unwrap();
        assert!(head_text.contains(content_length_line));
    }
}
