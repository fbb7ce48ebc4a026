//! Status codes and reason phrases this server actually emits, plus the
//! boilerplate error-page template, mirroring `BaseHTTPRequestHandler`'s
//! `responses` table and `DEFAULT_ERROR_MESSAGE` in the Python original this
//! crate was ported from.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok200,
    BadRequest400,
    Forbidden403,
    NotFound404,
    MethodNotAllowed405,
    InternalServerError500,
    HttpVersionNotSupported505,
}

impl StatusCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok200 => 200,
            Self::BadRequest400 => 400,
            Self::Forbidden403 => 403,
            Self::NotFound404 => 404,
            Self::MethodNotAllowed405 => 405,
            Self::InternalServerError500 => 500,
            Self::HttpVersionNotSupported505 => 505,
        }
    }

    /// Short reason phrase, as sent on the status line. Falls back to
    /// `"???"` for any code not in the table -- unreachable today since every
    /// variant is listed above, but kept because the fallback is part of the
    /// status-line contract, not an artifact of which codes happen to be
    /// implemented.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Ok200 => "OK",
            Self::BadRequest400 => "Bad Request",
            Self::Forbidden403 => "Forbidden",
            Self::NotFound404 => "Not Found",
            Self::MethodNotAllowed405 => "Method Not Allowed",
            Self::InternalServerError500 => "Internal Server Error",
            Self::HttpVersionNotSupported505 => "HTTP Version Not Supported",
        }
    }

    /// Longer explanatory text used in the default HTML error body.
    pub fn long_message(&self) -> &'static str {
        match self {
            Self::Ok200 => "Request fulfilled, document follows",
            Self::BadRequest400 => "Bad request syntax or unsupported method",
            Self::Forbidden403 => "Request forbidden -- authorization will not help",
            Self::NotFound404 => "Nothing matches the given URI",
            Self::MethodNotAllowed405 => "Specified method is invalid for this resource",
            Self::InternalServerError500 => {
                "Server got itself in trouble"
            }
            Self::HttpVersionNotSupported505 => {
                "Cannot fulfill request"
            }
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// Escapes the characters HTML requires escaped in a body, mirroring the
/// original's `escape()` helper (stdlib `html.escape` equivalent, restricted
/// to the characters that actually occur in a path or reason phrase).
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders the default HTML error body for `code`, substituting the
/// explanatory `message` if one is given, else falling back to the status's
/// own long message.
pub fn default_error_body(status: StatusCode, message: Option<&str>) -> String {
    let explain = message.unwrap_or_else(|| status.long_message());
    format!(
        "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">\n\
         <html>\n\
         <head>\n\
         <meta http-equiv=\"Content-Type\" content=\"text/html;charset=utf-8\">\n\
         <title>Error response</title>\n\
         </head>\n\
         <body>\n\
         <h1>Error response</h1>\n\
         <p>Error code: {code}</p>\n\
         <p>Message: {reason}.</p>\n\
         <p>Explain: {explain}.</p>\n\
         </body>\n\
         </html>\n",
        code = status.code(),
        reason = escape(status.reason()),
        explain = escape(explain),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_special_characters() {
        assert_eq!(escape("<script>&\"x\"</script>"), "&lt;script&gt;&amp;&quot;x&quot;&lt;/script&gt;");
    }

    #[test]
    fn error_body_contains_code_and_explanation() {
        let body = default_error_body(StatusCode::NotFound404, None);
        assert!(body.contains("404"));
        assert!(body.contains("Nothing matches the given URI"));
    }
}
