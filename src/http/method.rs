//! Request method. Only `GET` and `HEAD` are served; anything else is a
//! `405 Method Not Allowed` rather than a parse failure, so the caller can
//! still echo a `Date` header and a body on the error response.

use std::fmt;

use crate::common::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl Method {
    pub fn raw(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }

    pub fn try_from(token: &str) -> Result<Self, RequestError> {
        match token {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "" => Err(RequestError::BadRequest("empty method")),
            other => Err(RequestError::MethodNotAllowed(method_leak(other))),
        }
    }
}

/// `RequestError::MethodNotAllowed` carries a `&'static str`; request lines
/// are transient, so the offending token can't be borrowed into the error.
/// Only a fixed, small set of non-idle methods is worth naming back to the
/// caller for logging -- anything else collapses to a generic label.
fn method_leak(token: &str) -> &'static str {
    match token {
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "PATCH" => "PATCH",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        "TRACE" => "TRACE",
        _ => "unsupported method",
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_get_and_head() {
        assert_eq!(Method::try_from("GET").unwrap(), Method::Get);
        assert_eq!(Method::try_from("HEAD").unwrap(), Method::Head);
    }

    #[test]
    fn rejects_other_methods() {
        assert!(matches!(
            Method::try_from("POST"),
            Err(RequestError::MethodNotAllowed(_))
        ));
    }
}
