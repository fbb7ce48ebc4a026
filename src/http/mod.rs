//! HTTP/1.x request-line parsing and response framing.

pub mod method;
pub mod request;
pub mod response;
pub mod status;
pub mod version;

pub use method::Method;
pub use request::RequestLine;
pub use status::StatusCode;
pub use version::HttpVersion;
