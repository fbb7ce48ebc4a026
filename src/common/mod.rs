// Copyright 2018 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Error, Formatter};

pub mod epoll;

pub mod ascii {
    pub const CR: u8 = b'\r';
    pub const LF: u8 = b'\n';
    pub const SP: u8 = b' ';
    pub const CRLF_LEN: usize = 2;
}

/// Errno values on which a socket operation is treated as a disconnect
/// rather than a genuine error: client-remote disconnects are recovered
/// by silent channel close.
const DISCONNECT_ERRNOS: [i32; 6] = [
    libc::ECONNRESET,
    libc::ENOTCONN,
    libc::ESHUTDOWN,
    libc::ECONNABORTED,
    libc::EPIPE,
    libc::EBADF,
];

/// Returns `true` if `error` corresponds to one of the errnos that should
/// close a channel silently instead of propagating.
pub fn is_disconnect(error: &std::io::Error) -> bool {
    match error.raw_os_error() {
        Some(errno) => DISCONNECT_ERRNOS.contains(&errno),
        None => false,
    }
}

/// Errors that can occur while parsing the start line of an HTTP request.
#[derive(Debug, PartialEq, Eq)]
pub enum RequestError {
    /// The request line could not be parsed at all.
    BadRequest(&'static str),
    /// The request line named an HTTP version this server refuses to speak.
    VersionNotSupported(&'static str),
    /// The request line named a method other than GET or HEAD.
    MethodNotAllowed(&'static str),
}

impl Display for RequestError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self {
            Self::BadRequest(inner) => write!(f, "Bad request: {}", inner),
            Self::VersionNotSupported(inner) => write!(f, "Version not supported: {}", inner),
            Self::MethodNotAllowed(inner) => write!(f, "Method not allowed: {}", inner),
        }
    }
}

/// Errors associated with a single HTTP connection's channel.
#[derive(Debug)]
pub enum ConnectionError {
    /// The peer disconnected or the socket is otherwise unusable.
    ConnectionClosed,
    /// An unexpected I/O error occurred on the stream.
    StreamError(std::io::Error),
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self {
            Self::ConnectionClosed => write!(f, "Connection closed."),
            Self::StreamError(inner) => write!(f, "Stream error: {}", inner),
        }
    }
}

/// Errors pertaining to the server as a whole: bind/listen/epoll/fork failures.
#[derive(Debug)]
pub enum ServerError {
    /// Binding or listening on the configured address failed.
    BindError(std::io::Error),
    /// `epoll_create`/`epoll_ctl`/`epoll_wait` failed.
    IOError(std::io::Error),
    /// `fork`/`waitpid` failed in the prefork supervisor.
    ForkError(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self {
            Self::BindError(inner) => write!(f, "Failed to bind listening socket: {}", inner),
            Self::IOError(inner) => write!(f, "IO error: {}", inner),
            Self::ForkError(inner) => write!(f, "Failed to fork worker: {}", inner),
        }
    }
}
