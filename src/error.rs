/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Mostra, an embeddable HTTP/1.x server library.
 *
 * Mostra is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Mostra is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Mostra.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Library error vocabulary: socket failures, interruption conditions, and
//! parse/marshall errors.

use std::fmt;

/// Errors surfaced by sockets, connections, parsers, and encoders.
///
/// `ConnectionTimeout` and `ClientDisconnected` are control-flow conditions
/// rather than strict error states; use [`Error::is_connection_interrupted`]
/// to branch on them (loop again on timeout, drop the connection on
/// disconnect).
#[derive(Debug)]
pub enum Error {
    /// OS-level socket failure unrelated to peer behaviour (bind, listen,
    /// setsockopt, invalid address, unexpected readiness failure, unhandled
    /// read/send error). Fatal for the connection or server involved.
    Socket(String),
    /// A blocking wait exceeded the configured timeout.
    ConnectionTimeout,
    /// Peer-initiated close (zero-byte read or connection reset).
    ClientDisconnected,
    /// Malformed request bytes. Respond 400 and close the connection.
    RequestParse(String),
    /// The application passed an invalid header name or an empty name or
    /// value to the response marshaller. A programming error.
    ResponseMarshall(String),
    /// Bad percent encoding. Wrapped into `RequestParse` during parsing.
    UrlDecode(String),
    /// Bad multipart framing.
    MultipartParse(String),
    /// Misuse of the chunked response API or malformed chunk framing.
    Chunked(String),
    /// Bad Base64 input (from the Base64 helper only).
    Base64Decode(String),
}

impl Error {
    /// True for the transient interruption conditions (`ConnectionTimeout`,
    /// `ClientDisconnected`) as opposed to strict error states.
    pub fn is_connection_interrupted(&self) -> bool {
        matches!(self, Error::ConnectionTimeout | Error::ClientDisconnected)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Socket(m) => write!(f, "{}", m),
            Error::ConnectionTimeout => write!(f, "connection timed out"),
            Error::ClientDisconnected => write!(f, "client disconnected"),
            Error::RequestParse(m) => write!(f, "{}", m),
            Error::ResponseMarshall(m) => write!(f, "{}", m),
            Error::UrlDecode(m) => write!(f, "{}", m),
            Error::MultipartParse(m) => write!(f, "{}", m),
            Error::Chunked(m) => write!(f, "{}", m),
            Error::Base64Decode(m) => write!(f, "{}", m),
        }
    }
}

impl std::error::Error for Error {}
