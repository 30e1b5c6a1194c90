/*
 * lib.rs
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

//! Embeddable HTTP/1.0 and HTTP/1.1 server library for use behind a reverse
//! proxy. The application owns the loop: it accepts a [`Connection`] from a
//! [`Server`], parses a [`Request`] from it, reads the body, writes a
//! [`Response`], then drops the connection or parses the next request.
//!
//! There is no router, thread pool, or TLS; dispatch and termination belong
//! to the embedding application. Streaming [`multipart`] and [`chunked`]
//! codecs layer over the same byte-stream capability the connection and
//! request body expose.
//!
//! ```no_run
//! use mostra::{Headers, Request, Response, ResponseCode, Server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), mostra::Error> {
//!     let mut server = Server::new("::", 9090, -1)?;
//!     loop {
//!         let mut connection = match server.serve().await {
//!             Ok(connection) => connection,
//!             Err(e) if e.is_connection_interrupted() => continue,
//!             Err(e) => return Err(e),
//!         };
//!         let (request, mut body) = Request::parse(&mut connection).await?;
//!         if request.content_length_flag() == mostra::ContentLengthFlag::Yes {
//!             body.flush().await?;
//!         }
//!         drop(body);
//!         let mut headers = Headers::new();
//!         headers.append("Content-Length", "7");
//!         let mut response = Response::new(
//!             &mut connection,
//!             request.protocol(),
//!             &ResponseCode::new(200, "OK"),
//!             &headers,
//!         )
//!         .await?;
//!         response.write(b"hello\r\n").await?;
//!         response.finish().await?;
//!     }
//! }
//! ```

pub mod base64;
pub mod chunked;
mod connection;
mod error;
pub mod multipart;
mod request;
mod response;
mod server;
mod socket;
pub mod stream;
mod types;
pub mod urlencode;

pub use chunked::{ChunkedReader, ChunkedWriter};
pub use connection::{Connection, BUFFER_SIZE};
pub use error::Error;
pub use multipart::{Multipart, Segment};
pub use request::{Body, ContentLengthFlag, Request};
pub use response::Response;
pub use server::Server;
pub use socket::Socket;
pub use stream::{ByteSink, ByteSource, MemorySink, MemorySource};
pub use types::{cmp_ignore_case_ascii, HeaderName, Headers, Protocol, QueryArgs, ResponseCode};
