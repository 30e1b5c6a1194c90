/*
 * response.rs
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

//! HTTP/1.x response marshaller. Construction validates and serialises the
//! status line and header block into the sink's buffer; body bytes are
//! forwarded afterwards. Response line endings are strictly CRLF.

use bytes::{BufMut, BytesMut};
use log::trace;

use crate::error::Error;
use crate::stream::{write_all, ByteSink};
use crate::types::{Headers, Protocol, ResponseCode};

/// An in-progress response. Writes go through the underlying connection's
/// put buffer; call [`Response::finish`] when done so the buffer reaches the
/// socket (an async drop cannot perform the final flush).
#[derive(Debug)]
pub struct Response<'s, S: ByteSink> {
    sink: &'s mut S,
}

impl<'s, S: ByteSink> Response<'s, S> {
    /// Validate and stage the status line and headers. Nothing is handed to
    /// the socket before the whole head marshals cleanly.
    pub async fn new(
        sink: &'s mut S,
        protocol: Protocol,
        code: &ResponseCode,
        headers: &Headers,
    ) -> Result<Response<'s, S>, Error> {
        let head = marshal_head(protocol, code, headers)?;
        write_all(sink, &head).await?;
        trace!(
            "marshalled {} response head, {} headers",
            code.code,
            headers.len()
        );
        Ok(Self { sink })
    }

    /// Forward body bytes into the sink.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        write_all(self.sink, data).await
    }

    /// Drain staged bytes to the socket.
    pub async fn flush(&mut self) -> Result<(), Error> {
        self.sink.flush().await
    }

    /// Flush and end the response.
    pub async fn finish(self) -> Result<(), Error> {
        self.sink.flush().await
    }
}

/// Canonical header capitalisation: the first letter and any letter after a
/// hyphen uppercase, other letters lowercase; digits pass through. Only
/// letters, digits, and `-` are legal.
fn canonical_header_name(name: &str) -> Result<String, Error> {
    if name.is_empty() {
        return Err(Error::ResponseMarshall("empty header name".to_string()));
    }
    let mut canonical = String::with_capacity(name.len());
    let mut capitalize_next = true;
    for c in name.bytes() {
        match c {
            b'a'..=b'z' => {
                if capitalize_next {
                    canonical.push((c & !0x20) as char);
                    capitalize_next = false;
                } else {
                    canonical.push(c as char);
                }
            }
            b'A'..=b'Z' => {
                if capitalize_next {
                    canonical.push(c as char);
                } else {
                    canonical.push((c | 0x20) as char);
                }
                capitalize_next = false;
            }
            b'-' => {
                canonical.push('-');
                capitalize_next = true;
            }
            b'0'..=b'9' => {
                canonical.push(c as char);
                capitalize_next = false;
            }
            _ => return Err(Error::ResponseMarshall("invalid header name".to_string())),
        }
    }
    Ok(canonical)
}

/// Serialise status line and header block. CR or LF inside a header value is
/// replaced by a CRLF-plus-space continuation before the next value byte.
fn marshal_head(
    protocol: Protocol,
    code: &ResponseCode,
    headers: &Headers,
) -> Result<BytesMut, Error> {
    let mut head = BytesMut::with_capacity(256);
    match protocol {
        Protocol::Http1_1 => head.put_slice(b"HTTP/1.1 "),
        _ => head.put_slice(b"HTTP/1.0 "),
    }
    head.put_slice(code.code.to_string().as_bytes());
    head.put_u8(b' ');
    head.put_slice(code.description.as_bytes());
    head.put_slice(b"\r\n");

    for (name, values) in headers.iter() {
        let canonical = canonical_header_name(name.as_str())?;
        for value in values {
            if value.is_empty() {
                return Err(Error::ResponseMarshall("empty header value".to_string()));
            }
            head.put_slice(canonical.as_bytes());
            head.put_slice(b": ");
            let mut insert_newline = false;
            for &c in value.as_bytes() {
                if c == b'\r' || c == b'\n' {
                    insert_newline = true;
                } else {
                    if insert_newline {
                        head.put_slice(b"\r\n ");
                        insert_newline = false;
                    }
                    head.put_u8(c);
                }
            }
            head.put_slice(b"\r\n");
        }
    }
    head.put_slice(b"\r\n");
    Ok(head)
}
