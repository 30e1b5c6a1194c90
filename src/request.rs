/*
 * request.rs
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

//! Streaming HTTP/1.x request parser: byte-at-a-time state machine over a
//! byte source, stopping at the blank line that ends the header block. The
//! body is exposed afterwards as a byte stream bounded by `Content-Length`
//! when one is known.
//!
//! Line endings are permissive: a bare LF is accepted wherever CRLF is
//! expected, but a CR must be followed by LF.

use std::collections::BTreeMap;

use log::trace;

use crate::error::Error;
use crate::stream::{read_byte, ByteSource};
use crate::types::{toupper_ascii, Headers, Protocol, QueryArgs};
use crate::urlencode::url_decode_utf8;

/// Whether a request's body length is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLengthFlag {
    /// No `Content-Length` header.
    No,
    /// Parsed successfully; the body is bounded.
    Yes,
    /// Header present but repeated or unparseable.
    Maybe,
}

/// Parsed request line and headers. Immutable once parsed; the body is read
/// through the [`Body`] returned alongside.
#[derive(Debug)]
pub struct Request {
    protocol: Protocol,
    protocol_string: String,
    method: String,
    path: Vec<String>,
    query_args: QueryArgs,
    headers: Headers,
    content_length_flag: ContentLengthFlag,
    content_length: u64,
}

impl Request {
    /// Parse a request line and header block from `source`, leaving any body
    /// prefix bytes in the source's buffer. Returns the parsed request and
    /// its body stream, which borrows the source until dropped.
    pub async fn parse<S: ByteSource>(source: &mut S) -> Result<(Request, Body<'_, S>), Error> {
        let (method, path, query_args, protocol_string) = parse_start_line(source).await?;
        let headers = parse_header_block(source)
            .await
            .map_err(HeaderBlockError::into_request_error)?;

        let protocol = match protocol_string.to_ascii_uppercase().as_str() {
            "HTTP/1.0" => Protocol::Http1_0,
            "HTTP/1.1" => Protocol::Http1_1,
            "" => Protocol::None,
            _ => Protocol::Unknown,
        };

        let (content_length_flag, content_length) = match headers.get("Content-Length") {
            None => (ContentLengthFlag::No, 0),
            Some(values) if values.len() > 1 => (ContentLengthFlag::Maybe, 0),
            Some(values) => match values[0].parse::<u64>() {
                Ok(length) => (ContentLengthFlag::Yes, length),
                Err(_) => (ContentLengthFlag::Maybe, 0),
            },
        };

        trace!(
            "parsed {} request, {} path segments, {} headers",
            method,
            path.len(),
            headers.len()
        );

        let request = Request {
            protocol,
            protocol_string,
            method,
            path,
            query_args,
            headers,
            content_length_flag,
            content_length,
        };
        let body = Body {
            source,
            flag: content_length_flag,
            content_length,
            consumed: 0,
            closed: false,
        };
        Ok((request, body))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Protocol field exactly as received.
    pub fn protocol_string(&self) -> &str {
        &self.protocol_string
    }

    /// Method, uppercased during parsing.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URL-decoded path segments. `/` parses to an empty list.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// URL-decoded query arguments; duplicate keys keep all values in order.
    pub fn query_args(&self) -> &QueryArgs {
        &self.query_args
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn content_length_flag(&self) -> ContentLengthFlag {
        self.content_length_flag
    }

    /// Meaningful only when [`Request::content_length_flag`] is `Yes`.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

/// Request body byte stream.
///
/// With a known content length it yields exactly that many bytes and then
/// end-of-stream without touching the socket again. Otherwise it passes
/// reads through until the peer closes.
#[derive(Debug)]
pub struct Body<'s, S: ByteSource> {
    source: &'s mut S,
    flag: ContentLengthFlag,
    content_length: u64,
    consumed: u64,
    closed: bool,
}

impl<S: ByteSource> Body<'_, S> {
    /// Body bytes consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Read and discard the rest of the body so the next request can be
    /// parsed from the same connection. A no-op once the body is exhausted.
    pub async fn flush(&mut self) -> Result<(), Error> {
        let mut scratch = [0u8; 1024];
        while self.read(&mut scratch).await? > 0 {}
        Ok(())
    }
}

impl<S: ByteSource> ByteSource for Body<'_, S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.flag {
            ContentLengthFlag::Yes => {
                if self.consumed >= self.content_length || buf.is_empty() {
                    return Ok(0);
                }
                let remaining = self.content_length - self.consumed;
                let limit = (buf.len() as u64).min(remaining) as usize;
                let count = self.source.read(&mut buf[..limit]).await?;
                self.consumed += count as u64;
                Ok(count)
            }
            ContentLengthFlag::No | ContentLengthFlag::Maybe => {
                if self.closed || buf.is_empty() {
                    return Ok(0);
                }
                match self.source.read(buf).await {
                    Ok(0) => {
                        self.closed = true;
                        Ok(0)
                    }
                    Ok(count) => {
                        self.consumed += count as u64;
                        Ok(count)
                    }
                    Err(Error::ClientDisconnected) => {
                        self.closed = true;
                        Ok(0)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn peek(&mut self) -> Result<Option<u8>, Error> {
        match self.flag {
            ContentLengthFlag::Yes => {
                if self.consumed >= self.content_length {
                    return Ok(None);
                }
                self.source.peek().await
            }
            ContentLengthFlag::No | ContentLengthFlag::Maybe => {
                if self.closed {
                    return Ok(None);
                }
                match self.source.peek().await {
                    Ok(None) | Err(Error::ClientDisconnected) => {
                        self.closed = true;
                        Ok(None)
                    }
                    other => other,
                }
            }
        }
    }

    fn unget(&mut self, byte: u8) -> Result<(), Error> {
        self.source.unget(byte)?;
        self.consumed = self.consumed.saturating_sub(1);
        Ok(())
    }

    fn end_of_stream(&self) -> bool {
        match self.flag {
            ContentLengthFlag::Yes => self.consumed >= self.content_length,
            ContentLengthFlag::No | ContentLengthFlag::Maybe => self.closed,
        }
    }
}

/// Rewrap a URL-decode failure as a request parse error, keeping its message.
fn wrap_decode_error(e: Error) -> Error {
    match e {
        Error::UrlDecode(message) => Error::RequestParse(message),
        other => other,
    }
}

fn decode_last_segment(path: &mut [String]) -> Result<(), Error> {
    if let Some(last) = path.last_mut() {
        *last = url_decode_utf8(last).map_err(wrap_decode_error)?;
    }
    Ok(())
}

/// Parse `METHOD SP path[?query] [SP protocol] LF`, stopping after the
/// line's terminating newline.
async fn parse_start_line<S: ByteSource>(
    source: &mut S,
) -> Result<(String, Vec<String>, QueryArgs, String), Error> {
    enum State {
        Method,
        Path,
        QueryArgs,
        Protocol,
    }

    let mut state = State::Method;
    let mut in_endline_seq = false;
    let mut method = String::new();
    let mut path: Vec<String> = Vec::new();
    let mut path_begun = false;
    let mut query_args: QueryArgs = BTreeMap::new();
    let mut key_stack: Vec<String> = Vec::new();
    let mut protocol_string = String::new();

    loop {
        let c = match read_byte(source).await? {
            Some(c) => c,
            None => return Err(Error::ClientDisconnected),
        };

        if in_endline_seq {
            if c == b'\n' {
                in_endline_seq = false;
            } else {
                return Err(Error::RequestParse("malformed HTTP line ending".to_string()));
            }
        }
        if c == b'\r' {
            in_endline_seq = true;
            continue;
        }

        match state {
            State::Method => match c {
                b' ' => state = State::Path,
                _ => method.push(toupper_ascii(c) as char),
            },
            State::Path => {
                match c {
                    b'?' => state = State::QueryArgs,
                    b'\n' => {
                        decode_last_segment(&mut path)?;
                        return Ok((method, path, query_args, protocol_string));
                    }
                    b' ' => state = State::Protocol,
                    b'/' => {
                        if path_begun {
                            if path.is_empty() {
                                path.push(String::new());
                            }
                            decode_last_segment(&mut path)?;
                            path.push(String::new());
                        } else {
                            path_begun = true;
                        }
                    }
                    _ => {
                        if path.is_empty() {
                            path_begun = true;
                            path.push((c as char).to_string());
                        } else {
                            path.last_mut().unwrap().push(c as char);
                        }
                    }
                }
                if !matches!(state, State::Path) {
                    decode_last_segment(&mut path)?;
                }
            }
            State::QueryArgs => match c {
                b'=' => key_stack.push(String::new()),
                b'\n' | b' ' | b'&' => {
                    let value = if key_stack.len() > 1 {
                        let top = key_stack.pop().unwrap();
                        url_decode_utf8(&top).map_err(wrap_decode_error)?
                    } else {
                        String::new()
                    };
                    while let Some(key) = key_stack.pop() {
                        let key = url_decode_utf8(&key).map_err(wrap_decode_error)?;
                        query_args.entry(key).or_default().push(value.clone());
                    }
                    match c {
                        b'\n' => return Ok((method, path, query_args, protocol_string)),
                        b' ' => state = State::Protocol,
                        _ => {}
                    }
                }
                _ => {
                    if key_stack.is_empty() {
                        key_stack.push(String::new());
                    }
                    key_stack.last_mut().unwrap().push(c as char);
                }
            },
            State::Protocol => {
                if c == b'\n' {
                    return Ok((method, path, query_args, protocol_string));
                }
                protocol_string.push(c as char);
            }
        }
    }
}

/// Errors from the shared header-block grammar, mapped into request or
/// multipart vocabulary by the caller.
#[derive(Debug)]
pub(crate) enum HeaderBlockError {
    MalformedLineEnding,
    MalformedHeader,
    MissingHeaderValue,
    Stream(Error),
}

impl HeaderBlockError {
    pub(crate) fn into_request_error(self) -> Error {
        match self {
            HeaderBlockError::MalformedLineEnding => {
                Error::RequestParse("malformed HTTP line ending".to_string())
            }
            HeaderBlockError::MalformedHeader => {
                Error::RequestParse("malformed header".to_string())
            }
            HeaderBlockError::MissingHeaderValue => {
                Error::RequestParse("missing header value".to_string())
            }
            HeaderBlockError::Stream(e) => e,
        }
    }

    pub(crate) fn into_multipart_error(self) -> Error {
        match self {
            HeaderBlockError::MalformedLineEnding => {
                Error::MultipartParse("malformed HTTP line ending in multipart data".to_string())
            }
            HeaderBlockError::MalformedHeader => {
                Error::MultipartParse("malformed header in multipart data".to_string())
            }
            HeaderBlockError::MissingHeaderValue => {
                Error::MultipartParse("missing header value in multipart data".to_string())
            }
            HeaderBlockError::Stream(e) => e,
        }
    }
}

/// Parse a header block up to and including its terminating blank line.
///
/// Names accept `[A-Za-z0-9-]`; a colon starts the value after optional
/// space or tab padding; a whitespace-led continuation line folds into the
/// previous value with a single joining space. Used by the request parser
/// and the multipart segment parser, whose grammars are identical.
pub(crate) async fn parse_header_block<S: ByteSource>(
    source: &mut S,
) -> Result<Headers, HeaderBlockError> {
    enum State {
        Name,
        Padding,
        Value,
    }

    let mut state = State::Name;
    let mut in_endline_seq = false;
    let mut seq_newlines = 0u32;
    let mut check_multiline = false;
    let mut name = String::new();
    let mut value = String::new();
    let mut headers = Headers::new();

    loop {
        let c = match read_byte(source).await.map_err(HeaderBlockError::Stream)? {
            Some(c) => c,
            None => return Err(HeaderBlockError::Stream(Error::ClientDisconnected)),
        };

        if in_endline_seq {
            if c == b'\n' {
                in_endline_seq = false;
            } else {
                return Err(HeaderBlockError::MalformedLineEnding);
            }
        }
        if c == b'\n' {
            seq_newlines += 1;
        } else if c == b'\r' {
            in_endline_seq = true;
            continue;
        } else {
            seq_newlines = 0;
        }

        match state {
            State::Name => match c {
                b':' => state = State::Padding,
                b'\n' if name.is_empty() => break,
                _ => {
                    if !(c.is_ascii_alphanumeric() || c == b'-') {
                        return Err(HeaderBlockError::MalformedHeader);
                    }
                    name.push(c as char);
                }
            },
            State::Padding => match c {
                b' ' | b'\t' => state = State::Value,
                // A value starting on the next line; the newline begins a
                // possible fold exactly as it would inside the value.
                b'\n' => {
                    check_multiline = true;
                    state = State::Value;
                }
                _ => return Err(HeaderBlockError::MalformedHeader),
            },
            State::Value => match c {
                b'\n' => {
                    if seq_newlines >= 2 {
                        if check_multiline {
                            if value.is_empty() {
                                return Err(HeaderBlockError::MissingHeaderValue);
                            }
                            headers.append(name.as_str(), value.as_str());
                        }
                        break;
                    }
                    check_multiline = true;
                }
                b' ' | b'\t' => {
                    check_multiline = false;
                    if !value.is_empty() && !value.ends_with(' ') {
                        value.push(' ');
                    }
                }
                _ => {
                    if check_multiline {
                        if value.is_empty() {
                            return Err(HeaderBlockError::MissingHeaderValue);
                        }
                        headers.append(name.as_str(), value.as_str());
                        name.clear();
                        name.push(c as char);
                        value.clear();
                        check_multiline = false;
                        state = State::Name;
                    } else {
                        value.push(c as char);
                    }
                }
            },
        }
    }

    Ok(headers)
}
