/*
 * multipart.rs
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

//! Streaming multipart/form-data decoder over any byte-stream source.
//!
//! Construction consumes the preamble through the opening `--boundary`
//! line. Segments are yielded one at a time by [`Multipart::next_segment`];
//! each is itself a byte stream ending at the `\r\n--boundary` delimiter,
//! with headers parsed by the same grammar as the request parser. Advancing
//! drains whatever remains of the current segment first. After a boundary,
//! `--` closes the whole multipart, while `\r\n` (or a lenient bare `\n`)
//! announces another segment.

use crate::error::Error;
use crate::request::parse_header_block;
use crate::stream::{read_byte, ByteSource};
use crate::types::Headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Begun,
    Finished,
}

/// Multipart document decoder.
#[derive(Debug)]
pub struct Multipart<'s, S: ByteSource> {
    source: &'s mut S,
    boundary: String,
    state: State,
    /// Look-ahead window holding bytes that might have begun the boundary
    /// delimiter but turned out to be segment content.
    lookahead: Vec<u8>,
    lookahead_pos: usize,
    segment_finished: bool,
}

impl<'s, S: ByteSource> Multipart<'s, S> {
    /// Advance `source` past any preamble until the opening boundary line
    /// has been consumed. The boundary must be non-empty.
    pub async fn new(source: &'s mut S, boundary: impl Into<String>) -> Result<Self, Error> {
        let boundary = boundary.into();
        if boundary.is_empty() {
            return Err(Error::MultipartParse(
                "empty multipart boundary".to_string(),
            ));
        }
        let mut multipart = Self {
            source,
            boundary,
            state: State::Ready,
            lookahead: Vec::new(),
            lookahead_pos: 0,
            segment_finished: false,
        };
        // There is no (CR)LF before the first boundary unless pre-boundary
        // content is being ignored.
        let mut crlf_start = false;
        loop {
            let content = multipart.scan(crlf_start).await?;
            crlf_start = true;
            if !content {
                break;
            }
        }
        multipart.segment_finished = false;
        Ok(multipart)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Yield the next segment, or `None` once the closing boundary has been
    /// seen. Any unread remainder of the current segment is drained first.
    pub async fn next_segment(&mut self) -> Result<Option<Segment<'_, 's, S>>, Error> {
        if self.state == State::Ready {
            self.state = State::Begun;
        } else if self.state == State::Begun {
            // Drain the current segment to its end-of-stream
            loop {
                self.lookahead_pos = self.lookahead.len();
                if self.segment_finished {
                    break;
                }
                self.scan(true).await?;
            }
        }
        if self.state == State::Finished {
            return Ok(None);
        }
        self.segment_finished = false;
        self.lookahead.clear();
        self.lookahead_pos = 0;
        let mut segment = Segment {
            parent: self,
            headers: Headers::new(),
        };
        let headers = parse_header_block(&mut segment)
            .await
            .map_err(|e| e.into_multipart_error())?;
        segment.headers = headers;
        Ok(Some(segment))
    }

    fn lookahead_available(&self) -> usize {
        self.lookahead.len() - self.lookahead_pos
    }

    /// Pull bytes from the source until either content bytes are available
    /// in the look-ahead window or a full boundary delimiter has been
    /// consumed and classified. Returns `true` when content is available,
    /// `false` when the delimiter ended the segment (and possibly the whole
    /// multipart). Only called with the window drained.
    async fn scan(&mut self, crlf_start: bool) -> Result<bool, Error> {
        let needle = if crlf_start {
            format!("\r\n--{}", self.boundary).into_bytes()
        } else {
            format!("--{}", self.boundary).into_bytes()
        };
        self.lookahead.clear();
        self.lookahead_pos = 0;

        let mut matched = 0usize;
        loop {
            let c = match self.source.peek().await? {
                Some(c) => c,
                None => {
                    return Err(Error::MultipartParse(
                        "premature end of multipart data".to_string(),
                    ))
                }
            };
            if c == needle[matched] || (matched == 0 && c == b'\n') || self.lookahead.is_empty() {
                self.lookahead.push(c);
                read_byte(self.source).await?;
            }
            if c == needle[matched] {
                matched += 1;
            } else if matched == 0 && c == b'\n' {
                // A bare LF is accepted where the delimiter's CRLF belongs
                matched += 2;
            } else {
                return Ok(true);
            }
            if matched >= needle.len() {
                break;
            }
        }

        let first = match read_byte(self.source).await? {
            Some(c) => c,
            None => {
                return Err(Error::MultipartParse(
                    "premature end of multipart boundary".to_string(),
                ))
            }
        };
        let second = match self.source.peek().await? {
            Some(c) => c,
            None => {
                return Err(Error::MultipartParse(
                    "premature end of multipart boundary".to_string(),
                ))
            }
        };
        if first == b'-' && second == b'-' {
            read_byte(self.source).await?;
            self.state = State::Finished;
        } else if first == b'\r' && second == b'\n' {
            read_byte(self.source).await?;
        } else if first != b'\n' {
            return Err(Error::MultipartParse(
                "malformed multipart boundary".to_string(),
            ));
        }

        self.lookahead.clear();
        self.lookahead_pos = 0;
        self.segment_finished = true;
        Ok(false)
    }
}

/// One part of a multipart document: parsed headers plus a bounded body
/// byte stream. Reads delegate to the parent decoder's boundary scanner.
#[derive(Debug)]
pub struct Segment<'m, 's, S: ByteSource> {
    parent: &'m mut Multipart<'s, S>,
    headers: Headers,
}

impl<S: ByteSource> Segment<'_, '_, S> {
    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl<S: ByteSource> ByteSource for Segment<'_, '_, S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let available = self.parent.lookahead_available();
            if available > 0 {
                let count = available.min(buf.len());
                let start = self.parent.lookahead_pos;
                buf[..count].copy_from_slice(&self.parent.lookahead[start..start + count]);
                self.parent.lookahead_pos += count;
                return Ok(count);
            }
            if self.parent.segment_finished {
                return Ok(0);
            }
            if !self.parent.scan(true).await? {
                return Ok(0);
            }
        }
    }

    async fn peek(&mut self) -> Result<Option<u8>, Error> {
        loop {
            if self.parent.lookahead_available() > 0 {
                return Ok(Some(self.parent.lookahead[self.parent.lookahead_pos]));
            }
            if self.parent.segment_finished {
                return Ok(None);
            }
            if !self.parent.scan(true).await? {
                return Ok(None);
            }
        }
    }

    fn unget(&mut self, byte: u8) -> Result<(), Error> {
        if self.parent.lookahead_pos > 0 {
            self.parent.lookahead_pos -= 1;
            let pos = self.parent.lookahead_pos;
            self.parent.lookahead[pos] = byte;
        } else {
            self.parent.lookahead.insert(0, byte);
        }
        Ok(())
    }

    fn end_of_stream(&self) -> bool {
        self.parent.segment_finished && self.parent.lookahead_available() == 0
    }
}
