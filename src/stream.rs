/*
 * stream.rs
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

//! Byte-stream capability traits and in-memory implementations.
//!
//! `Connection` implements both directions; a request `Body` and a multipart
//! `Segment` are sources. `MemorySource`/`MemorySink` back the parser and
//! marshaller tests and let applications run the streaming decoders over
//! already-buffered data.

use crate::error::Error;

/// Readable byte stream. `read` returning `Ok(0)` and `peek` returning
/// `Ok(None)` both signal end-of-stream.
#[allow(async_fn_in_trait)]
pub trait ByteSource {
    /// Read up to `buf.len()` bytes. May return fewer; `Ok(0)` only at
    /// end-of-stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Return the next byte without consuming it, or `None` at
    /// end-of-stream.
    async fn peek(&mut self) -> Result<Option<u8>, Error>;

    /// Push one byte back so the next read returns it. At least one byte of
    /// put-back room is always available directly after a successful read.
    fn unget(&mut self, byte: u8) -> Result<(), Error>;

    /// True when the stream is known to be exhausted without touching the
    /// underlying transport.
    fn end_of_stream(&self) -> bool {
        false
    }
}

/// Writable byte stream. Writes may be buffered until `flush`.
#[allow(async_fn_in_trait)]
pub trait ByteSink {
    /// Stage `buf` for writing, draining internal buffers as needed.
    /// Returns the number of bytes accepted.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error>;

    /// Drain all staged bytes to the underlying transport.
    async fn flush(&mut self) -> Result<(), Error>;
}

/// Read a single byte, or `None` at end-of-stream.
pub(crate) async fn read_byte<S: ByteSource>(source: &mut S) -> Result<Option<u8>, Error> {
    let mut byte = [0u8; 1];
    match source.read(&mut byte).await? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

/// Write all of `buf`, retrying short writes.
pub(crate) async fn write_all<S: ByteSink>(sink: &mut S, buf: &[u8]) -> Result<(), Error> {
    let mut written = 0;
    while written < buf.len() {
        written += sink.write(&buf[written..]).await?;
    }
    Ok(())
}

/// In-memory byte source over an owned buffer.
#[derive(Debug)]
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }
}

impl ByteSource for MemorySource {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let available = self.data.len() - self.pos;
        let count = available.min(buf.len());
        buf[..count].copy_from_slice(&self.data[self.pos..self.pos + count]);
        self.pos += count;
        Ok(count)
    }

    async fn peek(&mut self) -> Result<Option<u8>, Error> {
        Ok(self.data.get(self.pos).copied())
    }

    fn unget(&mut self, byte: u8) -> Result<(), Error> {
        if self.pos > 0 {
            self.pos -= 1;
            self.data[self.pos] = byte;
        } else {
            self.data.insert(0, byte);
        }
        Ok(())
    }

    fn end_of_stream(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// In-memory byte sink collecting everything written to it.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteSink for MemorySink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
