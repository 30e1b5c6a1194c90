/*
 * chunked.rs
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

//! Chunked transfer-encoding: a request-side decoder yielding one chunk per
//! advance, and a response-side encoder framing each write as
//! `hex-size CRLF bytes CRLF` with a zero-length terminating chunk at the
//! end. Chunk extensions are tolerated on read and never emitted on write.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Error;
use crate::response::Response;
use crate::stream::{read_byte, ByteSink, ByteSource};
use crate::types::{Headers, Protocol, ResponseCode};

/// Request-side chunk sequence reader.
#[derive(Debug)]
pub struct ChunkedReader<'s, S: ByteSource> {
    source: &'s mut S,
    finished: bool,
}

impl<'s, S: ByteSource> ChunkedReader<'s, S> {
    pub fn new(source: &'s mut S) -> Self {
        Self {
            source,
            finished: false,
        }
    }

    /// Read one chunk, or `None` after the zero-length final chunk.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        if self.finished {
            return Ok(None);
        }
        let size = self.read_chunk_size().await?;
        if size == 0 {
            self.finished = true;
            self.consume_optional_line_ending().await?;
            return Ok(None);
        }

        let mut chunk = vec![0u8; size];
        let mut got = 0;
        while got < size {
            match self.source.read(&mut chunk[got..]).await? {
                0 => return Err(Error::ClientDisconnected),
                count => got += count,
            }
        }
        self.expect_line_ending().await?;
        Ok(Some(Bytes::from(chunk)))
    }

    /// Parse `hex-size[;extensions] LF` (optional CR before LF). Extensions
    /// are skipped.
    async fn read_chunk_size(&mut self) -> Result<usize, Error> {
        let mut digits = String::new();
        let mut in_extension = false;
        loop {
            let c = match read_byte(self.source).await? {
                Some(c) => c,
                None => return Err(Error::ClientDisconnected),
            };
            match c {
                b'\r' => {
                    match read_byte(self.source).await? {
                        Some(b'\n') => {}
                        _ => {
                            return Err(Error::RequestParse(
                                "unparsable chunk size".to_string(),
                            ))
                        }
                    }
                    break;
                }
                b'\n' => break,
                b';' => in_extension = true,
                _ => {
                    if !in_extension {
                        digits.push(c as char);
                    }
                }
            }
        }
        let size = u64::from_str_radix(&digits, 16).map_err(|e| {
            if *e.kind() == std::num::IntErrorKind::PosOverflow {
                Error::RequestParse("chunk size too large".to_string())
            } else {
                Error::RequestParse("chunk size is not a base-16 number".to_string())
            }
        })?;
        usize::try_from(size)
            .map_err(|_| Error::RequestParse("chunk size too large".to_string()))
    }

    /// The CRLF that closes a chunk's data.
    async fn expect_line_ending(&mut self) -> Result<(), Error> {
        match read_byte(self.source).await? {
            Some(b'\r') => match read_byte(self.source).await? {
                Some(b'\n') => Ok(()),
                _ => Err(Error::Chunked("malformed chunk framing".to_string())),
            },
            Some(b'\n') => Ok(()),
            _ => Err(Error::Chunked("malformed chunk framing".to_string())),
        }
    }

    /// The blank line after the final chunk, when present. Absence is
    /// tolerated so a bare `0 CRLF` terminator also ends cleanly.
    async fn consume_optional_line_ending(&mut self) -> Result<(), Error> {
        match self.source.peek().await {
            Ok(Some(b'\r')) => {
                read_byte(self.source).await?;
                if self.source.peek().await? == Some(b'\n') {
                    read_byte(self.source).await?;
                } else {
                    self.source.unget(b'\r')?;
                }
                Ok(())
            }
            Ok(Some(b'\n')) => {
                read_byte(self.source).await?;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(Error::ClientDisconnected) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

enum Inner<'r, 's, S: ByteSink> {
    Borrowed(&'r mut Response<'s, S>),
    Owned(Response<'s, S>),
}

impl<S: ByteSink> std::fmt::Debug for Inner<'_, '_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inner::Borrowed(_) => f.write_str("Borrowed"),
            Inner::Owned(_) => f.write_str("Owned"),
        }
    }
}

/// Response-side chunk writer. Wraps an existing response, or constructs
/// one after validating the header set. Call [`ChunkedWriter::finish`] to
/// emit the terminating chunk and flush.
#[derive(Debug)]
pub struct ChunkedWriter<'r, 's, S: ByteSink> {
    inner: Inner<'r, 's, S>,
}

impl<'r, 's, S: ByteSink> ChunkedWriter<'r, 's, S> {
    /// Wrap a response whose headers already announce chunked encoding.
    pub fn wrap(response: &'r mut Response<'s, S>) -> Self {
        Self {
            inner: Inner::Borrowed(response),
        }
    }

    /// Construct the response as well. The headers must not contain
    /// `Content-Length` and must contain a `Transfer-Encoding` value list
    /// that includes `chunked`.
    pub async fn with_response(
        sink: &'s mut S,
        protocol: Protocol,
        code: &ResponseCode,
        headers: &Headers,
    ) -> Result<ChunkedWriter<'r, 's, S>, Error> {
        if headers.contains("Content-Length") {
            return Err(Error::Chunked(
                "cannot send \"Content-Length\" header with a chunked response".to_string(),
            ));
        }
        let announced = headers
            .get("Transfer-Encoding")
            .map(|values| values.iter().any(|value| value == "chunked"))
            .unwrap_or(false);
        if !announced {
            return Err(Error::Chunked(
                "missing \"Transfer-Encoding: chunked\" header".to_string(),
            ));
        }
        let response = Response::new(sink, protocol, code, headers).await?;
        Ok(Self {
            inner: Inner::Owned(response),
        })
    }

    fn response_mut(&mut self) -> &mut Response<'s, S> {
        match &mut self.inner {
            Inner::Borrowed(response) => response,
            Inner::Owned(response) => response,
        }
    }

    /// Frame `chunk` and flush it. An empty chunk is rejected because it
    /// would terminate the stream early.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), Error> {
        if chunk.is_empty() {
            return Err(Error::Chunked("cannot write an empty chunk".to_string()));
        }
        let mut frame = BytesMut::with_capacity(chunk.len() + 16);
        frame.put_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        frame.put_slice(chunk);
        frame.put_slice(b"\r\n");
        let response = self.response_mut();
        response.write(&frame).await?;
        response.flush().await
    }

    /// Emit the zero-length terminating chunk and flush.
    pub async fn finish(mut self) -> Result<(), Error> {
        let response = self.response_mut();
        response.write(b"0\r\n\r\n").await?;
        response.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemorySink, MemorySource};

    async fn decode_all(bytes: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        let mut source = MemorySource::new(bytes);
        let mut reader = ChunkedReader::new(&mut source);
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await? {
            chunks.push(chunk.to_vec());
        }
        Ok(chunks)
    }

    #[tokio::test]
    async fn decode_chunk_sequence() {
        let chunks = decode_all(b"3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n").await.unwrap();
        assert_eq!(chunks, vec![b"abc".to_vec(), b"de".to_vec()]);
    }

    #[tokio::test]
    async fn decode_tolerates_bare_lf() {
        let chunks = decode_all(b"3\nabc\n2\nde\n0\n\n").await.unwrap();
        assert_eq!(chunks, vec![b"abc".to_vec(), b"de".to_vec()]);
    }

    #[tokio::test]
    async fn decode_ignores_chunk_extensions() {
        let chunks = decode_all(b"3;name=value\r\nabc\r\n0\r\n\r\n").await.unwrap();
        assert_eq!(chunks, vec![b"abc".to_vec()]);
    }

    #[tokio::test]
    async fn decode_reader_stays_finished() {
        let mut source = MemorySource::new(&b"0\r\n\r\n"[..]);
        let mut reader = ChunkedReader::new(&mut source);
        assert!(reader.next_chunk().await.unwrap().is_none());
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decode_rejects_non_hex_size() {
        let err = decode_all(b"xyz\r\n").await.unwrap_err();
        assert!(
            matches!(err, Error::RequestParse(ref m) if m == "chunk size is not a base-16 number")
        );
    }

    #[tokio::test]
    async fn decode_rejects_oversized_chunk() {
        let err = decode_all(b"ffffffffffffffffff\r\n").await.unwrap_err();
        assert!(matches!(err, Error::RequestParse(ref m) if m == "chunk size too large"));
    }

    #[tokio::test]
    async fn decode_rejects_missing_chunk_terminator() {
        let err = decode_all(b"3\r\nabcXX").await.unwrap_err();
        assert!(matches!(err, Error::Chunked(ref m) if m == "malformed chunk framing"));
    }

    fn chunked_headers() -> Headers {
        Headers::from([("Transfer-Encoding", "chunked")])
    }

    #[tokio::test]
    async fn encode_chunk_sequence() {
        let mut sink = MemorySink::new();
        let mut writer = ChunkedWriter::with_response(
            &mut sink,
            Protocol::Http1_1,
            &ResponseCode::new(200, "OK"),
            &chunked_headers(),
        )
        .await
        .unwrap();
        writer.write_chunk(b"abc").await.unwrap();
        writer.write_chunk(b"de").await.unwrap();
        writer.finish().await.unwrap();

        let bytes = sink.into_inner();
        assert_eq!(
            bytes,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn encode_wrapping_an_existing_response() {
        let mut sink = MemorySink::new();
        let mut response = Response::new(
            &mut sink,
            Protocol::Http1_1,
            &ResponseCode::new(200, "OK"),
            &chunked_headers(),
        )
        .await
        .unwrap();
        let mut writer = ChunkedWriter::wrap(&mut response);
        writer.write_chunk(b"hello").await.unwrap();
        writer.finish().await.unwrap();
        response.finish().await.unwrap();
        let bytes = sink.into_inner();
        assert!(bytes.ends_with(b"\r\n\r\n5\r\nhello\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn encode_rejects_content_length() {
        let mut sink = MemorySink::new();
        let headers = Headers::from([("Content-Length", "5"), ("Transfer-Encoding", "chunked")]);
        let err = ChunkedWriter::with_response(
            &mut sink,
            Protocol::Http1_1,
            &ResponseCode::new(200, "OK"),
            &headers,
        )
        .await
        .err()
        .unwrap();
        assert!(
            matches!(err, Error::Chunked(ref m) if m.contains("Content-Length"))
        );
    }

    #[tokio::test]
    async fn encode_requires_chunked_transfer_encoding() {
        let mut sink = MemorySink::new();
        for headers in [Headers::new(), Headers::from([("Transfer-Encoding", "gzip")])] {
            let err = ChunkedWriter::with_response(
                &mut sink,
                Protocol::Http1_1,
                &ResponseCode::new(200, "OK"),
                &headers,
            )
            .await
            .err()
            .unwrap();
            assert!(
                matches!(err, Error::Chunked(ref m) if m == "missing \"Transfer-Encoding: chunked\" header")
            );
        }
    }

    #[tokio::test]
    async fn encode_rejects_empty_chunk() {
        let mut sink = MemorySink::new();
        let mut writer = ChunkedWriter::with_response(
            &mut sink,
            Protocol::Http1_1,
            &ResponseCode::new(200, "OK"),
            &chunked_headers(),
        )
        .await
        .unwrap();
        let err = writer.write_chunk(b"").await.unwrap_err();
        assert!(matches!(err, Error::Chunked(ref m) if m == "cannot write an empty chunk"));
    }

    #[tokio::test]
    async fn encode_then_decode_round_trip() {
        let mut sink = MemorySink::new();
        let mut writer = ChunkedWriter::with_response(
            &mut sink,
            Protocol::Http1_1,
            &ResponseCode::new(200, "OK"),
            &chunked_headers(),
        )
        .await
        .unwrap();
        let input: [&[u8]; 3] = [b"first", b"second chunk", b"x"];
        for chunk in input {
            writer.write_chunk(chunk).await.unwrap();
        }
        writer.finish().await.unwrap();

        let bytes = sink.into_inner();
        let head_end = bytes
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap()
            + 4;
        let chunks = decode_all(&bytes[head_end..]).await.unwrap();
        assert_eq!(chunks.len(), input.len());
        for (decoded, written) in chunks.iter().zip(input) {
            assert_eq!(decoded, written);
        }
    }
}
