/*
 * connection.rs
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

//! Bidirectional buffered byte stream over one socket.
//!
//! Reads fill a fixed get buffer from the socket; writes stage into a put
//! buffer that drains on flush or overflow. All socket operations honour the
//! connection timeout: `-1` waits indefinitely, `0` attempts the operation
//! once and reports `ConnectionTimeout` if it would block, positive values
//! wait up to that many seconds. The connection does not flush on drop;
//! `Response` owns end-of-life flushing.

use std::io;

use tokio::io::Interest;

use crate::error::Error;
use crate::socket::Socket;
use crate::stream::{ByteSink, ByteSource};

/// Capacity of the get and put buffers.
pub const BUFFER_SIZE: usize = 1024;

/// One served TCP connection.
#[derive(Debug)]
pub struct Connection {
    socket: Socket,
    timeout: i32,
    get_buffer: Box<[u8]>,
    get_pos: usize,
    get_end: usize,
    put_buffer: Box<[u8]>,
    put_len: usize,
}

impl Connection {
    /// Wrap a connected socket. `Server::serve` calls this with the server's
    /// timeout; applications embedding a client socket may call it directly.
    pub fn new(socket: Socket, timeout: i32) -> Self {
        Self {
            socket,
            timeout,
            get_buffer: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
            get_pos: 0,
            get_end: 0,
            put_buffer: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
            put_len: 0,
        }
    }

    pub fn client_address(&self) -> &str {
        self.socket.remote_address()
    }

    pub fn client_port(&self) -> u16 {
        self.socket.remote_port()
    }

    pub fn server_address(&self) -> &str {
        self.socket.local_address()
    }

    pub fn server_port(&self) -> u16 {
        self.socket.local_port()
    }

    pub fn timeout(&self) -> i32 {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: i32) {
        self.timeout = timeout;
    }

    /// Unread bytes already pulled from the socket.
    pub(crate) fn buffered(&self) -> usize {
        self.get_end - self.get_pos
    }

    /// Pull one buffer's worth of bytes from the socket. Only called with an
    /// empty get buffer.
    async fn fill(&mut self) -> Result<(), Error> {
        loop {
            if self.timeout != 0 {
                self.socket
                    .wait_for(Interest::READABLE, self.timeout, "request read")
                    .await?;
            }
            match self.socket.stream().try_read(&mut self.get_buffer) {
                Ok(0) => return Err(Error::ClientDisconnected),
                Ok(count) => {
                    self.get_pos = 0;
                    self.get_end = count;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(Error::ConnectionTimeout)
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    return Err(Error::ClientDisconnected)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Socket(format!("failure to read request: {}", e))),
            }
        }
    }

    /// Send all staged put-buffer bytes. On timeout or disconnect the
    /// unsent remainder stays staged for a retry.
    async fn drain(&mut self) -> Result<(), Error> {
        let mut sent = 0;
        let result = loop {
            if sent >= self.put_len {
                break Ok(());
            }
            if self.timeout != 0 {
                if let Err(e) = self
                    .socket
                    .wait_for(Interest::WRITABLE, self.timeout, "response send")
                    .await
                {
                    break Err(e);
                }
            }
            match self
                .socket
                .stream()
                .try_write(&self.put_buffer[sent..self.put_len])
            {
                Ok(count) => sent += count,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    break Err(Error::ConnectionTimeout)
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    break Err(Error::ClientDisconnected)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(Error::Socket(format!("failure to send response: {}", e))),
            }
        };
        if sent > 0 {
            self.put_buffer.copy_within(sent..self.put_len, 0);
            self.put_len -= sent;
        }
        result
    }
}

impl ByteSource for Connection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.buffered() == 0 {
            self.fill().await?;
        }
        let count = self.buffered().min(buf.len());
        buf[..count].copy_from_slice(&self.get_buffer[self.get_pos..self.get_pos + count]);
        self.get_pos += count;
        Ok(count)
    }

    async fn peek(&mut self) -> Result<Option<u8>, Error> {
        if self.buffered() == 0 {
            self.fill().await?;
        }
        Ok(Some(self.get_buffer[self.get_pos]))
    }

    fn unget(&mut self, byte: u8) -> Result<(), Error> {
        if self.get_pos > 0 {
            self.get_pos -= 1;
            self.get_buffer[self.get_pos] = byte;
            Ok(())
        } else if self.get_end < self.get_buffer.len() {
            self.get_buffer.copy_within(self.get_pos..self.get_end, self.get_pos + 1);
            self.get_end += 1;
            self.get_buffer[self.get_pos] = byte;
            Ok(())
        } else {
            Err(Error::Socket(
                "no room to put back byte on connection".to_string(),
            ))
        }
    }
}

impl ByteSink for Connection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let mut accepted = 0;
        while accepted < buf.len() {
            if self.put_len == self.put_buffer.len() {
                self.drain().await?;
            }
            let space = self.put_buffer.len() - self.put_len;
            let count = space.min(buf.len() - accepted);
            self.put_buffer[self.put_len..self.put_len + count]
                .copy_from_slice(&buf[accepted..accepted + count]);
            self.put_len += count;
            accepted += count;
        }
        Ok(accepted)
    }

    async fn flush(&mut self) -> Result<(), Error> {
        self.drain().await
    }
}
