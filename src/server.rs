/*
 * server.rs
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

//! Listening server: owns the listen socket and a default timeout, produces
//! connections on accept. The application owns the serve loop.

use std::time::Duration;

use log::{debug, trace};
use tokio::net::TcpListener;

use crate::connection::Connection;
use crate::error::Error;
use crate::socket::{self, Socket};

/// Listening socket plus the timeout handed to served connections.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_address: String,
    local_port: u16,
    timeout: i32,
}

impl Server {
    /// Bind and listen. `address` must be an IPv6 or IPv4 literal; port `0`
    /// picks an ephemeral port, observable through [`Server::port`].
    /// Timeout: `-1` waits indefinitely, `0` never blocks, positive values
    /// wait that many seconds.
    pub fn new(address: &str, port: u16, timeout: i32) -> Result<Self, Error> {
        let listener = socket::make_listener(address, port)?;
        let local = listener.local_addr().map_err(|e| {
            Error::Socket(format!(
                "could not get local information from socket: {}",
                e
            ))
        })?;
        let (local_address, local_port) = socket::printable_addr(&local);
        debug!("listening on {}:{}", local_address, local_port);
        Ok(Self {
            listener,
            local_address,
            local_port,
            timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.local_address
    }

    pub fn port(&self) -> u16 {
        self.local_port
    }

    pub fn timeout(&self) -> i32 {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: i32) {
        self.timeout = timeout;
    }

    /// Wait up to the current timeout for an incoming connection and wrap it
    /// in a [`Connection`] inheriting that timeout.
    pub async fn serve(&mut self) -> Result<Connection, Error> {
        let accepted = if self.timeout < 0 {
            self.listener.accept().await
        } else {
            // A zero timeout polls the accept once and times out if no
            // connection is pending.
            match tokio::time::timeout(
                Duration::from_secs(self.timeout as u64),
                self.listener.accept(),
            )
            .await
            {
                Ok(accepted) => accepted,
                Err(_) => return Err(Error::ConnectionTimeout),
            }
        };
        let (stream, _) = accepted
            .map_err(|e| Error::Socket(format!("could not accept client socket: {}", e)))?;
        let socket = Socket::from_stream(stream)?;
        trace!(
            "accepted connection from {}:{}",
            socket.remote_address(),
            socket.remote_port()
        );
        Ok(Connection::new(socket, self.timeout))
    }
}
