/*
 * socket.rs
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

//! Non-blocking IPv6 TCP sockets with deadline-based readiness waits.
//!
//! All sockets are IPv6; IPv4 literals are accepted as IPv6-mapped
//! addresses. Readiness waits go through [`Socket::wait_for`], whose timeout
//! follows the connection convention: `-1` waits indefinitely, positive
//! values wait that many seconds, and `0` is rejected (callers attempt the
//! operation directly in that mode).

use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::time::Duration;

use tokio::io::{Interest, Ready};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::Error;

/// Parse an IP literal: IPv6 as-is, IPv4 mapped into IPv6. Anything else
/// (including `"*"`) is rejected.
pub(crate) fn parse_ip(address: &str) -> Result<Ipv6Addr, Error> {
    if let Ok(v6) = address.parse::<Ipv6Addr>() {
        return Ok(v6);
    }
    if let Ok(v4) = address.parse::<std::net::Ipv4Addr>() {
        return Ok(v4.to_ipv6_mapped());
    }
    Err(Error::Socket(format!(
        "{} is not a valid IP address",
        address
    )))
}

/// Printable address and port, reporting IPv6-mapped IPv4 addresses in IPv4
/// text form and everything else in IPv6 form.
pub(crate) fn printable_addr(addr: &SocketAddr) -> (String, u16) {
    match addr {
        SocketAddr::V4(v4) => (v4.ip().to_string(), v4.port()),
        SocketAddr::V6(v6) => {
            let text = match v6.ip().to_ipv4_mapped() {
                Some(v4) => v4.to_string(),
                None => v6.ip().to_string(),
            };
            (text, v6.port())
        }
    }
}

/// New IPv6 TCP socket with address and port reuse enabled.
fn make_basic() -> Result<TcpSocket, Error> {
    let socket = TcpSocket::new_v6()
        .map_err(|e| Error::Socket(format!("failed to create socket: {}", e)))?;
    socket
        .set_reuseaddr(true)
        .map_err(|e| Error::Socket(format!("failed to set socket address reuse: {}", e)))?;
    socket
        .set_reuseport(true)
        .map_err(|e| Error::Socket(format!("failed to set socket port reuse: {}", e)))?;
    Ok(socket)
}

/// Bound, listening socket for a server. A small backlog suffices behind a
/// reverse proxy.
pub(crate) fn make_listener(address: &str, port: u16) -> Result<TcpListener, Error> {
    let socket = make_basic()?;
    let ip = parse_ip(address)?;
    socket
        .bind(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)))
        .map_err(|e| Error::Socket(format!("failed to bind listen socket: {}", e)))?;
    socket
        .listen(3)
        .map_err(|e| Error::Socket(format!("could not listen on socket: {}", e)))
}

/// A connected, non-blocking TCP socket with printable local and remote
/// endpoint information. Move-only; dropping closes the descriptor.
#[derive(Debug)]
pub struct Socket {
    stream: TcpStream,
    local_address: String,
    local_port: u16,
    remote_address: String,
    remote_port: u16,
}

impl Socket {
    /// Wrap an accepted or connected stream, querying the kernel for both
    /// endpoints.
    pub(crate) fn from_stream(stream: TcpStream) -> Result<Self, Error> {
        let local = stream.local_addr().map_err(|e| {
            Error::Socket(format!(
                "could not get local information from socket: {}",
                e
            ))
        })?;
        let remote = stream.peer_addr().map_err(|e| {
            Error::Socket(format!(
                "could not get remote information from socket: {}",
                e
            ))
        })?;
        let (local_address, local_port) = printable_addr(&local);
        let (remote_address, remote_port) = printable_addr(&remote);
        Ok(Self {
            stream,
            local_address,
            local_port,
            remote_address,
            remote_port,
        })
    }

    /// Connect to a server, optionally binding a specific local port first
    /// (`0` picks an ephemeral port).
    pub async fn connect(
        server_address: &str,
        server_port: u16,
        client_port: u16,
    ) -> Result<Self, Error> {
        let socket = make_basic()?;
        socket
            .bind(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::UNSPECIFIED,
                client_port,
                0,
                0,
            )))
            .map_err(|e| Error::Socket(format!("failed to bind client socket: {}", e)))?;
        let ip = parse_ip(server_address)?;
        let stream = socket
            .connect(SocketAddr::V6(SocketAddrV6::new(ip, server_port, 0, 0)))
            .await
            .map_err(|e| Error::Socket(format!("could not connect on client socket: {}", e)))?;
        Self::from_stream(stream)
    }

    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    pub(crate) fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Wait until the socket is ready for `interest` or the timeout elapses.
    /// Zero timeouts must be handled by the caller (attempt the operation
    /// directly); passing one here is an error.
    pub(crate) async fn wait_for(
        &self,
        interest: Interest,
        timeout: i32,
        purpose: &str,
    ) -> Result<Ready, Error> {
        if timeout == 0 {
            return Err(Error::Socket(
                "0-second timeouts can't be handled by wait_for()".to_string(),
            ));
        }
        let readiness = if timeout < 0 {
            self.stream.ready(interest).await
        } else {
            match tokio::time::timeout(
                Duration::from_secs(timeout as u64),
                self.stream.ready(interest),
            )
            .await
            {
                Ok(readiness) => readiness,
                Err(_) => return Err(Error::ConnectionTimeout),
            }
        };
        readiness.map_err(|e| Error::Socket(format!("failure to select on {}: {}", purpose, e)))
    }
}
