// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-logstash.
//
// tracing-logstash is free software: you can redistribute it and/or modify it under the terms of
// the GNU General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// tracing-logstash is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-logstash.
// If not, see <http://www.gnu.org/licenses/>.

//! The Logstash transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, TCP, UDP &
//! Unix socket implementations, and [`WriterTransport`] for any pre-built [`std::io::Write`]
//! implementation.
//!
//! # Examples
//!
//! To send records over TCP to a Logstash `tcp` input on localhost:
//!
//! ```no_run
//! use tracing_logstash::transport::TcpTransport;
//! let transpo = TcpTransport::new("localhost:5000").unwrap();
//! ```
//!
//! To pick the transport from configuration:
//!
//! ```rust
//! use tracing_logstash::transport::{dial, Protocol};
//! let protocol: Protocol = "unix".parse().unwrap();
//! let transpo = dial(protocol, "/i/am/not/there.s");
//! assert!(transpo.is_err()); // no such socket, after all
//! ```

use crate::{
    error::{Error, Result},
    layer::INTERNAL_TARGET,
};

use backtrace::Backtrace;

use std::{io::Write, net::TcpStream};

#[cfg(unix)]
use std::{
    os::unix::net::{UnixDatagram, UnixStream},
    path::Path,
};

type StdResult<T, E> = std::result::Result<T, E>;

/// Supported socket families
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    /// Unix domain socket, stream-oriented
    #[cfg(unix)]
    Unix,
    /// Unix domain socket, datagram-oriented
    #[cfg(unix)]
    UnixGram,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Protocol::Tcp => "tcp",
                Protocol::Udp => "udp",
                #[cfg(unix)]
                Protocol::Unix => "unix",
                #[cfg(unix)]
                Protocol::UnixGram => "unixgram",
            }
        )
    }
}

impl std::str::FromStr for Protocol {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            #[cfg(unix)]
            "unix" => Ok(Protocol::Unix),
            #[cfg(unix)]
            "unixgram" => Ok(Protocol::UnixGram),
            _ => Err(Error::BadProtocol {
                name: s.to_owned(),
                back: Backtrace::new(),
            }),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
pub trait Transport {
    /// Send one complete record on this transport mechanism.
    ///
    /// Records arrive fully formed (including their trailing newline), so datagram transports send
    /// each as a single packet & stream transports write it in full.
    fn send(&mut self, buf: &[u8]) -> Result<usize>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).send(buf)
    }
}

/// Open a [`Transport`] to `address` over `protocol`.
///
/// For [`Protocol::Tcp`] & [`Protocol::Udp`] `address` is a `host:port` pair; for the Unix
/// variants it is a filesystem path. Failure is reported as [`Error::Connect`] & not retried.
pub fn dial(protocol: Protocol, address: &str) -> Result<Box<dyn Transport + Send>> {
    let transport: Box<dyn Transport + Send> = match protocol {
        Protocol::Tcp => Box::new(TcpTransport::new(address)?),
        Protocol::Udp => Box::new(UdpTransport::new(address)?),
        #[cfg(unix)]
        Protocol::Unix => Box::new(UnixSocketStream::new(address)?),
        #[cfg(unix)]
        Protocol::UnixGram => Box::new(UnixSocket::new(address)?),
    };
    tracing::debug!(target: INTERNAL_TARGET, "connected to {}://{}", protocol, address);
    Ok(transport)
}

/// Sending records via UDP datagrams.
pub struct UdpTransport {
    socket: std::net::UdpSocket,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: std::net::ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        let peer = addr
            .to_socket_addrs()
            .map_err(Error::connect)?
            .next()
            .ok_or_else(|| Error::connect("address resolved to nothing"))?;
        // Bind to any available port in the peer's address family...
        let local = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = std::net::UdpSocket::bind(local).map_err(Error::connect)?;
        // and connect to Logstash at `peer`:
        socket.connect(peer).map_err(Error::connect)?;
        Ok(UdpTransport { socket })
    }
    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        self.socket.peer_addr().map_err(Error::connect)
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).map_err(Error::write)
    }
}

/// Sending records via TCP streams
pub struct TcpTransport {
    socket: TcpStream,
}

impl TcpTransport {
    /// Construct a [`Transport`] implementation via TCP at `addr`.
    pub fn new<A: std::net::ToSocketAddrs>(addr: A) -> Result<TcpTransport> {
        Ok(TcpTransport {
            socket: TcpStream::connect(addr).map_err(Error::connect)?,
        })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        write_record(&mut self.socket, buf)
    }
}

/// Sending records via Unix socket (datagram)
#[cfg(unix)]
pub struct UnixSocket {
    socket: UnixDatagram,
}

#[cfg(unix)]
impl UnixSocket {
    /// Construct a [`Transport`] implementation via Unix datagram sockets at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<UnixSocket> {
        let sock = UnixDatagram::unbound().map_err(Error::connect)?;
        sock.connect(path).map_err(Error::connect)?;
        Ok(UnixSocket { socket: sock })
    }
}

#[cfg(unix)]
impl Transport for UnixSocket {
    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).map_err(Error::write)
    }
}

/// Sending records via Unix socket (stream)
#[cfg(unix)]
pub struct UnixSocketStream {
    socket: UnixStream,
}

#[cfg(unix)]
impl UnixSocketStream {
    /// Construct a [`Transport`] implementation via Unix sockets at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<UnixSocketStream> {
        Ok(UnixSocketStream {
            socket: UnixStream::connect(path).map_err(Error::connect)?,
        })
    }
}

#[cfg(unix)]
impl Transport for UnixSocketStream {
    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        write_record(&mut self.socket, buf)
    }
}

/// Sending records to any [`std::io::Write`] implementation the caller has already opened: a
/// socket from another library, a file, an in-memory buffer...
pub struct WriterTransport<W: Write> {
    writer: W,
}

impl<W: Write> WriterTransport<W> {
    pub fn new(writer: W) -> WriterTransport<W> {
        WriterTransport { writer }
    }
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        write_record(&mut self.writer, buf)
    }
}

fn write_record<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<usize> {
    writer.write_all(buf).map_err(Error::write)?;
    writer.flush().map_err(Error::write)?;
    Ok(buf.len())
}
