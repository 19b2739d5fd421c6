//! Networking abstraction layer for TCP connections
//!
//! This module provides the abstraction from raw TCP sockets to
//! connections that exchange framed [`Message`] objects, plus a
//! thread-pool-backed server that accepts inbound connections and
//! dispatches each to a [`ServerHandler`].
//!
//! [`Message`]: ../message/enum.Message.html

use crate::message::Message;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::prelude::*;
use std::net::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

/// A connection to a remote peer exchanging framed [`Message`] objects.
///
/// # Examples
///
/// ```no_run
/// # use chordshare::network::Connection;
/// # use chordshare::message::{Message, p2p::Ping};
/// let mut con = Connection::open("127.0.0.1:1111", 3600).unwrap();
///
/// con.send(&Message::Ping(Ping { source: "127.0.0.1:2222".parse().unwrap() })).unwrap();
/// let reply = con.receive().unwrap();
/// ```
pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    /// Opens a TCP connection to a remote peer.
    ///
    /// `timeout_ms` bounds both read and write operations on the resulting
    /// connection.
    pub fn open<A: ToSocketAddrs>(addr: A, timeout_ms: u64) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::configure(&stream, timeout_ms)?;
        Ok(Self::from_stream(stream))
    }

    fn configure(stream: &TcpStream, timeout_ms: u64) -> io::Result<()> {
        let timeout = Duration::from_millis(timeout_ms);
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))
    }

    fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Receives one framed message from the remote peer.
    ///
    /// Blocks until the length prefix and the whole frame body have
    /// arrived.
    pub fn receive(&mut self) -> io::Result<Message> {
        let len = self.stream.read_u32::<NetworkEndian>()? as usize;

        if len > Message::MAX_CONTROL_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "control frame exceeded maximum length",
            ));
        }

        let mut body = vec![0u8; len];
        self.stream.read_exact(&mut body)?;
        Message::parse(&body)
    }

    /// Sends one framed message to the remote peer.
    pub fn send(&mut self, msg: &Message) -> io::Result<()> {
        let mut body = Vec::new();
        msg.write_bytes(&mut body)?;

        if body.len() > Message::MAX_CONTROL_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "control frame exceeded maximum length",
            ));
        }

        self.stream.write_u32::<NetworkEndian>(body.len() as u32)?;
        self.stream.write_all(&body)
    }

    /// Reads exactly `len` raw bytes, outside of message framing.
    ///
    /// Used for the `REQUEST_FILE` byte stream that follows a
    /// [`Message::FileHeader`].
    pub fn read_raw(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads up to `buf.len()` raw bytes, returning how many were read.
    pub fn read_raw_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    /// Writes raw bytes, outside of message framing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    /// Returns the socket address of the remote peer.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Returns the local half of this connection's address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Shuts down both halves of the underlying socket.
    pub fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}

/// A trait to handle incoming requests from a [`Server`].
pub trait ServerHandler {
    /// A connection has been established with some remote peer.
    fn handle_connection(&self, connection: Connection);

    /// The incoming request was unsuccessful and an error was raised.
    fn handle_error(&self, error: io::Error);

    /// Dispatches a raw accept result, turning a successful one into a
    /// [`Connection`] before handing it to [`handle_connection`].
    fn handle_incoming(&self, result: io::Result<TcpStream>) {
        match result {
            Ok(stream) => self.handle_connection(Connection::from_stream(stream)),
            Err(error) => self.handle_error(error),
        }
    }
}

/// A multithreaded server accepting connections on a listening socket.
///
/// # Examples
///
/// ```no_run
/// # use chordshare::network::Server;
/// # let handler = unimplemented!();
/// let server = Server::new(handler);
/// server.listen("127.0.0.1:1111", 4).unwrap();
/// ```
pub struct Server {
    handler: Arc<Box<dyn ServerHandler + Send + Sync>>,
}

impl Server {
    /// Creates a new server for the given handler.
    pub fn new(handler: Box<dyn ServerHandler + Send + Sync>) -> Self {
        Self { handler: Arc::new(handler) }
    }

    /// Listens on the given address, spawning `num_workers` worker threads
    /// to service accepted connections.
    pub fn listen<A: ToSocketAddrs>(self, addr: A, num_workers: usize) -> io::Result<thread::JoinHandle<()>> {
        let listener = TcpListener::bind(addr)?;

        let handle = thread::spawn(move || {
            let pool = ThreadPool::new(num_workers);

            for result in listener.incoming() {
                let handler = Arc::clone(&self.handler);
                pool.execute(move || {
                    handler.handle_incoming(result);
                });
            }
        });

        Ok(handle)
    }
}
