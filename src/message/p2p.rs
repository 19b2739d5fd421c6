//! Payload structs for every message tag in §4.8's wire table.
//!
//! Each struct knows how to parse itself from a [`Cursor`] over the frame
//! body and how to append its own bytes to an outgoing buffer. [`Message`]
//! (in the parent module) ties a tag to one of these and owns the framing
//! around them.

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use crate::routing::identifier::Identifier;
use std::io::{self, Cursor};
use std::io::prelude::*;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

fn write_addr(buffer: &mut Vec<u8>, addr: &SocketAddr) -> io::Result<()> {
    let ip = match addr.ip() {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    };
    buffer.write_all(&ip.octets())?;
    buffer.write_u16::<NetworkEndian>(addr.port())
}

fn read_addr(cursor: &mut Cursor<&[u8]>) -> io::Result<SocketAddr> {
    let mut ip_bytes = [0u8; 16];
    cursor.read_exact(&mut ip_bytes)?;
    let ipv6 = Ipv6Addr::from(ip_bytes);

    let ip = match ipv6.to_ipv4() {
        Some(v4) => IpAddr::V4(v4),
        None => IpAddr::V6(ipv6),
    };

    let port = cursor.read_u16::<NetworkEndian>()?;
    Ok(SocketAddr::new(ip, port))
}

fn write_identifier(buffer: &mut Vec<u8>, id: Identifier) -> io::Result<()> {
    buffer.write_u64::<NetworkEndian>(id.as_u64())
}

fn read_identifier(cursor: &mut Cursor<&[u8]>) -> io::Result<Identifier> {
    Ok(Identifier::new(cursor.read_u64::<NetworkEndian>()?))
}

fn write_string(buffer: &mut Vec<u8>, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    buffer.write_u16::<NetworkEndian>(bytes.len() as u16)?;
    buffer.write_all(bytes)
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let len = cursor.read_u16::<NetworkEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Tag 0 request. `PING{source}`.
#[derive(Debug, Clone)]
pub struct Ping {
    pub source: SocketAddr,
}

impl Ping {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Ping { source: read_addr(&mut cursor)? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)
    }
}

/// Tag 1 request. `REQUEST_SUCCESSOR{source, key}`.
#[derive(Debug, Clone)]
pub struct RequestSuccessor {
    pub source: SocketAddr,
    pub key: Identifier,
}

impl RequestSuccessor {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let source = read_addr(&mut cursor)?;
        let key = read_identifier(&mut cursor)?;
        Ok(RequestSuccessor { source, key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)?;
        write_identifier(buffer, self.key)
    }
}

/// Response to `REQUEST_SUCCESSOR`.
#[derive(Debug, Clone)]
pub struct SuccessorAddr {
    pub addr: SocketAddr,
}

impl SuccessorAddr {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(SuccessorAddr { addr: read_addr(&mut cursor)? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.addr)
    }
}

/// Tag 3 request. `NOTIFY_SUCCESSOR{source}`.
#[derive(Debug, Clone)]
pub struct NotifySuccessor {
    pub source: SocketAddr,
}

impl NotifySuccessor {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(NotifySuccessor { source: read_addr(&mut cursor)? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)
    }
}

/// Tag 4 request. `NOTIFY_PREDECESSOR{source}`.
#[derive(Debug, Clone)]
pub struct NotifyPredecessor {
    pub source: SocketAddr,
}

impl NotifyPredecessor {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(NotifyPredecessor { source: read_addr(&mut cursor)? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)
    }
}

/// Tag 5 request. `REQUEST_FINGERS{source}`.
#[derive(Debug, Clone)]
pub struct RequestFingers {
    pub source: SocketAddr,
}

impl RequestFingers {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(RequestFingers { source: read_addr(&mut cursor)? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)
    }
}

/// Response to `REQUEST_FINGERS`: the successor address of every finger entry.
#[derive(Debug, Clone)]
pub struct FingersList {
    pub addrs: Vec<SocketAddr>,
}

impl FingersList {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let count = cursor.read_u16::<NetworkEndian>()? as usize;
        let mut addrs = Vec::with_capacity(count);
        for _ in 0..count {
            addrs.push(read_addr(&mut cursor)?);
        }
        Ok(FingersList { addrs })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u16::<NetworkEndian>(self.addrs.len() as u16)?;
        for addr in &self.addrs {
            write_addr(buffer, addr)?;
        }
        Ok(())
    }
}

/// Tag 6 request. `REQUEST_FILES_LIST{source}`.
#[derive(Debug, Clone)]
pub struct RequestFilesList {
    pub source: SocketAddr,
}

impl RequestFilesList {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(RequestFilesList { source: read_addr(&mut cursor)? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)
    }
}

/// Response to `REQUEST_FILES_LIST`: every file name the peer holds.
#[derive(Debug, Clone)]
pub struct FilesList {
    pub names: Vec<String>,
}

impl FilesList {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let count = cursor.read_u16::<NetworkEndian>()? as usize;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(read_string(&mut cursor)?);
        }
        Ok(FilesList { names })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u16::<NetworkEndian>(self.names.len() as u16)?;
        for name in &self.names {
            write_string(buffer, name)?;
        }
        Ok(())
    }
}

/// Tag 7 request. `REQUEST_FILE{source, filename}`.
#[derive(Debug, Clone)]
pub struct RequestFile {
    pub source: SocketAddr,
    pub filename: String,
}

impl RequestFile {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let source = read_addr(&mut cursor)?;
        let filename = read_string(&mut cursor)?;
        Ok(RequestFile { source, filename })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)?;
        write_string(buffer, &self.filename)
    }
}

/// Header preceding the raw byte stream of a `REQUEST_FILE` response.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub size: u64,
}

impl FileHeader {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(FileHeader { size: cursor.read_u64::<NetworkEndian>()? })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u64::<NetworkEndian>(self.size)
    }
}

/// Tag 8 request. `NOTIFY_LEAVE{source, predecessor}`.
#[derive(Debug, Clone)]
pub struct NotifyLeave {
    pub source: SocketAddr,
    pub predecessor: SocketAddr,
}

impl NotifyLeave {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let source = read_addr(&mut cursor)?;
        let predecessor = read_addr(&mut cursor)?;
        Ok(NotifyLeave { source, predecessor })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)?;
        write_addr(buffer, &self.predecessor)
    }
}

/// Tag 10 request. `REQUEST_PUT{source, filename}`.
#[derive(Debug, Clone)]
pub struct RequestPut {
    pub source: SocketAddr,
    pub filename: String,
}

impl RequestPut {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let source = read_addr(&mut cursor)?;
        let filename = read_string(&mut cursor)?;
        Ok(RequestPut { source, filename })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_addr(buffer, &self.source)?;
        write_string(buffer, &self.filename)
    }
}
