//! Client-side request helpers used by membership, stabilization and the
//! CLI-driven file operations (§4.4, §4.5, §4.7).
//!
//! Every helper here opens its own short-lived [`Connection`], issues one
//! request, reads (or skips) the matching reply, and lets the connection
//! drop — the "each client request opens its own outbound connection and
//! closes it after the single response" resource discipline of §5.

use crate::error::{FileAbsentError, FileExistsError, MessageError};
use crate::message::p2p::*;
use crate::message::Message;
use crate::network::Connection;
use crate::routing::identifier::Identify;
use crate::routing::{resolve_successor, NodeState};
use crate::storage::{FileStore, TRANSFER_CHUNK_SIZE};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Mutex;

/// Sends `PING{source}` to `addr` and returns whether a `Pong` came back.
pub fn ping(addr: SocketAddr, source: SocketAddr, timeout_ms: u64) -> crate::Result<()> {
    let mut con = Connection::open(addr, timeout_ms)?;
    con.send(&Message::Ping(Ping { source }))?;

    match con.receive()? {
        Message::Pong => Ok(()),
        other => Err(Box::new(MessageError::new(other))),
    }
}

/// §4.5 join step 2: tells `successor_addr` it has a new predecessor
/// candidate, returning the successor's previous predecessor.
pub fn notify_successor(
    successor_addr: SocketAddr,
    source: SocketAddr,
    timeout_ms: u64,
) -> crate::Result<SocketAddr> {
    let mut con = Connection::open(successor_addr, timeout_ms)?;
    con.send(&Message::NotifySuccessor(NotifySuccessor { source }))?;

    match con.receive()? {
        Message::PredecessorAddr(reply) => Ok(reply.addr),
        other => Err(Box::new(MessageError::new(other))),
    }
}

/// §4.5 join step 3 (and the NOTIFY_LEAVE handler's relinking step): tells
/// `addr` that `source` is now its successor. No response is expected.
pub fn notify_predecessor(addr: SocketAddr, source: SocketAddr, timeout_ms: u64) -> crate::Result<()> {
    let mut con = Connection::open(addr, timeout_ms)?;
    con.send(&Message::NotifyPredecessor(NotifyPredecessor { source }))?;
    Ok(())
}

/// §4.5 graceful leave: notifies the successor this node is departing and
/// waits for the terminal `CONFIRM_LEAVE`.
pub fn notify_leave(
    successor_addr: SocketAddr,
    source: SocketAddr,
    predecessor: SocketAddr,
    timeout_ms: u64,
) -> crate::Result<()> {
    let mut con = Connection::open(successor_addr, timeout_ms)?;
    con.send(&Message::NotifyLeave(NotifyLeave { source, predecessor }))?;

    match con.receive()? {
        Message::ConfirmLeave => Ok(()),
        other => Err(Box::new(MessageError::new(other))),
    }
}

/// Queries `addr` for its finger table's successor addresses.
pub fn request_fingers(addr: SocketAddr, source: SocketAddr, timeout_ms: u64) -> crate::Result<Vec<SocketAddr>> {
    let mut con = Connection::open(addr, timeout_ms)?;
    con.send(&Message::RequestFingers(RequestFingers { source }))?;

    match con.receive()? {
        Message::FingersList(list) => Ok(list.addrs),
        other => Err(Box::new(MessageError::new(other))),
    }
}

/// §4.7 `request_file`: pulls a single named file from `peer_addr`.
///
/// Refuses up front if `filename` is already held locally. Tracks receipt
/// progress at `debug` level whenever the completed percentage changes.
pub fn request_file(
    peer_addr: SocketAddr,
    filename: &str,
    source: SocketAddr,
    file_store: &FileStore,
    timeout_ms: u64,
) -> crate::Result<()> {
    if file_store.contains(filename) {
        return Err(Box::new(FileExistsError { filename: filename.to_string() }));
    }

    let mut con = Connection::open(peer_addr, timeout_ms)?;
    con.send(&Message::RequestFile(RequestFile {
        source,
        filename: filename.to_string(),
    }))?;

    let header = match con.receive()? {
        Message::FileHeader(header) => header,
        Message::FileAbsent => {
            return Err(Box::new(FileAbsentError { filename: filename.to_string() }))
        }
        other => return Err(Box::new(MessageError::new(other))),
    };

    let mut file = file_store.create_for_write(filename)?;
    let mut received: u64 = 0;
    let mut last_logged_percent = 0u64;
    let mut chunk = [0u8; TRANSFER_CHUNK_SIZE];

    use std::io::Write;
    while received < header.size {
        let remaining = (header.size - received) as usize;
        let want = remaining.min(chunk.len());
        let n = con.read_raw_chunk(&mut chunk[..want])?;
        if n == 0 {
            break;
        }
        file.write_all(&chunk[..n])?;
        received += n as u64;

        let percent = if header.size == 0 { 100 } else { received * 100 / header.size };
        if percent != last_logged_percent {
            debug!("receiving '{}': {}% ({}/{} bytes)", filename, percent, received, header.size);
            last_logged_percent = percent;
        }
    }

    file_store.insert_name(filename.to_string());
    info!("received file '{}' from {}", filename, peer_addr);

    Ok(())
}

/// §4.7 `request_files`: pulls the list of names `peer_addr` holds, then
/// requests each file that should move here (or every file, in
/// `download_all` mode).
pub fn request_files(
    peer_addr: SocketAddr,
    download_all: bool,
    self_addr: SocketAddr,
    state: &Mutex<NodeState>,
    file_store: &FileStore,
    timeout_ms: u64,
) -> crate::Result<()> {
    let names = {
        let mut con = Connection::open(peer_addr, timeout_ms)?;
        con.send(&Message::RequestFilesList(RequestFilesList { source: self_addr }))?;

        match con.receive()? {
            Message::FilesList(list) => list.names,
            other => return Err(Box::new(MessageError::new(other))),
        }
    };

    let selected: Vec<String> = if download_all {
        names
    } else {
        names
            .into_iter()
            .filter(|name| resolve_successor(state, name.identifier(), timeout_ms) == self_addr)
            .collect()
    };

    for name in selected {
        if let Err(err) = request_file(peer_addr, &name, self_addr, file_store, timeout_ms) {
            warn!("failed to pull file '{}' from {}: {}", name, peer_addr, err);
        }
    }

    Ok(())
}

/// §4.7 `put_file`: places a locally held file with whichever node is
/// responsible for its hash.
pub fn put_file(
    filename: &str,
    self_addr: SocketAddr,
    state: &Mutex<NodeState>,
    file_store: &FileStore,
    timeout_ms: u64,
) -> crate::Result<()> {
    if !file_store.contains(filename) {
        return Err(Box::new(FileAbsentError { filename: filename.to_string() }));
    }

    let target = resolve_successor(state, filename.identifier(), timeout_ms);

    if target == self_addr {
        info!("'{}' already belongs here, nothing to do", filename);
        return Ok(());
    }

    let mut con = Connection::open(target, timeout_ms)?;
    con.send(&Message::RequestPut(RequestPut {
        source: self_addr,
        filename: filename.to_string(),
    }))?;

    info!("asked {} to pull '{}'", target, filename);
    Ok(())
}

/// §4.7 `get_file`: fetches a file by name from whichever node is
/// responsible for its hash.
pub fn get_file(
    filename: &str,
    self_addr: SocketAddr,
    state: &Mutex<NodeState>,
    file_store: &FileStore,
    timeout_ms: u64,
) -> crate::Result<()> {
    let owner = resolve_successor(state, filename.identifier(), timeout_ms);
    request_file(owner, filename, self_addr, file_store, timeout_ms)
}
