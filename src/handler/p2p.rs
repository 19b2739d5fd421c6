//! Dispatches every inbound peer connection to the handler for its tag
//! (§4.8). Each branch implements exactly one row of the message table;
//! unknown and response-only tags are closed silently.

use crate::message::p2p::*;
use crate::message::Message;
use crate::network::{Connection, ServerHandler};
use crate::procedures;
use crate::routing::{resolve_successor, NodeState};
use crate::storage::{FileStore, TRANSFER_CHUNK_SIZE};
use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Handler for inbound peer-to-peer connections.
pub struct P2PHandler {
    state: Arc<Mutex<NodeState>>,
    file_store: Arc<FileStore>,
    timeout_ms: u64,
}

impl P2PHandler {
    pub fn new(state: Arc<Mutex<NodeState>>, file_store: Arc<FileStore>, timeout_ms: u64) -> Self {
        Self { state, file_store, timeout_ms }
    }

    fn self_addr(&self) -> SocketAddr {
        self.state.lock().unwrap().addr
    }

    fn dispatch(&self, mut con: Connection) -> crate::Result<()> {
        let msg = con.receive()?;
        debug!("received {:?}", msg);

        match msg {
            Message::Ping(ping) => self.handle_ping(con, ping),
            Message::RequestSuccessor(req) => self.handle_request_successor(con, req),
            Message::RequestPredecessor => Ok(()),
            Message::NotifySuccessor(req) => self.handle_notify_successor(con, req),
            Message::NotifyPredecessor(req) => self.handle_notify_predecessor(req),
            Message::RequestFingers(req) => self.handle_request_fingers(con, req),
            Message::RequestFilesList(req) => self.handle_request_files_list(con, req),
            Message::RequestFile(req) => self.handle_request_file(con, req),
            Message::NotifyLeave(req) => self.handle_notify_leave(con, req),
            Message::RequestPut(req) => self.handle_request_put(req),
            Message::Unknown(tag) => {
                debug!("closing connection for unknown tag {}", tag);
                Ok(())
            }
            other => {
                warn!("received unexpected response-only message {:?} as a request", other);
                Ok(())
            }
        }
    }

    fn handle_ping(&self, mut con: Connection, ping: Ping) -> crate::Result<()> {
        debug!("PING from {}", ping.source);
        con.send(&Message::Pong)?;
        Ok(())
    }

    fn handle_request_successor(&self, mut con: Connection, req: RequestSuccessor) -> crate::Result<()> {
        let addr = resolve_successor(&self.state, req.key, self.timeout_ms);
        con.send(&Message::SuccessorAddr(SuccessorAddr { addr }))?;
        Ok(())
    }

    fn handle_notify_successor(&self, mut con: Connection, req: NotifySuccessor) -> crate::Result<()> {
        let old_predecessor = {
            let guard = self.state.lock().unwrap();
            guard.predecessor
        };

        con.send(&Message::PredecessorAddr(SuccessorAddr { addr: old_predecessor }))?;

        self.state.lock().unwrap().predecessor = req.source;
        info!("predecessor updated to {} via NOTIFY_SUCCESSOR", req.source);

        Ok(())
    }

    fn handle_notify_predecessor(&self, req: NotifyPredecessor) -> crate::Result<()> {
        self.state.lock().unwrap().set_successor(req.source);
        info!("successor updated to {} via NOTIFY_PREDECESSOR", req.source);
        Ok(())
    }

    fn handle_request_fingers(&self, mut con: Connection, _req: RequestFingers) -> crate::Result<()> {
        let addrs = {
            let guard = self.state.lock().unwrap();
            guard.finger_table.iter().map(|e| e.successor).collect()
        };

        con.send(&Message::FingersList(FingersList { addrs }))?;
        Ok(())
    }

    fn handle_request_files_list(&self, mut con: Connection, _req: RequestFilesList) -> crate::Result<()> {
        con.send(&Message::FilesList(FilesList { names: self.file_store.names() }))?;
        Ok(())
    }

    fn handle_request_file(&self, mut con: Connection, req: RequestFile) -> crate::Result<()> {
        if !self.file_store.contains(&req.filename) {
            debug!("'{}' requested by {} is absent", req.filename, req.source);
            con.send(&Message::FileAbsent)?;
            return Ok(());
        }

        let size = self.file_store.size_of(&req.filename)?;
        con.send(&Message::FileHeader(FileHeader { size }))?;

        let mut file = self.file_store.open_for_read(&req.filename)?;
        let mut chunk = [0u8; TRANSFER_CHUNK_SIZE];

        use std::io::Read;
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            con.write_raw(&chunk[..n])?;
        }

        // The file now lives with the requester; forget it here (§9: senders
        // delete on successful transfer).
        self.file_store.remove_name(&req.filename);
        info!("sent '{}' to {} and dropped it locally", req.filename, req.source);

        Ok(())
    }

    fn handle_notify_leave(&self, mut con: Connection, req: NotifyLeave) -> crate::Result<()> {
        self.state.lock().unwrap().predecessor = req.predecessor;
        info!("{} is leaving, predecessor is now {}", req.source, req.predecessor);

        if let Err(err) = procedures::request_files(
            req.source,
            true,
            self.self_addr(),
            &self.state,
            &self.file_store,
            self.timeout_ms,
        ) {
            warn!("failed to pull all files from departing {}: {}", req.source, err);
        }

        if let Err(err) = procedures::notify_predecessor(req.predecessor, self.self_addr(), self.timeout_ms) {
            warn!("failed to notify new predecessor {} of the relink: {}", req.predecessor, err);
        }

        con.send(&Message::ConfirmLeave)?;
        Ok(())
    }

    fn handle_request_put(&self, req: RequestPut) -> crate::Result<()> {
        info!("{} asked us to pull '{}'", req.source, req.filename);

        procedures::request_file(req.source, &req.filename, self.self_addr(), &self.file_store, self.timeout_ms)
    }
}

impl ServerHandler for P2PHandler {
    fn handle_connection(&self, con: Connection) {
        if let Err(err) = self.dispatch(con) {
            warn!("connection handler terminated with an error: {}", err);
        }
    }

    fn handle_error(&self, error: io::Error) {
        warn!("failed to accept an incoming connection: {}", error);
    }
}
