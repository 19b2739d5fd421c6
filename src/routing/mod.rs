//! Finger table, ring state and successor resolution (§3, §4.2, §4.3, §4.4).
//!
//! [`NodeState`] holds everything about this node that mutates over its
//! lifetime: predecessor, successor (finger table entry 0), finger table,
//! and the `transfer_in_progress` flag guarding a graceful leave. It is
//! meant to live behind a single `Arc<Mutex<NodeState>>`, locked only for
//! the duration of a local update — never while a socket operation is in
//! flight (§5).
//!
//! [`resolve_successor`] is the one place that combines locked, local
//! finger-table lookups with the one-hop network forward §4.3/§4.4
//! describe; it drops the lock before making that network call.

pub mod identifier;

use crate::error::MessageError;
use crate::message::p2p::RequestSuccessor;
use crate::message::Message;
use crate::network::Connection;
use identifier::{in_arc, Identifier, Identify, KEY_SPACE, M};
use log::{debug, warn};
use std::net::SocketAddr;
use std::sync::Mutex;

/// One entry of the finger table: `successor` is believed responsible for
/// `target`.
#[derive(Debug, Clone, Copy)]
pub struct FingerEntry {
    pub target: Identifier,
    pub successor: SocketAddr,
}

/// Fixed-length array of `M` finger entries.
#[derive(Debug, Clone)]
pub struct FingerTable {
    entries: Vec<FingerEntry>,
}

impl FingerTable {
    /// §4.2 `init_fingers`: every entry points at `self_addr`.
    pub fn new(self_id: Identifier, self_addr: SocketAddr) -> Self {
        let entries = (0..M)
            .map(|i| FingerEntry {
                target: self_id.plus_power_of_two(i),
                successor: self_addr,
            })
            .collect();

        FingerTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, i: usize) -> FingerEntry {
        self.entries[i]
    }

    pub fn set_successor(&mut self, i: usize, addr: SocketAddr) {
        self.entries[i].successor = addr;
    }

    pub fn iter(&self) -> impl Iterator<Item = &FingerEntry> {
        self.entries.iter()
    }
}

/// All ring state belonging to this node (§3).
pub struct NodeState {
    pub id: Identifier,
    pub addr: SocketAddr,
    pub predecessor: SocketAddr,
    pub finger_table: FingerTable,
    pub transfer_in_progress: bool,
}

impl NodeState {
    /// A brand new, singleton node: its own successor and predecessor.
    pub fn singleton(addr: SocketAddr) -> Self {
        let id = addr.identifier();

        NodeState {
            id,
            addr,
            predecessor: addr,
            finger_table: FingerTable::new(id, addr),
            transfer_in_progress: false,
        }
    }

    /// The authoritative successor: finger table entry 0 (§3 invariant 1).
    pub fn successor(&self) -> SocketAddr {
        self.finger_table.get(0).successor
    }

    pub fn set_successor(&mut self, addr: SocketAddr) {
        self.finger_table.set_successor(0, addr);
    }

    pub fn is_singleton(&self) -> bool {
        self.successor() == self.addr
    }

    /// §4.2 `fix_fingers`: re-resolve every entry except 0. Skipped
    /// entirely on a singleton ring, where every finger already correctly
    /// points at `self`.
    pub fn fix_fingers(state: &Mutex<NodeState>, timeout_ms: u64) {
        let (is_singleton, targets): (bool, Vec<Identifier>) = {
            let guard = state.lock().unwrap();
            let targets = (1..guard.finger_table.len())
                .map(|i| guard.finger_table.get(i).target)
                .collect();
            (guard.is_singleton(), targets)
        };

        if is_singleton {
            return;
        }

        for (offset, target) in targets.into_iter().enumerate() {
            let i = offset + 1;
            let resolved = resolve_successor(state, target, timeout_ms);

            let mut guard = state.lock().unwrap();
            guard.finger_table.set_successor(i, resolved);
        }
    }
}

/// The outcome of scanning the local finger table for `key` (§4.3).
enum LocalResolution {
    /// This node owns `key`.
    Owned(SocketAddr),
    /// No finger claims `key`; forward to the nearest known candidate.
    Forward(SocketAddr),
}

/// Scans the finger table in index order per §4.3, without any network
/// I/O. Returns the address to return immediately, or the address to
/// forward the query to.
fn scan_fingers(state: &NodeState, key: Identifier) -> LocalResolution {
    if key == state.id {
        return LocalResolution::Owned(state.addr);
    }

    let mut nearest_known = state.addr;

    for entry in state.finger_table.iter() {
        let c = entry.successor;
        let c_id = c.identifier();

        if c_id > state.id {
            if key > state.id && key <= c_id {
                return LocalResolution::Owned(c);
            }
            nearest_known = c;
            continue;
        }

        // c_id <= state.id: the finger wraps back to (or equals) self.
        if c_id == state.id {
            if state.is_singleton() {
                return LocalResolution::Owned(state.addr);
            }
            break;
        }

        if key > state.id || key <= c_id {
            return LocalResolution::Owned(c);
        }
        nearest_known = c;
    }

    LocalResolution::Forward(nearest_known)
}

/// §4.3/§4.4: find the node responsible for `key`.
///
/// Locks `state` only long enough to scan the finger table, then (if
/// necessary) opens one client connection to forward the query, entirely
/// outside the lock. On a failed forward, falls back to this node's
/// current successor (§9: resolves the reference design's unreachable
/// "no finger claimed it and no forward target" branch).
pub fn resolve_successor(state: &Mutex<NodeState>, key: Identifier, timeout_ms: u64) -> SocketAddr {
    let resolution = {
        let guard = state.lock().unwrap();
        scan_fingers(&guard, key)
    };

    match resolution {
        LocalResolution::Owned(addr) => addr,
        LocalResolution::Forward(via_addr) => {
            match forward_successor(key, via_addr, state, timeout_ms) {
                Some(addr) => addr,
                None => {
                    warn!("forwarding REQUEST_SUCCESSOR for key {} to {} failed, falling back to current successor", key, via_addr);
                    state.lock().unwrap().successor()
                }
            }
        }
    }
}

/// §4.4 `forward_successor`: ask `via_addr` who is responsible for `key`.
fn forward_successor(
    key: Identifier,
    via_addr: SocketAddr,
    state: &Mutex<NodeState>,
    timeout_ms: u64,
) -> Option<SocketAddr> {
    let source = state.lock().unwrap().addr;

    debug!("forwarding REQUEST_SUCCESSOR for key {} to {}", key, via_addr);

    match query_successor(via_addr, source, key, timeout_ms) {
        Ok(addr) => Some(addr),
        Err(err) => {
            warn!("REQUEST_SUCCESSOR forward to {} failed: {}", via_addr, err);
            None
        }
    }
}

/// Sends a bare `REQUEST_SUCCESSOR{source, key}` to `addr` and returns the
/// reply, without touching any local state. Used directly by the join
/// protocol (§4.5 step 1), which has no finger table yet to scan.
pub fn query_successor(addr: SocketAddr, source: SocketAddr, key: Identifier, timeout_ms: u64) -> crate::Result<SocketAddr> {
    let mut con = Connection::open(addr, timeout_ms)?;
    con.send(&Message::RequestSuccessor(RequestSuccessor { source, key }))?;

    match con.receive()? {
        Message::SuccessorAddr(reply) => Ok(reply.addr),
        other => Err(Box::new(MessageError::new(other))),
    }
}

/// Whether `key` falls within the arc this node currently owns, i.e.
/// `(predecessor.id, self.id]` (§3 invariant 3, §4.1).
pub fn responsible_for(state: &NodeState, key: Identifier) -> bool {
    in_arc(key, state.predecessor.identifier(), state.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[test]
    fn singleton_owns_every_key() {
        let state = NodeState::singleton(addr(1111));
        for k in 0..KEY_SPACE {
            match scan_fingers(&state, Identifier::new(k)) {
                LocalResolution::Owned(a) => assert_eq!(a, state.addr),
                LocalResolution::Forward(_) => panic!("singleton should never forward"),
            }
        }
    }

    #[test]
    fn fix_fingers_is_idempotent_on_singleton() {
        let state = Mutex::new(NodeState::singleton(addr(1111)));
        let before: Vec<_> = state.lock().unwrap().finger_table.iter().cloned().collect();

        NodeState::fix_fingers(&state, 100);

        let after: Vec<_> = state.lock().unwrap().finger_table.iter().cloned().collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.target, a.target);
            assert_eq!(b.successor, a.successor);
        }
    }

    #[test]
    fn init_fingers_targets_follow_spec_formula() {
        let id = addr(1111).identifier();
        let table = FingerTable::new(id, addr(1111));
        for i in 0..table.len() as u32 {
            assert_eq!(table.get(i as usize).target, id.plus_power_of_two(i));
        }
    }
}
