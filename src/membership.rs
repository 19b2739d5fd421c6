//! Ring membership: join and graceful leave (§4.5).

use crate::error::JoinError;
use crate::procedures;
use crate::routing::identifier::Identify;
use crate::routing::{query_successor, NodeState};
use crate::storage::FileStore;
use log::info;
use std::net::SocketAddr;
use std::sync::Mutex;

/// Attaches to an existing ring through `bootstrap_addr`, following the
/// four-step protocol of §4.5 exactly. Any failure of steps 1-4 is fatal
/// and reported as a [`JoinError`]; the caller is expected to terminate
/// the process on `Err`.
pub fn join(
    bootstrap_addr: SocketAddr,
    state: &Mutex<NodeState>,
    file_store: &FileStore,
    timeout_ms: u64,
) -> crate::Result<()> {
    let self_addr = state.lock().unwrap().addr;
    let self_id = self_addr.identifier();

    // 1. Ask the bootstrap peer who is responsible for our own id.
    let successor = query_successor(bootstrap_addr, self_addr, self_id, timeout_ms)
        .map_err(|e| JoinError::new(format!("could not reach bootstrap peer {}: {}", bootstrap_addr, e)))?;

    state.lock().unwrap().set_successor(successor);
    info!("joined via {}, initial successor is {}", bootstrap_addr, successor);

    // 2. Tell the new successor we exist; it hands back its old predecessor.
    let predecessor = procedures::notify_successor(successor, self_addr, timeout_ms)
        .map_err(|e| JoinError::new(format!("NOTIFY_SUCCESSOR to {} failed: {}", successor, e)))?;

    state.lock().unwrap().predecessor = predecessor;
    info!("predecessor is now {}", predecessor);

    // 3. Tell that predecessor its successor moved to us.
    procedures::notify_predecessor(predecessor, self_addr, timeout_ms)
        .map_err(|e| JoinError::new(format!("NOTIFY_PREDECESSOR to {} failed: {}", predecessor, e)))?;

    // 4. Pull the files that now fall into our arc from the successor.
    procedures::request_files(successor, false, self_addr, state, file_store, timeout_ms)
        .map_err(|e| JoinError::new(format!("initial file pull from {} failed: {}", successor, e)))?;

    info!("join complete, node is active");
    Ok(())
}

/// Graceful departure (§4.5 "stop"). A singleton ring exits immediately
/// with no network interaction; otherwise hands off to the successor and
/// waits for `CONFIRM_LEAVE` before returning.
pub fn leave(state: &Mutex<NodeState>, timeout_ms: u64) -> crate::Result<()> {
    let (self_addr, predecessor, successor) = {
        let guard = state.lock().unwrap();
        (guard.addr, guard.predecessor, guard.successor())
    };

    if successor == self_addr {
        info!("leaving a singleton ring, exiting immediately");
        return Ok(());
    }

    state.lock().unwrap().transfer_in_progress = true;

    let result = procedures::notify_leave(successor, self_addr, predecessor, timeout_ms);

    state.lock().unwrap().transfer_in_progress = false;
    result
}
