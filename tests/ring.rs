//! Integration tests exercising a small ring built directly from the
//! library's pieces (§8's concrete scenarios and property-based checks
//! that are cheap to verify without a real multi-process deployment).

use chordshare::handler::P2PHandler;
use chordshare::network::Server;
use chordshare::routing::identifier::{in_arc, Identifier, Identify};
use chordshare::routing::{responsible_for, resolve_successor, NodeState};
use chordshare::storage::FileStore;
use chordshare::{membership, procedures};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TIMEOUT_MS: u64 = 500;

fn addr(port: u16) -> SocketAddr {
    format!("127.0.0.1:{}", port).parse().unwrap()
}

fn spawn_node(port: u16) -> (Arc<Mutex<NodeState>>, Arc<FileStore>) {
    let data_dir = tempfile::tempdir().unwrap();
    let file_store = Arc::new(FileStore::load_from_dir(data_dir.path()).unwrap());
    std::mem::forget(data_dir); // keep the directory alive for the process

    let self_addr = addr(port);
    let state = Arc::new(Mutex::new(NodeState::singleton(self_addr)));

    let handler = P2PHandler::new(Arc::clone(&state), Arc::clone(&file_store), TIMEOUT_MS);
    Server::new(Box::new(handler)).listen(self_addr, 2).unwrap();

    // give the acceptor thread a moment to bind before anyone connects.
    std::thread::sleep(Duration::from_millis(50));

    (state, file_store)
}

/// Ports hash to identifiers via SHA-256 (`routing::identifier::Identify`),
/// so there is no closed form for "a port whose identifier is X". These
/// helpers search for one at the time the test runs, which keeps every
/// other assertion in this file independent of the exact hash values.
fn port_with_identifier_band(start: u16, lo: u64, hi: u64) -> u16 {
    (start..)
        .find(|&port| {
            let id = addr(port).identifier().as_u64();
            id >= lo && id <= hi
        })
        .expect("identifier space exhausted searching for a port in the requested band")
}

fn port_with_identifier_below(start: u16, ceiling: u64) -> u16 {
    (start..)
        .find(|&port| addr(port).identifier().as_u64() < ceiling)
        .expect("identifier space exhausted searching for a port below the ceiling")
}

/// Scenario 2 (§8): after B joins A, A.successor == B, A.predecessor == B,
/// B.successor == A, B.predecessor == A.
#[test]
fn two_node_join_links_each_other_as_successor_and_predecessor() {
    let (state_a, file_store_a) = spawn_node(31101);
    let (state_b, file_store_b) = spawn_node(31102);

    let addr_a = state_a.lock().unwrap().addr;
    let addr_b = state_b.lock().unwrap().addr;

    membership::join(addr_a, &state_b, &file_store_b, TIMEOUT_MS).unwrap();

    assert_eq!(state_b.lock().unwrap().successor(), addr_a);
    assert_eq!(state_b.lock().unwrap().predecessor, addr_a);
    assert_eq!(state_a.lock().unwrap().successor(), addr_b);
    assert_eq!(state_a.lock().unwrap().predecessor, addr_b);

    let _ = file_store_a;
}

/// Round-trip law: `put_file` followed by `get_file` on the owning node
/// returns the same bytes, exercised here as "already in the right
/// place" (singleton ring, so every file belongs locally).
#[test]
fn put_then_get_on_singleton_is_a_noop_round_trip() {
    let (state, file_store) = spawn_node(31103);
    let self_addr = state.lock().unwrap().addr;

    let data_dir = file_store.data_dir().to_path_buf();
    std::fs::write(data_dir.join("greeting.txt"), b"hello ring").unwrap();
    file_store.insert_name("greeting.txt".to_string());

    procedures::put_file("greeting.txt", self_addr, &state, &file_store, TIMEOUT_MS).unwrap();
    assert!(file_store.contains("greeting.txt"));

    let err = procedures::get_file("greeting.txt", self_addr, &state, &file_store, TIMEOUT_MS);
    // already held locally, so request_file's "already exists" refusal fires
    assert!(err.is_err());
}

/// §9 Open Question 4: when no finger claims a key, resolution must fall
/// back to the node's current successor rather than hang or panic, even
/// when the forward candidate is unreachable.
///
/// Every finger (including entry 0, the successor) is pointed at the same
/// unreachable peer, and `key` is chosen strictly between that peer's
/// identifier and this node's own — so `scan_fingers` cannot return
/// `Owned` on the first entry (as it would for an arbitrary key) and must
/// fall through to `Forward`, which then fails to connect and triggers
/// the fallback.
#[test]
fn resolve_successor_falls_back_when_forward_target_is_unreachable() {
    let self_port = port_with_identifier_band(31150, 50, 220);
    let (state, _file_store) = spawn_node(self_port);
    let self_id = state.lock().unwrap().id.as_u64();

    let unreachable_port = port_with_identifier_below(31250, self_id - 1);
    let unreachable = addr(unreachable_port);
    let unreachable_id = unreachable.identifier().as_u64();

    {
        let mut guard = state.lock().unwrap();
        for i in 0..guard.finger_table.len() {
            guard.finger_table.set_successor(i, unreachable);
        }
    }

    let key = Identifier::new(unreachable_id + 1);
    let resolved = resolve_successor(&state, key, TIMEOUT_MS);

    assert_eq!(resolved, unreachable);
}

/// §8 invariant 4: re-resolving an already-converged finger table is
/// idempotent. Built on a real two-node ring (not a singleton, where
/// `fix_fingers` short-circuits without resolving anything) so the two
/// `fix_fingers` calls actually perform network resolution both times.
#[test]
fn fix_fingers_converges_to_a_fixed_point_on_a_real_two_node_ring() {
    let (state_a, file_store_a) = spawn_node(31106);
    let (state_b, file_store_b) = spawn_node(31107);

    let addr_a = state_a.lock().unwrap().addr;
    membership::join(addr_a, &state_b, &file_store_b, TIMEOUT_MS).unwrap();

    NodeState::fix_fingers(&state_b, TIMEOUT_MS);
    let first: Vec<_> = state_b.lock().unwrap().finger_table.iter().cloned().collect();

    NodeState::fix_fingers(&state_b, TIMEOUT_MS);
    let second: Vec<_> = state_b.lock().unwrap().finger_table.iter().cloned().collect();

    assert_eq!(first.len(), second.len());
    for (f, s) in first.iter().zip(second.iter()) {
        assert_eq!(f.target, s.target);
        assert_eq!(f.successor, s.successor);
    }

    let _ = file_store_a;
}

/// Scenario 4 (§8): a 3-node ring {A, B, C} formed entirely through real
/// `membership::join` calls; after B leaves, A's successor becomes C and
/// C's predecessor becomes A.
///
/// The three ports are chosen from well-separated identifier bands so the
/// ring's ascending order (A, B, C) is known in advance: without that,
/// whether C's join bootstraps off A's or B's arc depends on the real
/// hash values and the scenario can't be asserted deterministically.
#[test]
fn three_node_leave_relinks_around_the_departing_node() {
    let a_port = port_with_identifier_band(32000, 10, 60);
    let b_port = port_with_identifier_band(33000, 90, 140);
    let c_port = port_with_identifier_band(34000, 170, 220);

    let (state_a, file_store_a) = spawn_node(a_port);
    let (state_b, file_store_b) = spawn_node(b_port);
    let (state_c, file_store_c) = spawn_node(c_port);

    let addr_a = state_a.lock().unwrap().addr;

    membership::join(addr_a, &state_b, &file_store_b, TIMEOUT_MS).unwrap();
    membership::join(addr_a, &state_c, &file_store_c, TIMEOUT_MS).unwrap();

    membership::leave(&state_b, TIMEOUT_MS).unwrap();

    assert_eq!(state_a.lock().unwrap().successor(), state_c.lock().unwrap().addr);
    assert_eq!(state_c.lock().unwrap().predecessor, addr_a);

    let _ = file_store_a;
}

#[test]
fn responsible_for_matches_arc_predicate() {
    let (state, _file_store) = spawn_node(31105);
    let key = Identifier::new(0);

    let (predecessor_id, self_id) = {
        let guard = state.lock().unwrap();
        (guard.predecessor.identifier(), guard.id)
    };

    let guard = state.lock().unwrap();
    assert_eq!(responsible_for(&guard, key), in_arc(key, predecessor_id, self_id));
}
