//! This crate implements a peer-to-peer file-sharing overlay built on the
//! [Chord protocol][w:chord] using [consistent hashing][w:cons].
//!
//! # Introduction
//!
//! Every peer occupies one point on a `2^M`-point identifier circle,
//! computed from the port it listens on. Files are likewise mapped onto
//! that circle by hashing their names, and the peer whose arc contains a
//! file's identifier is responsible for holding it. There is a single
//! peer-to-peer interface: each node both serves requests from other
//! nodes and issues requests on behalf of its local operator.
//!
//! # Architecture Design
//!
//! ## Application Architecture
//!
//! The central aspect of Chord is a distributed lookup method that maps a
//! given key to a node in the network. [`routing`] implements identifier
//! algebra, the finger table, and successor resolution. [`membership`]
//! layers the join and leave protocols on top, transferring file
//! ownership as nodes arrive and depart. [`stabilization`] runs the
//! periodic background correction that keeps the ring's successor
//! pointers converging even though joins and leaves are not otherwise
//! coordinated. [`storage`] tracks which files this node currently holds
//! and mediates the byte-level transfer of their contents.
//!
//! ## Process Architecture
//!
//! This implementation is based on TCP. A node listens on one address and
//! waits for incoming connections in an event loop; each incoming
//! connection is handed to a worker thread. Since work is spread over
//! shared memory and each request is expected to finish quickly, the
//! chosen form of parallelization is a thread pool: a fixed set of worker
//! threads drains a queue of accepted connections, avoiding the overhead
//! of spawning a thread per request.
//!
//! [w:chord]: https://en.wikipedia.org/wiki/Chord_(peer-to-peer)
//! [w:cons]: https://en.wikipedia.org/wiki/Consistent_hashing

use std::error::Error;

pub mod config;
pub mod error;
pub mod handler;
pub mod membership;
pub mod message;
pub mod network;
pub mod procedures;
pub mod routing;
pub mod stabilization;
pub mod storage;

pub type Result<T> = std::result::Result<T, Box<dyn Error>>;
