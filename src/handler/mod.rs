//! The peer-to-peer request dispatcher.
//!
//! [`P2PHandler`] implements [`ServerHandler`] and is the sole handler
//! registered with the [`Server`] that accepts inbound peer connections.
//!
//! [`ServerHandler`]: ../network/trait.ServerHandler.html
//! [`Server`]: ../network/struct.Server.html

pub use self::p2p::P2PHandler;

mod p2p;
