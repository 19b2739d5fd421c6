//! The wire protocol: a tagged sum of messages framed with a length prefix.
//!
//! Every frame is `u32 length | u8 tag | payload`, where `length` counts
//! everything after itself. Control frames are bounded by
//! [`Message::MAX_CONTROL_LENGTH`] (§6). `REQUEST_FILE`'s reply is the one
//! exception described in §4.8/§6: a [`p2p::FileHeader`] frame followed by
//! a raw, unframed byte stream of the announced length, handled directly by
//! [`crate::network::Connection`] rather than through this enum.
//!
//! Numeric tag values for the request types match §4.8's table exactly.
//! Response-only payloads use tags above 100, since the reference design
//! leaves those unspecified (§9: the wire format is not required to be
//! portable, only self-consistent between peers running this crate).

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Cursor};

pub mod p2p;

#[derive(Debug, Clone)]
pub enum Message {
    /// Tag 0. Liveness probe.
    Ping(p2p::Ping),
    /// Response to `Ping`.
    Pong,
    /// Tag 1. Ask for the node responsible for `key`.
    RequestSuccessor(p2p::RequestSuccessor),
    /// Response to `RequestSuccessor`.
    SuccessorAddr(p2p::SuccessorAddr),
    /// Tag 2. Reserved, unused (§4.8); accepted on the wire, never acted on.
    RequestPredecessor,
    /// Tag 3. Tell the successor it has a new predecessor candidate.
    NotifySuccessor(p2p::NotifySuccessor),
    /// Response to `NotifySuccessor`: the recipient's old predecessor.
    PredecessorAddr(p2p::SuccessorAddr),
    /// Tag 4. Tell a peer it has a new successor.
    NotifyPredecessor(p2p::NotifyPredecessor),
    /// Tag 5. Ask for the current finger table.
    RequestFingers(p2p::RequestFingers),
    /// Response to `RequestFingers`.
    FingersList(p2p::FingersList),
    /// Tag 6. Ask for the list of locally held file names.
    RequestFilesList(p2p::RequestFilesList),
    /// Response to `RequestFilesList`.
    FilesList(p2p::FilesList),
    /// Tag 7. Ask for a specific file by name.
    RequestFile(p2p::RequestFile),
    /// Response header to `RequestFile`, followed by `size` raw bytes.
    FileHeader(p2p::FileHeader),
    /// Response to `RequestFile` when the name is not held locally.
    FileAbsent,
    /// Tag 8. The sender's predecessor is leaving the ring.
    NotifyLeave(p2p::NotifyLeave),
    /// Tag 9. Terminal acknowledgement of a graceful leave.
    ConfirmLeave,
    /// Tag 10. Ask the recipient to pull a file back from `source`.
    RequestPut(p2p::RequestPut),
    /// A tag this crate does not recognize. The dispatcher closes silently.
    Unknown(u8),
}

impl Message {
    /// Maximum length of a control frame (§6).
    pub const MAX_CONTROL_LENGTH: usize = 1024;

    const PING: u8 = 0;
    const REQUEST_SUCCESSOR: u8 = 1;
    const REQUEST_PREDECESSOR: u8 = 2;
    const NOTIFY_SUCCESSOR: u8 = 3;
    const NOTIFY_PREDECESSOR: u8 = 4;
    const REQUEST_FINGERS: u8 = 5;
    const REQUEST_FILES_LIST: u8 = 6;
    const REQUEST_FILE: u8 = 7;
    const NOTIFY_LEAVE: u8 = 8;
    const CONFIRM_LEAVE: u8 = 9;
    const REQUEST_PUT: u8 = 10;

    const PONG: u8 = 100;
    const SUCCESSOR_ADDR: u8 = 101;
    const PREDECESSOR_ADDR: u8 = 103;
    const FINGERS_LIST: u8 = 105;
    const FILES_LIST: u8 = 106;
    const FILE_HEADER: u8 = 107;
    const FILE_ABSENT: u8 = 108;

    fn tag(&self) -> u8 {
        match self {
            Message::Ping(_) => Self::PING,
            Message::Pong => Self::PONG,
            Message::RequestSuccessor(_) => Self::REQUEST_SUCCESSOR,
            Message::SuccessorAddr(_) => Self::SUCCESSOR_ADDR,
            Message::RequestPredecessor => Self::REQUEST_PREDECESSOR,
            Message::NotifySuccessor(_) => Self::NOTIFY_SUCCESSOR,
            Message::PredecessorAddr(_) => Self::PREDECESSOR_ADDR,
            Message::NotifyPredecessor(_) => Self::NOTIFY_PREDECESSOR,
            Message::RequestFingers(_) => Self::REQUEST_FINGERS,
            Message::FingersList(_) => Self::FINGERS_LIST,
            Message::RequestFilesList(_) => Self::REQUEST_FILES_LIST,
            Message::FilesList(_) => Self::FILES_LIST,
            Message::RequestFile(_) => Self::REQUEST_FILE,
            Message::FileHeader(_) => Self::FILE_HEADER,
            Message::FileAbsent => Self::FILE_ABSENT,
            Message::NotifyLeave(_) => Self::NOTIFY_LEAVE,
            Message::ConfirmLeave => Self::CONFIRM_LEAVE,
            Message::RequestPut(_) => Self::REQUEST_PUT,
            Message::Unknown(tag) => *tag,
        }
    }

    /// Parses a single frame body (tag + payload, without the length
    /// prefix, which the caller has already consumed to know how many
    /// bytes to read).
    pub fn parse(buffer: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(buffer);
        let tag = cursor.read_u8()?;

        let msg = match tag {
            Self::PING => Message::Ping(p2p::Ping::parse(cursor)?),
            Self::PONG => Message::Pong,
            Self::REQUEST_SUCCESSOR => Message::RequestSuccessor(p2p::RequestSuccessor::parse(cursor)?),
            Self::SUCCESSOR_ADDR => Message::SuccessorAddr(p2p::SuccessorAddr::parse(cursor)?),
            Self::REQUEST_PREDECESSOR => Message::RequestPredecessor,
            Self::NOTIFY_SUCCESSOR => Message::NotifySuccessor(p2p::NotifySuccessor::parse(cursor)?),
            Self::PREDECESSOR_ADDR => Message::PredecessorAddr(p2p::SuccessorAddr::parse(cursor)?),
            Self::NOTIFY_PREDECESSOR => Message::NotifyPredecessor(p2p::NotifyPredecessor::parse(cursor)?),
            Self::REQUEST_FINGERS => Message::RequestFingers(p2p::RequestFingers::parse(cursor)?),
            Self::FINGERS_LIST => Message::FingersList(p2p::FingersList::parse(cursor)?),
            Self::REQUEST_FILES_LIST => Message::RequestFilesList(p2p::RequestFilesList::parse(cursor)?),
            Self::FILES_LIST => Message::FilesList(p2p::FilesList::parse(cursor)?),
            Self::REQUEST_FILE => Message::RequestFile(p2p::RequestFile::parse(cursor)?),
            Self::FILE_HEADER => Message::FileHeader(p2p::FileHeader::parse(cursor)?),
            Self::FILE_ABSENT => Message::FileAbsent,
            Self::NOTIFY_LEAVE => Message::NotifyLeave(p2p::NotifyLeave::parse(cursor)?),
            Self::CONFIRM_LEAVE => Message::ConfirmLeave,
            Self::REQUEST_PUT => Message::RequestPut(p2p::RequestPut::parse(cursor)?),
            other => Message::Unknown(other),
        };

        Ok(msg)
    }

    /// Serializes tag + payload into `buffer`, NOT including the length
    /// prefix (the caller writes that once the final length is known).
    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u8(self.tag())?;

        match self {
            Message::Ping(ping) => ping.write_bytes(buffer)?,
            Message::Pong => {}
            Message::RequestSuccessor(msg) => msg.write_bytes(buffer)?,
            Message::SuccessorAddr(msg) => msg.write_bytes(buffer)?,
            Message::RequestPredecessor => {}
            Message::NotifySuccessor(msg) => msg.write_bytes(buffer)?,
            Message::PredecessorAddr(msg) => msg.write_bytes(buffer)?,
            Message::NotifyPredecessor(msg) => msg.write_bytes(buffer)?,
            Message::RequestFingers(msg) => msg.write_bytes(buffer)?,
            Message::FingersList(msg) => msg.write_bytes(buffer)?,
            Message::RequestFilesList(msg) => msg.write_bytes(buffer)?,
            Message::FilesList(msg) => msg.write_bytes(buffer)?,
            Message::RequestFile(msg) => msg.write_bytes(buffer)?,
            Message::FileHeader(msg) => msg.write_bytes(buffer)?,
            Message::FileAbsent => {}
            Message::NotifyLeave(msg) => msg.write_bytes(buffer)?,
            Message::ConfirmLeave => {}
            Message::RequestPut(msg) => msg.write_bytes(buffer)?,
            Message::Unknown(_) => {}
        }

        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::identifier::Identifier;

    fn addr(port: u16) -> std::net::SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn roundtrip(msg: Message) -> Message {
        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();
        Message::parse(&buffer).unwrap()
    }

    #[test]
    fn ping_roundtrips() {
        let msg = Message::Ping(p2p::Ping { source: addr(1111) });
        match roundtrip(msg) {
            Message::Ping(p) => assert_eq!(p.source, addr(1111)),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn request_successor_roundtrips() {
        let msg = Message::RequestSuccessor(p2p::RequestSuccessor {
            source: addr(1111),
            key: Identifier::new(42),
        });
        match roundtrip(msg) {
            Message::RequestSuccessor(r) => {
                assert_eq!(r.source, addr(1111));
                assert_eq!(r.key, Identifier::new(42));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn files_list_roundtrips_empty_and_nonempty() {
        let empty = Message::FilesList(p2p::FilesList { names: vec![] });
        match roundtrip(empty) {
            Message::FilesList(f) => assert!(f.names.is_empty()),
            _ => panic!("wrong variant"),
        }

        let names = vec!["a.txt".to_string(), "b.bin".to_string()];
        let msg = Message::FilesList(p2p::FilesList { names: names.clone() });
        match roundtrip(msg) {
            Message::FilesList(f) => assert_eq!(f.names, names),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_tag_decodes_to_unknown_variant() {
        let buffer = vec![250u8];
        match Message::parse(&buffer).unwrap() {
            Message::Unknown(tag) => assert_eq!(tag, 250),
            _ => panic!("wrong variant"),
        }
    }
}
