//! Custom error types
//!
//! [`MessageError`] is used whenever an unexpected message type is received
//! on a connection that expected something else. [`FileExistsError`] and
//! [`FileAbsentError`] cover the file-transfer edge cases of §4.7/§7.
//! [`JoinError`] wraps any failure of the four-step join protocol so it can
//! be reported distinctly before the process exits.

use crate::message::Message;
use std::error::Error;
use std::fmt;

/// Error type to use when an unexpected message has been received.
#[derive(Debug)]
pub struct MessageError {
    msg: Message,
}

impl MessageError {
    pub fn new(msg: Message) -> Self {
        MessageError { msg }
    }
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unexpected message type {:?}", self.msg)
    }
}

impl Error for MessageError {}

/// A `put`/file-receive was refused because the name already exists locally.
#[derive(Debug)]
pub struct FileExistsError {
    pub filename: String,
}

impl fmt::Display for FileExistsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "file '{}' already exists locally", self.filename)
    }
}

impl Error for FileExistsError {}

/// A peer answered `ABSENT` to a file request.
#[derive(Debug)]
pub struct FileAbsentError {
    pub filename: String,
}

impl fmt::Display for FileAbsentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "file '{}' does not exist on the responsible peer", self.filename)
    }
}

impl Error for FileAbsentError {}

/// The four-step join protocol (§4.5) failed; the process should exit.
#[derive(Debug)]
pub struct JoinError {
    reason: String,
}

impl JoinError {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        JoinError { reason: reason.into() }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to join the ring: {}", self.reason)
    }
}

impl Error for JoinError {}
