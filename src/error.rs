// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Every fallible public entry point in this crate returns [`Result<T>`].
//! Internal recoverable conditions (retryable allocation, a discarded
//! malformed submessage) are signalled through typed return values rather
//! than through this enum or through panics.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by the RTPS engine.
#[derive(Debug)]
pub enum Error {
    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------
    /// A QoS policy value is invalid on its own terms (e.g. `KeepLast(0)`).
    InvalidQos(String),
    /// Two QoS policies requested/offered are mutually incompatible.
    QosIncompatible,
    /// A config profile file could not be found.
    ConfigFileNotFound(String),
    /// A config profile file could not be parsed.
    ConfigParseError(String),

    // ------------------------------------------------------------------
    // Entities / state
    // ------------------------------------------------------------------
    /// Domain id outside the valid RTPS range (0-232).
    InvalidDomainId(u32),
    /// Participant id outside the valid RTPS range (0-119).
    InvalidParticipantId(u8),
    /// No unused participant id was found while auto-assigning RTPS ports.
    NoAvailableParticipantId,
    /// Operation attempted on an entity in the wrong lifecycle state.
    InvalidState(String),
    /// Entity already deleted.
    AlreadyDeleted,
    /// Precondition for the operation was not met.
    PreconditionNotMet(String),
    /// Requested entity was not found (by GUID, handle, or name).
    NotFound,

    // ------------------------------------------------------------------
    // Transport / wire
    // ------------------------------------------------------------------
    /// Generic I/O error with underlying cause.
    Io(std::io::Error),
    /// Socket bind failed.
    BindFailed(String),
    /// Multicast group join failed.
    MulticastJoinFailed(String),
    /// Send to a locator failed.
    SendFailed(String),
    /// A received submessage could not be parsed; payload is discarded.
    MalformedSubmessage(&'static str),
    /// CDR encode/decode failed.
    SerializationError(String),
    /// Encode target buffer too small.
    BufferTooSmall,

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------
    /// History cache resource limit exceeded (samples/instances/bytes).
    OutOfResources(&'static str),
    /// Operation would block under a non-blocking resource-limited path.
    WouldBlock,
    /// Operation did not complete before its deadline.
    Timeout,

    // ------------------------------------------------------------------
    // Security / misc
    // ------------------------------------------------------------------
    /// Security policy denied the operation.
    AccessDenied(String),
    /// Requested feature is not supported by this build.
    Unsupported(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidQos(msg) => write!(f, "invalid QoS: {msg}"),
            Error::QosIncompatible => write!(f, "QoS incompatible between offered and requested"),
            Error::ConfigFileNotFound(path) => write!(f, "config file not found: {path}"),
            Error::ConfigParseError(msg) => write!(f, "config parse error: {msg}"),
            Error::InvalidDomainId(id) => write!(f, "invalid domain_id: {id} (must be 0-232)"),
            Error::InvalidParticipantId(id) => write!(f, "invalid participant_id: {id} (must be 0-119)"),
            Error::NoAvailableParticipantId => write!(f, "no unused participant_id available (0-119 all taken)"),
            Error::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Error::AlreadyDeleted => write!(f, "entity already deleted"),
            Error::PreconditionNotMet(msg) => write!(f, "precondition not met: {msg}"),
            Error::NotFound => write!(f, "entity not found"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::BindFailed(msg) => write!(f, "bind failed: {msg}"),
            Error::MulticastJoinFailed(msg) => write!(f, "multicast join failed: {msg}"),
            Error::SendFailed(msg) => write!(f, "send failed: {msg}"),
            Error::MalformedSubmessage(what) => write!(f, "malformed submessage: {what}"),
            Error::SerializationError(msg) => write!(f, "CDR error: {msg}"),
            Error::BufferTooSmall => write!(f, "buffer too small for encoding"),
            Error::OutOfResources(what) => write!(f, "resource limit exceeded: {what}"),
            Error::WouldBlock => write!(f, "operation would block"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::AccessDenied(msg) => write!(f, "access denied: {msg}"),
            Error::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
