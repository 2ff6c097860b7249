//! The client-side protocol state machines.
//!
//! Both protocols are driven entirely by the host: it calls the phase
//! methods in order, ships the returned byte buffers over its own transport,
//! and feeds peer material back in. The objects themselves perform no I/O.
//!
//! Every protocol object is a single-owner state container. All mutating
//! operations take `&mut self`, so concurrent mutation of one session is
//! unrepresentable; a host that shares a session across tasks wraps it in its
//! own mutex. Secrets held by a session (seeds, private keys, derived
//! session keys) live exactly one aggregation round: [`BasicSecAgg::reset`]
//! erases them, and a [`SecAggPlus`] round ends when the object is dropped.

pub(crate) mod basic;
pub(crate) mod plus;

use thiserror::Error;

use crate::{message::DecodeError, sharing::ShamirError};

pub use self::{
    basic::{BasicSecAgg, Phase, SessionConfig},
    plus::{RoundConfig, SecAggPlus},
};

#[derive(Debug, Error)]
/// Errors related to driving the protocol state machines.
pub enum ProtocolError {
    #[error("wrong phase: expected {expected}, actual {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("malformed wire data: {0}")]
    MalformedWireData(DecodeError),

    #[error("no key material for peer {0}: key exchange has not happened")]
    MissingPeerKey(u32),

    #[error("failed to decrypt shares from peer {0}")]
    DecryptionFailure(u32),

    #[error("key agreement with peer {0} failed")]
    KeyAgreement(u32),

    #[error(transparent)]
    Sharing(#[from] ShamirError),

    #[error("invalid protocol configuration: {0}")]
    InvalidConfig(String),
}
