//! Client-side cryptography for the SecAgg and SecAgg+ secure aggregation
//! protocols used in federated learning.
//!
//! A cohort of clients masks its model updates so that the aggregation
//! server learns only the sum of the cohort, never an individual update.
//! This crate implements everything a client needs for that, and nothing a
//! server or transport needs: the arithmetic, the key handling, the wire
//! formats and the per-round state machines. All operations are pure,
//! synchronous computations; the host application moves the produced byte
//! buffers between cohort members.
//!
//! - [`field`]: arithmetic in `Z/pZ` with the Mersenne prime `p = 2^127 - 1`.
//! - [`sharing`]: Shamir secret sharing over that field.
//! - [`quantize`]: stochastic quantization of floating point model weights.
//! - [`crypto`]: key agreement, key derivation, mask expansion and share
//!   encryption.
//! - [`message`]: the big-endian wire formats.
//! - [`protocol`]: the [`BasicSecAgg`] and [`SecAggPlus`] state machines.
//!
//! The original protocols are described in [Bonawitz et al. 2017] and
//! [Bell et al. 2020].
//!
//! [Bonawitz et al. 2017]: https://eprint.iacr.org/2017/281
//! [Bell et al. 2020]: https://eprint.iacr.org/2020/704

pub mod crypto;
pub mod field;
pub mod message;
pub mod protocol;
pub mod quantize;
pub mod sharing;

pub use self::{
    field::FieldElement,
    protocol::{BasicSecAgg, Phase, ProtocolError, RoundConfig, SecAggPlus, SessionConfig},
    quantize::Quantizer,
    sharing::{reconstruct_secrets, share_secrets, ShamirError, ShamirShare},
};
