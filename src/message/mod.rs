//! Wire formats of the secure aggregation protocols.
//!
//! All integers are big-endian and every length field is validated before it
//! is used, so decoding fails closed on truncated or inconsistent input
//! instead of reading past buffer bounds. The formats are:
//!
//! - **Share**: `[u32 index][u32 value_len][value bytes]`; field-element
//!   values serialize as 16 big-endian bytes.
//! - **Share bundle**: `[u32 participant_count]`, then per participant
//!   `[u32 share_count]` followed by that participant's shares.
//! - **Unmask response** (basic protocol): `[u32 survivor_count][u32 own_index]`.
//! - **Encrypted share pair** (SecAgg+ pre-seal plaintext):
//!   `[u32 rd_share_len][rd_share][sk1_share]`.

pub(crate) mod bundle;
pub(crate) mod share;
pub(crate) mod traits;

pub use self::{
    bundle::{EncryptedSharePair, ShareBundle, UnmaskResponse},
    traits::{FromBytes, ToBytes},
};

/// An error that signals a failure when trying to parse wire data.
///
/// This is kept generic on purpose to not reveal to the sender what
/// specifically failed during parsing.
pub type DecodeError = anyhow::Error;
