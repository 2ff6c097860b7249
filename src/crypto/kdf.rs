//! Session-key derivation with HKDF-SHA256.
//!
//! A raw X25519 shared secret is not uniform enough to use as a symmetric key
//! directly; it is fed through HKDF with an empty salt and a protocol context
//! string. The two context strings below keep the share-encryption keys and
//! the pairwise-mask keys in separate derivation domains even though both
//! come from the same curve.

use derive_more::{AsMut, AsRef};
use hkdf::Hkdf;
use sha2::Sha256;
use sodiumoxide::crypto::secretbox;

use super::{agree::SharedSecret, ByteObject};

/// Derivation context for the keys that encrypt Shamir shares in transit.
pub const SHARE_ENCRYPTION_CONTEXT: &[u8] = b"secagg-share-encryption";

/// Derivation context for the seeds of the pairwise masks.
pub const PAIRWISE_MASK_CONTEXT: &[u8] = b"secagg-pairwise-mask";

#[derive(AsRef, AsMut, Eq, PartialEq, Clone, Debug)]
/// A 256-bit symmetric session key derived from a shared secret.
///
/// Doubles as the seed of a pairwise mask. When this goes out of scope, its
/// contents will be zeroed out.
pub struct SessionKey(pub(super) secretbox::Key);

impl ByteObject for SessionKey {
    const LENGTH: usize = secretbox::KEYBYTES;

    fn zeroed() -> Self {
        Self(secretbox::Key([0_u8; secretbox::KEYBYTES]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        secretbox::Key::from_slice(bytes).map(Self)
    }
}

/// Derives a session key from a shared secret and a derivation context.
///
/// HKDF-SHA256 with an empty salt; `context` is the HKDF info string.
pub fn derive_key(secret: &SharedSecret, context: &[u8]) -> SessionKey {
    let hkdf = Hkdf::<Sha256>::new(None, secret.as_slice());
    let mut key = [0_u8; SessionKey::LENGTH];
    // UNWRAP_SAFE: 32 bytes is a valid HKDF-SHA256 output length
    hkdf.expand(context, &mut key).unwrap();
    // UNWRAP_SAFE: length of slice is guaranteed by constants
    SessionKey::from_slice_unchecked(&key)
}
