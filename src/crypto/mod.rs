//! Wrappers around the external cryptographic primitives the protocols
//! consume.
//!
//! All primitives are invoked as pure, synchronous calls with no I/O:
//! X25519 key agreement and the system CSPRNG come from [sodiumoxide], the
//! deterministic mask expansion is SHA-256 in counter mode, session keys are
//! derived with HKDF-SHA256, and peer shares are sealed with an authenticated
//! symmetric cipher.
//!
//! # Examples
//! ## Key agreement and share encryption
//! ```
//! # use secagg_core::crypto::{kdf, seal, AgreementKeyPair};
//! let alice = AgreementKeyPair::generate();
//! let bob = AgreementKeyPair::generate();
//!
//! let key_a = kdf::derive_key(
//!     &alice.secret.agree(&bob.public).unwrap(),
//!     kdf::SHARE_ENCRYPTION_CONTEXT,
//! );
//! let key_b = kdf::derive_key(
//!     &bob.secret.agree(&alice.public).unwrap(),
//!     kdf::SHARE_ENCRYPTION_CONTEXT,
//! );
//!
//! let sealed = seal::seal(b"share material", &key_a);
//! assert_eq!(seal::open(&sealed, &key_b).unwrap(), b"share material");
//! ```
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

pub(crate) mod agree;
pub(crate) mod hash;
pub mod kdf;
pub(crate) mod prng;
pub mod seal;

use derive_more::{AsMut, AsRef};
use sodiumoxide::{crypto::box_, randombytes::randombytes};

pub use self::{
    agree::{AgreementKeyPair, KeyAgreementError, PublicAgreementKey, SecretAgreementKey},
    hash::Sha256,
    kdf::SessionKey,
    prng::{pseudo_rand_bytes, pseudo_rand_gen},
    seal::DecryptionError,
};

/// An interface for slicing into cryptographic byte objects.
pub trait ByteObject: Sized {
    /// Length in bytes of this object.
    const LENGTH: usize;

    /// Creates a new object with all the bytes initialized to `0`.
    fn zeroed() -> Self;

    /// Gets the object byte representation.
    fn as_slice(&self) -> &[u8];

    /// Creates an object from the given buffer.
    ///
    /// # Errors
    /// Returns `None` if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice(bytes: &[u8]) -> Option<Self>;

    /// Creates an object from the given buffer.
    ///
    /// # Panics
    /// Panics if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice_unchecked(bytes: &[u8]) -> Self {
        Self::from_slice(bytes).unwrap()
    }

    /// Generates an object with random bytes from the system CSPRNG.
    fn generate() -> Self {
        // safe unwrap: length of slice is guaranteed by constants
        Self::from_slice_unchecked(randombytes(Self::LENGTH).as_slice())
    }
}

#[derive(AsRef, AsMut, Clone, Debug, PartialEq, Eq)]
/// A 32-byte seed from which a client expands its self-mask.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct MaskSeed(box_::Seed);

impl ByteObject for MaskSeed {
    const LENGTH: usize = box_::SEEDBYTES;

    fn zeroed() -> Self {
        Self(box_::Seed([0_u8; Self::LENGTH]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        box_::Seed::from_slice(bytes).map(Self)
    }
}

impl MaskSeed {
    /// Gets this seed as an array.
    pub fn as_array(&self) -> [u8; Self::LENGTH] {
        (self.0).0
    }
}
