//! X25519 key agreement, wrapped from [sodiumoxide].
//!
//! Each SecAgg+ participant carries two independent agreement key pairs: one
//! whose shared secrets seed the pairwise masks, and one whose shared secrets
//! encrypt Shamir shares in transit. Both are plain Curve25519 scalar
//! multiplications.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

use derive_more::{AsMut, AsRef, From};
use serde::{Deserialize, Serialize};
use sodiumoxide::crypto::scalarmult::{self, GroupElement, Scalar};

use super::ByteObject;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("key agreement produced an invalid shared secret")]
/// An error related to a rejected key agreement, e.g. on a low-order public
/// key.
pub struct KeyAgreementError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// An `X25519` key pair for key agreement.
pub struct AgreementKeyPair {
    /// The public key, distributed out of band by the transport.
    pub public: PublicAgreementKey,
    /// The secret scalar.
    pub secret: SecretAgreementKey,
}

impl AgreementKeyPair {
    /// Generates a new random `X25519` key pair.
    pub fn generate() -> Self {
        let secret = SecretAgreementKey::generate();
        let public = secret.public_key();
        Self { public, secret }
    }
}

#[derive(AsRef, AsMut, From, Serialize, Deserialize, Eq, PartialEq, Clone, Debug)]
/// An `X25519` public key for key agreement.
pub struct PublicAgreementKey(GroupElement);

impl ByteObject for PublicAgreementKey {
    const LENGTH: usize = scalarmult::GROUPELEMENTBYTES;

    fn zeroed() -> Self {
        Self(GroupElement([0_u8; scalarmult::GROUPELEMENTBYTES]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        GroupElement::from_slice(bytes).map(Self)
    }
}

#[derive(AsRef, AsMut, From, Serialize, Deserialize, Eq, PartialEq, Clone, Debug)]
/// An `X25519` secret key for key agreement.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SecretAgreementKey(Scalar);

impl ByteObject for SecretAgreementKey {
    const LENGTH: usize = scalarmult::SCALARBYTES;

    fn zeroed() -> Self {
        Self(Scalar([0_u8; scalarmult::SCALARBYTES]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        Scalar::from_slice(bytes).map(Self)
    }
}

impl SecretAgreementKey {
    /// Computes the corresponding public key for this secret key.
    pub fn public_key(&self) -> PublicAgreementKey {
        PublicAgreementKey(scalarmult::scalarmult_base(&self.0))
    }

    /// Computes the shared secret with a peer's public key.
    ///
    /// # Errors
    /// Fails if the peer's public key is rejected by the scalar
    /// multiplication.
    pub fn agree(&self, peer: &PublicAgreementKey) -> Result<SharedSecret, KeyAgreementError> {
        scalarmult::scalarmult(&self.0, &peer.0)
            .map(SharedSecret)
            .map_err(|_| KeyAgreementError)
    }
}

#[derive(AsRef, Eq, PartialEq, Clone, Debug)]
/// An `X25519` shared secret, the input keying material for the session-key
/// derivation.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SharedSecret(GroupElement);

impl SharedSecret {
    /// Gets the shared secret byte representation.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_is_symmetric() {
        let ours = AgreementKeyPair::generate();
        let theirs = AgreementKeyPair::generate();
        let a = ours.secret.agree(&theirs.public).unwrap();
        let b = theirs.secret.agree(&ours.public).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_pairs_disagree() {
        let ours = AgreementKeyPair::generate();
        let theirs = AgreementKeyPair::generate();
        let other = AgreementKeyPair::generate();
        let a = ours.secret.agree(&theirs.public).unwrap();
        let b = ours.secret.agree(&other.public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_public_key_round_trip() {
        let pair = AgreementKeyPair::generate();
        let bytes = pair.public.as_slice().to_vec();
        assert_eq!(bytes.len(), PublicAgreementKey::LENGTH);
        assert_eq!(
            PublicAgreementKey::from_slice(&bytes),
            Some(pair.public)
        );
        assert_eq!(PublicAgreementKey::from_slice(&bytes[1..]), None);
    }
}
