//! Authenticated symmetric encryption of Shamir shares in transit, wrapped
//! from [sodiumoxide]'s `secretbox`.
//!
//! The combined ciphertext representation is the random nonce followed by the
//! ciphertext and its authentication tag, so a sealed message travels as a
//! single opaque byte string.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

use sodiumoxide::crypto::secretbox;

use super::kdf::SessionKey;

/// Number of additional bytes in a sealed message compared to the
/// corresponding plaintext.
pub const SEAL_OVERHEAD: usize = secretbox::NONCEBYTES + secretbox::MACBYTES;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("decryption of a message failed")]
/// An error related to the decryption of a sealed message.
///
/// Authentication failures are non-retriable; the caller decides whether to
/// treat the sender as dropped.
pub struct DecryptionError;

/// Seals a plaintext under the given session key.
///
/// A fresh random nonce is drawn for every call and prepended to the
/// ciphertext.
pub fn seal(plaintext: &[u8], key: &SessionKey) -> Vec<u8> {
    let nonce = secretbox::gen_nonce();
    let mut sealed = Vec::with_capacity(plaintext.len() + SEAL_OVERHEAD);
    sealed.extend_from_slice(nonce.as_ref());
    sealed.extend_from_slice(&secretbox::seal(plaintext, &nonce, &key.0));
    sealed
}

/// Opens a sealed message under the given session key.
///
/// # Errors
/// Fails if the message is too short to carry a nonce and tag, or if
/// authentication fails.
pub fn open(sealed: &[u8], key: &SessionKey) -> Result<Vec<u8>, DecryptionError> {
    if sealed.len() < SEAL_OVERHEAD {
        return Err(DecryptionError);
    }
    // UNWRAP_SAFE: the slice is exactly NONCEBYTES long
    let nonce = secretbox::Nonce::from_slice(&sealed[..secretbox::NONCEBYTES]).unwrap();
    secretbox::open(&sealed[secretbox::NONCEBYTES..], &nonce, &key.0).map_err(|_| DecryptionError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ByteObject;

    #[test]
    fn test_round_trip() {
        let key = SessionKey::generate();
        let sealed = seal(b"both shares", &key);
        assert_eq!(sealed.len(), b"both shares".len() + SEAL_OVERHEAD);
        assert_eq!(open(&sealed, &key).unwrap(), b"both shares");
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal(b"both shares", &SessionKey::generate());
        assert_eq!(open(&sealed, &SessionKey::generate()), Err(DecryptionError));
    }

    #[test]
    fn test_tampering_fails() {
        let key = SessionKey::generate();
        let mut sealed = seal(b"both shares", &key);
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(open(&sealed, &key), Err(DecryptionError));
    }

    #[test]
    fn test_truncated_input_fails_closed() {
        let key = SessionKey::generate();
        assert_eq!(open(&[], &key), Err(DecryptionError));
        assert_eq!(open(&[0_u8; SEAL_OVERHEAD - 1], &key), Err(DecryptionError));
    }

    #[test]
    fn test_nonces_are_fresh() {
        let key = SessionKey::generate();
        assert_ne!(seal(b"m", &key), seal(b"m", &key));
    }
}
