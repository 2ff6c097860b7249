//! The SecAgg+ client state machine.
//!
//! One [`SecAggPlus`] instance covers one aggregation round and walks four
//! stages, each driven by the host:
//!
//! 1. **Setup**: the client generates two X25519 key pairs, one whose shared
//!    secrets seed the pairwise masks and one whose shared secrets encrypt
//!    Shamir shares in transit, and publishes both public keys.
//! 2. **Share keys**: the client Shamir-shares its self-mask seed and its
//!    pairwise secret key, seals the pair of shares destined for each peer
//!    under the session key agreed with that peer, and collects the sealed
//!    pairs addressed to itself.
//! 3. **Masked input**: the model update is quantized, a self-mask expanded
//!    from the seed is added, and one pairwise mask per peer is added or
//!    subtracted depending on the index order, so the pairwise masks cancel
//!    in the server's sum.
//! 4. **Unmasking**: for each surviving peer the client reveals its share of
//!    that peer's seed, and for each dropped peer its share of that peer's
//!    pairwise secret key, letting the server strip the leftover masks.
//!
//! Unlike the basic protocol there is no explicit phase tag: each stage
//! fails with [`ProtocolError::MissingPeerKey`] when the material an earlier
//! stage should have delivered is absent.

use std::{collections::HashMap, convert::TryInto};

use rand::rngs::OsRng;
use tracing::{debug, warn};

use crate::{
    crypto::{
        kdf::{self, PAIRWISE_MASK_CONTEXT, SHARE_ENCRYPTION_CONTEXT},
        pseudo_rand_gen, seal, AgreementKeyPair, ByteObject, MaskSeed, PublicAgreementKey,
        SessionKey,
    },
    field::FieldElement,
    message::{EncryptedSharePair, FromBytes, ToBytes},
    protocol::ProtocolError,
    quantize::Quantizer,
    sharing::{share_secrets, ShamirShare},
};

/// The round parameters of one SecAgg+ client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundConfig {
    /// Number of shares required to reconstruct a dropped client's secrets.
    pub threshold: u32,
    /// Number of clients in the cohort.
    pub total_clients: u32,
    /// This client's index in `[1, total_clients]`.
    pub client_index: u32,
    /// Symmetric clipping bound for quantization.
    pub clipping_range: f64,
    /// Number of quantization steps.
    pub target_range: u64,
    /// Modulus of the masked-weight arithmetic.
    pub mod_range: u64,
}

/// A SecAgg+ client for a single aggregation round.
pub struct SecAggPlus {
    config: RoundConfig,
    quantizer: Quantizer,
    /// Key pair whose shared secrets seed the pairwise masks.
    mask_keys: AgreementKeyPair,
    /// Key pair whose shared secrets encrypt shares in transit.
    share_keys: AgreementKeyPair,
    /// Seed of this client's self-mask.
    rd_seed: MaskSeed,
    peer_mask_keys: HashMap<u32, PublicAgreementKey>,
    session_keys: HashMap<u32, SessionKey>,
    own_rd_share: Option<ShamirShare>,
    own_sk1_share: Option<ShamirShare>,
    received_rd_shares: HashMap<u32, ShamirShare>,
    received_sk1_shares: HashMap<u32, ShamirShare>,
}

impl SecAggPlus {
    /// Creates a client for a new round, drawing fresh key pairs and a fresh
    /// self-mask seed.
    ///
    /// # Errors
    /// Fails if the cohort parameters are inconsistent or the quantization
    /// parameters are out of range.
    pub fn new(config: RoundConfig) -> Result<Self, ProtocolError> {
        if config.threshold == 0 || config.threshold > config.total_clients {
            return Err(ProtocolError::InvalidConfig(format!(
                "threshold {} with {} clients",
                config.threshold, config.total_clients,
            )));
        }
        if config.client_index == 0 || config.client_index > config.total_clients {
            return Err(ProtocolError::InvalidConfig(format!(
                "client index {} with {} clients",
                config.client_index, config.total_clients,
            )));
        }
        if config.mod_range < config.target_range {
            return Err(ProtocolError::InvalidConfig(format!(
                "mod range {} below target range {}",
                config.mod_range, config.target_range,
            )));
        }
        let quantizer = Quantizer::new(config.clipping_range, config.target_range)
            .ok_or_else(|| {
                ProtocolError::InvalidConfig(format!(
                    "clipping range {} with target range {}",
                    config.clipping_range, config.target_range,
                ))
            })?;

        debug!(client_index = config.client_index, "round state initialized");
        Ok(Self {
            config,
            quantizer,
            mask_keys: AgreementKeyPair::generate(),
            share_keys: AgreementKeyPair::generate(),
            rd_seed: MaskSeed::generate(),
            peer_mask_keys: HashMap::new(),
            session_keys: HashMap::new(),
            own_rd_share: None,
            own_sk1_share: None,
            received_rd_shares: HashMap::new(),
            received_sk1_shares: HashMap::new(),
        })
    }

    /// Gets the public keys to publish: the pairwise-mask key first, the
    /// share-encryption key second.
    pub fn public_keys(&self) -> (PublicAgreementKey, PublicAgreementKey) {
        (self.mask_keys.public.clone(), self.share_keys.public.clone())
    }

    /// Ingests the cohort's public keys, keyed by client index.
    ///
    /// For every peer the share-encryption session key is agreed and derived
    /// immediately; the pairwise-mask key is kept for the masking stage. This
    /// client's own entry is ignored.
    ///
    /// # Errors
    /// Fails if a peer's share-encryption key is rejected by the key
    /// agreement, e.g. a low-order point.
    pub fn receive_peer_public_keys(
        &mut self,
        keys: &HashMap<u32, (PublicAgreementKey, PublicAgreementKey)>,
    ) -> Result<(), ProtocolError> {
        for (&index, (mask_key, share_key)) in keys {
            if index == self.config.client_index {
                continue;
            }
            let shared = self
                .share_keys
                .secret
                .agree(share_key)
                .map_err(|_| ProtocolError::KeyAgreement(index))?;
            self.session_keys
                .insert(index, kdf::derive_key(&shared, SHARE_ENCRYPTION_CONTEXT));
            self.peer_mask_keys.insert(index, mask_key.clone());
        }
        debug!(
            client_index = self.config.client_index,
            peers = self.session_keys.len(),
            "peer keys ingested"
        );
        Ok(())
    }

    /// Shamir-shares the self-mask seed and the pairwise secret key, sealing
    /// the pair of shares destined for each peer under that peer's session
    /// key.
    ///
    /// Both secrets enter the sharing as one field element each, folded from
    /// their leading 16 bytes. The returned map is keyed by recipient index;
    /// this client's own shares are retained for the unmasking stage.
    ///
    /// # Errors
    /// Fails if a peer's session key is missing, i.e. the key exchange did
    /// not cover the full cohort.
    pub fn generate_encrypted_shares(
        &mut self,
    ) -> Result<HashMap<u32, Vec<u8>>, ProtocolError> {
        // UNWRAP_SAFE: the seed and the scalar are 32 bytes long
        let rd_secret =
            FieldElement::from_bytes_reduced(self.rd_seed.as_slice()[..16].try_into().unwrap());
        let sk1_secret = FieldElement::from_bytes_reduced(
            self.mask_keys.secret.as_slice()[..16].try_into().unwrap(),
        );
        let rd_lists = share_secrets(
            &[rd_secret],
            self.config.threshold,
            self.config.total_clients,
        )?;
        let sk1_lists = share_secrets(
            &[sk1_secret],
            self.config.threshold,
            self.config.total_clients,
        )?;

        let mut sealed_pairs = HashMap::new();
        for index in 1..=self.config.total_clients {
            let pair = EncryptedSharePair {
                rd_share: rd_lists[index as usize - 1][0],
                sk1_share: sk1_lists[index as usize - 1][0],
            };
            if index == self.config.client_index {
                self.own_rd_share = Some(pair.rd_share);
                self.own_sk1_share = Some(pair.sk1_share);
                continue;
            }
            let key = self
                .session_keys
                .get(&index)
                .ok_or(ProtocolError::MissingPeerKey(index))?;
            sealed_pairs.insert(index, seal::seal(&pair.to_vec(), key));
        }
        debug!(
            client_index = self.config.client_index,
            recipients = sealed_pairs.len(),
            "share pairs sealed"
        );
        Ok(sealed_pairs)
    }

    /// Ingests the sealed share pairs addressed to this client, keyed by
    /// sender index.
    ///
    /// # Errors
    /// Fails if a sender's session key is missing, if a sealed pair does not
    /// authenticate under it, or if the decrypted plaintext is malformed.
    pub fn receive_encrypted_shares(
        &mut self,
        sealed_pairs: &HashMap<u32, Vec<u8>>,
    ) -> Result<(), ProtocolError> {
        for (&sender, sealed) in sealed_pairs {
            let key = self
                .session_keys
                .get(&sender)
                .ok_or(ProtocolError::MissingPeerKey(sender))?;
            let plaintext = seal::open(sealed, key)
                .map_err(|_| ProtocolError::DecryptionFailure(sender))?;
            let pair = EncryptedSharePair::from_bytes(&plaintext)
                .map_err(ProtocolError::MalformedWireData)?;
            self.received_rd_shares.insert(sender, pair.rd_share);
            self.received_sk1_shares.insert(sender, pair.sk1_share);
        }
        debug!(
            client_index = self.config.client_index,
            senders = self.received_rd_shares.len(),
            "share pairs ingested"
        );
        Ok(())
    }

    /// Quantizes and masks a model update.
    ///
    /// Each value is masked with one element of the self-mask and one element
    /// of every pairwise mask; a pairwise mask is added for peers with a
    /// smaller index and subtracted for peers with a larger one, so the
    /// pairwise contributions cancel when the server sums the cohort. All
    /// arithmetic is mod the configured range.
    ///
    /// # Errors
    /// Fails if a peer's pairwise-mask key is missing or rejected by the key
    /// agreement.
    pub fn mask_model_update(&self, values: &[f64]) -> Result<Vec<u64>, ProtocolError> {
        let modulus = self.config.mod_range as u128;
        let mut masked: Vec<u64> = self
            .quantizer
            .quantize(values, &mut OsRng)
            .iter()
            .map(|&value| (value as u128 % modulus) as u64)
            .collect();

        let self_mask = pseudo_rand_gen(
            self.rd_seed.as_slice(),
            self.config.mod_range,
            masked.len(),
        );
        for (value, mask) in masked.iter_mut().zip(&self_mask) {
            *value = ((*value as u128 + *mask as u128) % modulus) as u64;
        }

        for peer in 1..=self.config.total_clients {
            if peer == self.config.client_index {
                continue;
            }
            let peer_key = self
                .peer_mask_keys
                .get(&peer)
                .ok_or(ProtocolError::MissingPeerKey(peer))?;
            let shared = self
                .mask_keys
                .secret
                .agree(peer_key)
                .map_err(|_| ProtocolError::KeyAgreement(peer))?;
            let pairwise_seed = kdf::derive_key(&shared, PAIRWISE_MASK_CONTEXT);
            let pairwise_mask = pseudo_rand_gen(
                pairwise_seed.as_slice(),
                self.config.mod_range,
                masked.len(),
            );
            for (value, mask) in masked.iter_mut().zip(&pairwise_mask) {
                *value = if self.config.client_index > peer {
                    ((*value as u128 + *mask as u128) % modulus) as u64
                } else {
                    ((*value as u128 + modulus - *mask as u128) % modulus) as u64
                };
            }
        }

        debug!(
            client_index = self.config.client_index,
            values = masked.len(),
            "model update masked"
        );
        Ok(masked)
    }

    /// Reveals the unmasking shares for the survivor and dropout sets.
    ///
    /// For each active client the revealed share belongs to that client's
    /// self-mask seed; for each dropped client, to its pairwise secret key.
    /// The result pairs each index with the serialized share. Indices whose
    /// shares never arrived are skipped with a warning, as is this client's
    /// own index in the dropout set.
    pub fn unmask(&self, active: &[u32], dropped: &[u32]) -> Vec<(u32, Vec<u8>)> {
        let mut revealed = Vec::with_capacity(active.len() + dropped.len());
        for &index in active {
            let share = if index == self.config.client_index {
                self.own_rd_share.as_ref()
            } else {
                self.received_rd_shares.get(&index)
            };
            match share {
                Some(share) => revealed.push((index, share.to_vec())),
                None => warn!(index, "no seed share for active client"),
            }
        }
        for &index in dropped {
            if index == self.config.client_index {
                warn!(index, "own index reported as dropped");
                continue;
            }
            match self.received_sk1_shares.get(&index) {
                Some(share) => revealed.push((index, share.to_vec())),
                None => warn!(index, "no key share for dropped client"),
            }
        }
        debug!(
            client_index = self.config.client_index,
            shares = revealed.len(),
            "unmasking shares revealed"
        );
        revealed
    }
}
