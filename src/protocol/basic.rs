//! The basic SecAgg client state machine.
//!
//! A session covers one aggregation round: the client draws a fresh mask
//! seed, Shamir-shares the seed with the cohort, masks its serialized model
//! update with material expanded from the seed, and finally reports which
//! peers survived so the server can reconstruct the dropped clients' seeds.
//! The phases are strictly ordered; calling an operation out of order moves
//! the session to [`Phase::Failed`] and only [`reset()`] recovers it.
//!
//! [`reset()`]: BasicSecAgg::reset

use std::{convert::TryInto, fmt};

use tracing::{debug, warn};

use crate::{
    crypto::{pseudo_rand_bytes, ByteObject, MaskSeed},
    field::FieldElement,
    message::{ShareBundle, ToBytes, UnmaskResponse},
    protocol::ProtocolError,
    sharing::share_secrets,
};

/// The phases of a basic SecAgg session, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No session is active.
    Idle,
    /// A session is active and the seed shares have not been produced yet.
    ShareKeys,
    /// Seed shares are out; the masked model update is due next.
    MaskedInput,
    /// The masked update is out; the unmask response is due next.
    Unmasking,
    /// The session ran to completion.
    Completed,
    /// An operation was called out of order; only a reset recovers.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::ShareKeys => "share keys",
            Phase::MaskedInput => "masked input",
            Phase::Unmasking => "unmasking",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// The cohort parameters of one basic SecAgg session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of seed shares required for reconstruction.
    pub threshold: u32,
    /// Number of clients in the cohort.
    pub total_clients: u32,
}

/// A basic SecAgg client session.
pub struct BasicSecAgg {
    phase: Phase,
    session_id: String,
    client_index: u32,
    config: SessionConfig,
    seed: MaskSeed,
}

impl Default for BasicSecAgg {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicSecAgg {
    /// Creates an idle client with no session state.
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            session_id: String::new(),
            client_index: 0,
            config: SessionConfig {
                threshold: 0,
                total_clients: 0,
            },
            seed: MaskSeed::zeroed(),
        }
    }

    /// Gets the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Starts a new session, drawing a fresh mask seed.
    ///
    /// # Errors
    /// Fails if a session is already active or if the configuration is
    /// inconsistent. A configuration error leaves the client idle.
    pub fn begin_session(
        &mut self,
        session_id: &str,
        client_index: u32,
        config: SessionConfig,
    ) -> Result<(), ProtocolError> {
        self.require_phase(Phase::Idle)?;
        if config.threshold == 0 || config.threshold > config.total_clients {
            return Err(ProtocolError::InvalidConfig(format!(
                "threshold {} with {} clients",
                config.threshold, config.total_clients,
            )));
        }
        if client_index == 0 || client_index > config.total_clients {
            return Err(ProtocolError::InvalidConfig(format!(
                "client index {} with {} clients",
                client_index, config.total_clients,
            )));
        }

        self.session_id = session_id.to_string();
        self.client_index = client_index;
        self.config = config;
        self.seed = MaskSeed::generate();
        self.phase = Phase::ShareKeys;
        debug!(
            session_id = %self.session_id,
            client_index,
            "session started"
        );
        Ok(())
    }

    /// Shamir-shares the mask seed for the cohort.
    ///
    /// The seed is split into eight 32-bit big-endian chunks and every chunk
    /// is shared independently. The returned buffer is the serialized share
    /// bundle, with one share list per cohort participant.
    ///
    /// # Errors
    /// Fails if called out of order.
    pub fn generate_key_shares(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.require_phase(Phase::ShareKeys)?;

        let chunks = self
            .seed
            .as_array()
            .chunks_exact(4)
            // UNWRAP_SAFE: chunks_exact yields slices of exactly 4 bytes
            .map(|chunk| FieldElement::from(u32::from_be_bytes(chunk.try_into().unwrap())))
            .collect::<Vec<_>>();
        let lists = share_secrets(&chunks, self.config.threshold, self.config.total_clients)?;

        self.phase = Phase::MaskedInput;
        debug!(session_id = %self.session_id, "seed shares generated");
        Ok(ShareBundle(lists).to_vec())
    }

    /// Masks a serialized model update with material expanded from the seed.
    ///
    /// The update is split into 4-byte big-endian chunks, zero-padded at the
    /// end. Each chunk is lifted into the field, one mask element is added,
    /// and the sum is narrowed back to its low 32 bits, so the masked update
    /// has the chunk-aligned length of the input.
    ///
    /// # Errors
    /// Fails if called out of order.
    pub fn mask_model_update(&mut self, weights: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        self.require_phase(Phase::MaskedInput)?;

        let chunk_count = (weights.len() + 3) / 4;
        let mask = pseudo_rand_bytes(self.seed.as_slice(), chunk_count * FieldElement::LENGTH);
        let mut masked = Vec::with_capacity(chunk_count * 4);
        for (chunk, mask_bytes) in weights.chunks(4).zip(mask.chunks(FieldElement::LENGTH)) {
            let mut word = [0_u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let weight = FieldElement::from(u32::from_be_bytes(word));
            // UNWRAP_SAFE: mask chunks are exactly LENGTH bytes
            let mask = FieldElement::from_bytes_reduced(mask_bytes.try_into().unwrap());
            masked.extend_from_slice(&((weight + mask).value() as u32).to_be_bytes());
        }

        self.phase = Phase::Unmasking;
        debug!(
            session_id = %self.session_id,
            chunks = chunk_count,
            "model update masked"
        );
        Ok(masked)
    }

    /// Reports the surviving cohort for the unmasking round.
    ///
    /// The returned buffer is the serialized unmask response, carrying the
    /// survivor count and this client's own index. The server pairs it with
    /// the seed shares it already holds.
    ///
    /// # Errors
    /// Fails if called out of order.
    pub fn provide_unmasking_shares(&mut self, dropped: &[u32]) -> Result<Vec<u8>, ProtocolError> {
        self.require_phase(Phase::Unmasking)?;

        let response = UnmaskResponse {
            survivor_count: self.config.total_clients.saturating_sub(dropped.len() as u32),
            own_index: self.client_index,
        };
        self.phase = Phase::Completed;
        debug!(
            session_id = %self.session_id,
            survivors = response.survivor_count,
            "session completed"
        );
        Ok(response.to_vec())
    }

    /// Erases all session state and returns the client to idle.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.session_id.clear();
        self.client_index = 0;
        self.config = SessionConfig {
            threshold: 0,
            total_clients: 0,
        };
        self.seed = MaskSeed::zeroed();
    }

    fn require_phase(&mut self, expected: Phase) -> Result<(), ProtocolError> {
        if self.phase == expected {
            return Ok(());
        }
        let actual = self.phase;
        warn!(
            session_id = %self.session_id,
            %expected,
            %actual,
            "operation called out of order"
        );
        self.phase = Phase::Failed;
        Err(ProtocolError::WrongPhase { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use super::*;
    use crate::{
        message::FromBytes,
        sharing::reconstruct_secrets,
    };

    /// Number of field elements the 32-byte mask seed is split into.
    const SEED_CHUNKS: usize = MaskSeed::LENGTH / 4;

    const CONFIG: SessionConfig = SessionConfig {
        threshold: 3,
        total_clients: 5,
    };

    fn active_client() -> BasicSecAgg {
        let mut client = BasicSecAgg::new();
        client.begin_session("round-7", 2, CONFIG).unwrap();
        client
    }

    #[test]
    fn test_happy_path_phases() {
        let mut client = BasicSecAgg::new();
        assert_eq!(client.phase(), Phase::Idle);
        client.begin_session("round-7", 2, CONFIG).unwrap();
        assert_eq!(client.phase(), Phase::ShareKeys);
        client.generate_key_shares().unwrap();
        assert_eq!(client.phase(), Phase::MaskedInput);
        client.mask_model_update(&[0x01, 0x02]).unwrap();
        assert_eq!(client.phase(), Phase::Unmasking);
        client.provide_unmasking_shares(&[4]).unwrap();
        assert_eq!(client.phase(), Phase::Completed);
    }

    #[test]
    fn test_out_of_order_call_fails_the_session() {
        let mut client = BasicSecAgg::new();
        let err = client.generate_key_shares().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::WrongPhase {
                expected: Phase::ShareKeys,
                actual: Phase::Idle,
            }
        ));
        assert_eq!(client.phase(), Phase::Failed);
        // a failed session rejects everything until it is reset
        assert!(client.begin_session("round-7", 2, CONFIG).is_err());
        client.reset();
        assert_eq!(client.phase(), Phase::Idle);
        client.begin_session("round-8", 2, CONFIG).unwrap();
    }

    #[test]
    fn test_invalid_config_leaves_the_client_idle() {
        let mut client = BasicSecAgg::new();
        let zero_threshold = SessionConfig {
            threshold: 0,
            total_clients: 5,
        };
        assert!(matches!(
            client.begin_session("round-7", 2, zero_threshold),
            Err(ProtocolError::InvalidConfig(_))
        ));
        let index_out_of_range = client.begin_session("round-7", 6, CONFIG);
        assert!(matches!(
            index_out_of_range,
            Err(ProtocolError::InvalidConfig(_))
        ));
        assert_eq!(client.phase(), Phase::Idle);
    }

    #[test]
    fn test_key_shares_reconstruct_the_seed() {
        let mut client = active_client();
        let bytes = client.generate_key_shares().unwrap();
        let bundle = ShareBundle::from_bytes(&bytes).unwrap();
        assert_eq!(bundle.0.len(), 5);

        let chunks = reconstruct_secrets(&bundle.0[..3], CONFIG.threshold).unwrap();
        assert_eq!(chunks.len(), SEED_CHUNKS);
        for (chunk, seed_bytes) in chunks.iter().zip(client.seed.as_array().chunks_exact(4)) {
            let expected = u32::from_be_bytes(seed_bytes.try_into().unwrap());
            assert_eq!(chunk.value(), expected as u128);
        }
    }

    #[test]
    fn test_masking_pads_and_narrows_chunks() {
        let mut client = active_client();
        client.generate_key_shares().unwrap();
        let masked = client.mask_model_update(&[0x01, 0x02, 0x03, 0x04, 0x05]).unwrap();
        assert_eq!(masked.len(), 8);

        let mask = pseudo_rand_bytes(client.seed.as_slice(), 2 * FieldElement::LENGTH);
        let expected = [0x0102_0304_u32, 0x0500_0000]
            .iter()
            .zip(mask.chunks(FieldElement::LENGTH))
            .flat_map(|(&word, mask_bytes)| {
                let mask = FieldElement::from_bytes_reduced(mask_bytes.try_into().unwrap());
                let masked = FieldElement::from(word) + mask;
                (masked.value() as u32).to_be_bytes().to_vec()
            })
            .collect::<Vec<_>>();
        assert_eq!(masked, expected);
    }

    #[test]
    fn test_empty_update_masks_to_empty() {
        let mut client = active_client();
        client.generate_key_shares().unwrap();
        assert_eq!(client.mask_model_update(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_unmask_response_counts_survivors() {
        let mut client = active_client();
        client.generate_key_shares().unwrap();
        client.mask_model_update(&[0xff]).unwrap();
        let bytes = client.provide_unmasking_shares(&[1, 4]).unwrap();
        assert_eq!(
            UnmaskResponse::from_bytes(&bytes).unwrap(),
            UnmaskResponse {
                survivor_count: 3,
                own_index: 2,
            }
        );
    }

    #[test]
    fn test_reset_erases_the_seed() {
        let mut client = active_client();
        assert_ne!(client.seed, MaskSeed::zeroed());
        client.reset();
        assert_eq!(client.seed, MaskSeed::zeroed());
        assert_eq!(client.phase(), Phase::Idle);
    }
}
