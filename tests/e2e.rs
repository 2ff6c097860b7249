//! End-to-end flows over the public API, with the test driving the role of
//! the transport and parts of the aggregation server.

use std::collections::HashMap;

use secagg_core::{
    crypto::{seal::SEAL_OVERHEAD, PublicAgreementKey},
    message::{FromBytes, ShareBundle, UnmaskResponse},
    reconstruct_secrets, BasicSecAgg, Phase, ProtocolError, RoundConfig, SecAggPlus,
    SessionConfig, ShamirShare,
};

const COHORT: u32 = 5;
const THRESHOLD: u32 = 3;

fn basic_cohort() -> Vec<BasicSecAgg> {
    let config = SessionConfig {
        threshold: THRESHOLD,
        total_clients: COHORT,
    };
    (1..=COHORT)
        .map(|index| {
            let mut client = BasicSecAgg::new();
            client.begin_session("round-1", index, config).unwrap();
            client
        })
        .collect()
}

#[test]
fn basic_round_runs_to_completion() {
    let mut clients = basic_cohort();
    let weights = [0x01_u8, 0x02, 0x03, 0x04, 0x05, 0x06];

    for client in clients.iter_mut() {
        let bundle = ShareBundle::from_bytes(&client.generate_key_shares().unwrap()).unwrap();
        assert_eq!(bundle.0.len(), COHORT as usize);

        let masked = client.mask_model_update(&weights).unwrap();
        // 6 bytes pad to two 4-byte chunks
        assert_eq!(masked.len(), 8);

        let response =
            UnmaskResponse::from_bytes(&client.provide_unmasking_shares(&[3]).unwrap()).unwrap();
        assert_eq!(response.survivor_count, COHORT - 1);
        assert_eq!(client.phase(), Phase::Completed);
    }
}

#[test]
fn basic_seed_reconstruction_is_subset_independent() {
    let mut client = basic_cohort().remove(0);
    let bundle = ShareBundle::from_bytes(&client.generate_key_shares().unwrap()).unwrap();

    let first = reconstruct_secrets(&bundle.0[..3], THRESHOLD).unwrap();
    let last = reconstruct_secrets(&bundle.0[2..], THRESHOLD).unwrap();
    assert_eq!(first, last);
    assert_eq!(first.len(), 8);
    // seed chunks are 32-bit words lifted into the field
    assert!(first.iter().all(|chunk| chunk.value() < 1 << 32));
}

#[test]
fn basic_seed_reconstruction_fails_below_threshold() {
    let mut client = basic_cohort().remove(0);
    let bundle = ShareBundle::from_bytes(&client.generate_key_shares().unwrap()).unwrap();

    assert!(matches!(
        reconstruct_secrets(&bundle.0[..2], THRESHOLD),
        Err(secagg_core::ShamirError::InsufficientShares { .. })
    ));
}

const MOD_RANGE: u64 = 1 << 24;

fn plus_cohort(total_clients: u32) -> Vec<SecAggPlus> {
    (1..=total_clients)
        .map(|index| {
            SecAggPlus::new(RoundConfig {
                threshold: 2,
                total_clients,
                client_index: index,
                clipping_range: 3.0,
                target_range: 1 << 16,
                mod_range: MOD_RANGE,
            })
            .unwrap()
        })
        .collect()
}

/// Plays the transport for stages 1 and 2: publishes every client's public
/// keys and routes the sealed share pairs to their recipients.
fn run_key_and_share_stages(clients: &mut [SecAggPlus]) {
    let keys: HashMap<u32, (PublicAgreementKey, PublicAgreementKey)> = clients
        .iter()
        .zip(1..)
        .map(|(client, index)| (index, client.public_keys()))
        .collect();
    for client in clients.iter_mut() {
        client.receive_peer_public_keys(&keys).unwrap();
    }

    let outboxes: Vec<HashMap<u32, Vec<u8>>> = clients
        .iter_mut()
        .map(|client| client.generate_encrypted_shares().unwrap())
        .collect();
    for (client, index) in clients.iter_mut().zip(1_u32..) {
        let inbox: HashMap<u32, Vec<u8>> = outboxes
            .iter()
            .zip(1..)
            .filter_map(|(outbox, sender)| {
                outbox.get(&index).map(|sealed| (sender, sealed.clone()))
            })
            .collect();
        assert_eq!(inbox.len(), outboxes.len() - 1);
        client.receive_encrypted_shares(&inbox).unwrap();
    }
}

#[test]
fn plus_round_masks_and_unmasks() {
    let mut clients = plus_cohort(3);
    run_key_and_share_stages(&mut clients);

    for client in &clients {
        let masked = client.mask_model_update(&[0.5, -1.25, 2.0]).unwrap();
        assert_eq!(masked.len(), 3);
        assert!(masked.iter().all(|&value| value < MOD_RANGE));
    }

    // client 3 drops out after the masking stage
    for client in &clients[..2] {
        let revealed = client.unmask(&[1, 2], &[3]);
        assert_eq!(revealed.len(), 3);
        for (index, bytes) in revealed {
            assert!(ShamirShare::from_bytes(&bytes).is_ok());
            assert!((1..=3).contains(&index));
        }
    }
}

#[test]
fn plus_revealed_secrets_are_subset_independent() {
    let mut clients = plus_cohort(3);
    run_key_and_share_stages(&mut clients);

    // everyone reveals their share of client 2's self-mask seed
    let shares: Vec<Vec<ShamirShare>> = clients
        .iter()
        .map(|client| {
            let revealed = client.unmask(&[2], &[]);
            vec![ShamirShare::from_bytes(&revealed[0].1).unwrap()]
        })
        .collect();

    let first = reconstruct_secrets(&shares[..2], 2).unwrap();
    let last = reconstruct_secrets(&shares[1..], 2).unwrap();
    assert_eq!(first, last);
}

#[test]
fn plus_sealed_shares_are_opaque_to_other_peers() {
    let mut clients = plus_cohort(3);
    let keys: HashMap<u32, (PublicAgreementKey, PublicAgreementKey)> = clients
        .iter()
        .zip(1..)
        .map(|(client, index)| (index, client.public_keys()))
        .collect();
    for client in clients.iter_mut() {
        client.receive_peer_public_keys(&keys).unwrap();
    }

    let outbox = clients[0].generate_encrypted_shares().unwrap();
    let for_client_two = outbox[&2].clone();
    assert!(for_client_two.len() > SEAL_OVERHEAD);

    // client 3 cannot open a pair sealed for client 2
    let mut misrouted = HashMap::new();
    misrouted.insert(1, for_client_two);
    assert!(matches!(
        clients[2].receive_encrypted_shares(&misrouted),
        Err(ProtocolError::DecryptionFailure(1))
    ));
}
