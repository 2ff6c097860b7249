//! Shamir secret sharing over the aggregation field.
//!
//! Secrets are split into `n` shares such that any `t` of them reconstruct
//! the secret exactly while `t - 1` reveal nothing. Sharing evaluates a
//! random degree-`t - 1` polynomial at `x = 1..=n`; reconstruction uses
//! Lagrange interpolation at `x = 0`. Several secrets can be shared in one
//! call, producing one share list per participant.

use std::iter;

use thiserror::Error;

use crate::field::FieldElement;

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors related to sharing and reconstructing secrets.
pub enum ShamirError {
    #[error("invalid sharing parameters: threshold {threshold} with {total_shares} shares")]
    InvalidParameters { threshold: u32, total_shares: u32 },

    #[error("insufficient shares: got {provided} share lists, threshold is {threshold}")]
    InsufficientShares { provided: usize, threshold: u32 },

    #[error("share lists have inconsistent lengths")]
    MismatchedShareCounts,

    #[error("invalid share index {0}")]
    InvalidShareIndex(u32),
}

/// A single Shamir share: the evaluation of a secret polynomial at `x = index`.
///
/// Shares are created during sharing and consumed during reconstruction;
/// they are never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShamirShare {
    /// The participant index in `[1, n]` the polynomial was evaluated at.
    pub index: u32,
    /// The polynomial evaluation.
    pub value: FieldElement,
}

/// Splits each secret into `total_shares` shares with reconstruction
/// threshold `threshold`.
///
/// The returned vector is indexed by participant: entry `i` holds the shares
/// destined for participant `i + 1`, one per secret, in the order the secrets
/// were given. The `threshold - 1` non-constant polynomial coefficients are
/// drawn from the system CSPRNG.
///
/// # Errors
/// Fails if `threshold` is zero or exceeds `total_shares`.
pub fn share_secrets(
    secrets: &[FieldElement],
    threshold: u32,
    total_shares: u32,
) -> Result<Vec<Vec<ShamirShare>>, ShamirError> {
    if threshold == 0 || threshold > total_shares {
        return Err(ShamirError::InvalidParameters {
            threshold,
            total_shares,
        });
    }

    let mut bundles: Vec<Vec<ShamirShare>> = (0..total_shares)
        .map(|_| Vec::with_capacity(secrets.len()))
        .collect();

    for secret in secrets {
        let mut coefficients = Vec::with_capacity(threshold as usize);
        coefficients.push(*secret);
        coefficients.extend(
            iter::repeat_with(FieldElement::random).take(threshold as usize - 1),
        );

        for index in 1..=total_shares {
            let x = FieldElement::from(index);
            // Horner's method, highest coefficient first
            let mut value = FieldElement::ZERO;
            for coefficient in coefficients.iter().rev() {
                value = value * x + *coefficient;
            }
            bundles[index as usize - 1].push(ShamirShare { index, value });
        }
    }

    Ok(bundles)
}

/// Reconstructs the secrets from at least `threshold` participant share
/// lists.
///
/// Exactly the first `threshold` lists are used; reconstruction is
/// independent of which `threshold`-subset of the original shares they are.
/// Each list must hold one share per secret, all carrying that participant's
/// index.
///
/// # Errors
/// Fails with [`ShamirError::InsufficientShares`] below the threshold, and
/// with no partial result on inconsistent lists, zero or duplicate indices.
pub fn reconstruct_secrets(
    share_lists: &[Vec<ShamirShare>],
    threshold: u32,
) -> Result<Vec<FieldElement>, ShamirError> {
    if threshold == 0 {
        return Err(ShamirError::InvalidParameters {
            threshold,
            total_shares: share_lists.len() as u32,
        });
    }
    if share_lists.len() < threshold as usize {
        return Err(ShamirError::InsufficientShares {
            provided: share_lists.len(),
            threshold,
        });
    }
    let share_lists = &share_lists[..threshold as usize];

    let secret_count = share_lists[0].len();
    if share_lists.iter().any(|list| list.len() != secret_count) {
        return Err(ShamirError::MismatchedShareCounts);
    }

    let indices: Vec<u32> = share_lists
        .iter()
        .map(|list| list[0].index)
        .collect::<Vec<_>>();
    for (i, &index) in indices.iter().enumerate() {
        if index == 0 || indices[..i].contains(&index) {
            return Err(ShamirError::InvalidShareIndex(index));
        }
        if share_lists[i].iter().any(|share| share.index != index) {
            return Err(ShamirError::InvalidShareIndex(index));
        }
    }

    // Lagrange basis at x = 0: L_i = prod_{j != i} (0 - x_j) / (x_i - x_j).
    // The basis only depends on the participant indices, so it is computed
    // once and reused for every secret slot.
    let basis: Vec<FieldElement> = indices
        .iter()
        .map(|&i| {
            let x_i = FieldElement::from(i);
            let mut coefficient = FieldElement::ONE;
            for &j in &indices {
                if j == i {
                    continue;
                }
                let x_j = FieldElement::from(j);
                let numerator = FieldElement::ZERO - x_j;
                let denominator = (x_i - x_j).inverse();
                coefficient = coefficient * numerator * denominator;
            }
            coefficient
        })
        .collect();

    let secrets = (0..secret_count)
        .map(|slot| {
            share_lists
                .iter()
                .zip(&basis)
                .fold(FieldElement::ZERO, |sum, (list, &coefficient)| {
                    sum + list[slot].value * coefficient
                })
        })
        .collect();

    Ok(secrets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> Vec<FieldElement> {
        vec![
            FieldElement::from(42_u32),
            FieldElement::new(crate::field::MODULUS - 1).unwrap(),
            FieldElement::from(0xdead_beef_u32),
        ]
    }

    #[test]
    fn test_share_and_reconstruct() {
        let secrets = secrets();
        let bundles = share_secrets(&secrets, 3, 5).unwrap();
        assert_eq!(bundles.len(), 5);
        for (i, bundle) in bundles.iter().enumerate() {
            assert_eq!(bundle.len(), secrets.len());
            assert!(bundle.iter().all(|share| share.index == i as u32 + 1));
        }

        let reconstructed = reconstruct_secrets(&bundles[..3].to_vec(), 3).unwrap();
        assert_eq!(reconstructed, secrets);
    }

    #[test]
    fn test_reconstruction_is_subset_independent() {
        let secrets = secrets();
        let bundles = share_secrets(&secrets, 3, 5).unwrap();

        let subsets: [[usize; 3]; 4] = [[0, 1, 2], [2, 3, 4], [0, 2, 4], [4, 1, 3]];
        for subset in &subsets {
            let lists: Vec<Vec<ShamirShare>> =
                subset.iter().map(|&i| bundles[i].clone()).collect();
            assert_eq!(reconstruct_secrets(&lists, 3).unwrap(), secrets);
        }
    }

    #[test]
    fn test_below_threshold_fails() {
        let bundles = share_secrets(&secrets(), 3, 5).unwrap();
        let err = reconstruct_secrets(&bundles[..2].to_vec(), 3).unwrap_err();
        assert_eq!(
            err,
            ShamirError::InsufficientShares {
                provided: 2,
                threshold: 3,
            }
        );
    }

    #[test]
    fn test_threshold_one_is_plain_copy() {
        let secrets = secrets();
        let bundles = share_secrets(&secrets, 1, 4).unwrap();
        for bundle in &bundles {
            let values: Vec<FieldElement> = bundle.iter().map(|share| share.value).collect();
            assert_eq!(values, secrets);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(share_secrets(&secrets(), 0, 5).is_err());
        assert!(share_secrets(&secrets(), 6, 5).is_err());
    }

    #[test]
    fn test_duplicate_indices_fail() {
        let bundles = share_secrets(&secrets(), 2, 3).unwrap();
        let lists = vec![bundles[0].clone(), bundles[0].clone()];
        assert!(matches!(
            reconstruct_secrets(&lists, 2),
            Err(ShamirError::InvalidShareIndex(1))
        ));
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let bundles = share_secrets(&secrets(), 2, 3).unwrap();
        let mut truncated = bundles[1].clone();
        truncated.pop();
        let lists = vec![bundles[0].clone(), truncated];
        assert_eq!(
            reconstruct_secrets(&lists, 2),
            Err(ShamirError::MismatchedShareCounts)
        );
    }
}
