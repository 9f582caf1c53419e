//! Hash commitments
//!
//! `C = H(r, m_1, .., m_k)` for a random 256-bit `r`. Opening reveals `r`, the committed values
//! are sent alongside it.

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::utils;

/// Commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCommitment(#[serde(with = "hex::serde")] [u8; 32]);

/// Randomness that opens a [`HashCommitment`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening(#[serde(with = "hex::serde")] [u8; 32]);

const DOMAIN: &[u8] = b"tss-engine/hash-commitment";

/// Commits to `parts`
pub fn commit(
    rng: &mut (impl RngCore + CryptoRng),
    parts: &[&[u8]],
) -> (HashCommitment, Opening) {
    let mut r = [0u8; 32];
    rng.fill_bytes(&mut r);
    (HashCommitment(digest(&r, parts)), Opening(r))
}

impl HashCommitment {
    /// Checks that the commitment opens to `parts`
    pub fn verify(&self, opening: &Opening, parts: &[&[u8]]) -> bool {
        digest(&opening.0, parts) == self.0
    }
}

fn digest(r: &[u8; 32], parts: &[&[u8]]) -> [u8; 32] {
    let mut all = Vec::with_capacity(parts.len() + 1);
    all.push(r.as_slice());
    all.extend_from_slice(parts);
    utils::hash_parts(DOMAIN, &all)
}
