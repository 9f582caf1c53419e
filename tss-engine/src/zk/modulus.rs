//! Paillier-Blum modulus proof
//!
//! Proves that `N = p q` is a product of two primes congruent to 3 mod 4 and that `N` is coprime
//! with `phi(N)`. Wraps [`paillier_blum_modulus`](paillier_zk::paillier_blum_modulus).

use paillier_zk::{paillier_blum_modulus as pi_mod, rug::Integer};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{ProofDigest, SharedState};
use crate::{
    error::{Error, Reason},
    primes,
};

/// Number of iterations
pub const ITERATIONS: usize = 80;

const DOMAIN: &[u8] = b"mod-proof";

/// Paillier-Blum modulus proof
#[derive(Clone, Serialize, Deserialize)]
pub struct ModProof {
    commitment: pi_mod::Commitment,
    proof: pi_mod::Proof<ITERATIONS>,
}

impl ModProof {
    /// Proves that `n = p q` is a Paillier-Blum modulus
    pub fn prove(
        rng: &mut (impl RngCore + CryptoRng),
        n: &Integer,
        p: &Integer,
        q: &Integer,
        binding: &[&[u8]],
    ) -> Result<Self, Error> {
        if Integer::from(p * q) != *n || p.mod_u(4) != 3 || q.mod_u(4) != 3 {
            return Err(Reason::InvalidModulus("not a Blum integer").into());
        }
        let (commitment, proof) = pi_mod::non_interactive::prove::<ITERATIONS, ProofDigest>(
            &SharedState::new(DOMAIN, binding),
            &pi_mod::Data { n: n.clone() },
            &pi_mod::PrivateData {
                p: p.clone(),
                q: q.clone(),
            },
            rng,
        )
        .map_err(|_| Reason::InvalidModulus("not a Paillier-Blum modulus"))?;
        Ok(Self { commitment, proof })
    }

    /// Verifies the proof for modulus `n`
    pub fn verify(&self, n: &Integer, binding: &[&[u8]]) -> Result<(), Error> {
        let invalid = || Error::from(Reason::InvalidProof("paillier-blum modulus"));
        if *n <= 1 || n.is_even() || primes::is_prime(n) {
            return Err(invalid());
        }
        pi_mod::non_interactive::verify::<ITERATIONS, ProofDigest>(
            &SharedState::new(DOMAIN, binding),
            &pi_mod::Data { n: n.clone() },
            &self.commitment,
            &self.proof,
        )
        .map_err(|_| invalid())
    }
}

impl core::fmt::Debug for ModProof {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModProof").finish_non_exhaustive()
    }
}
