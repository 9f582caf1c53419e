//! No small factor proof
//!
//! Proves that the prover's Paillier modulus `N0 = p q` has no factor smaller than roughly
//! `2^-ℓ sqrt(N0)`, against the verifier's ring-Pedersen parameters `(N̂, s, t)`. Wraps
//! [`no_small_factor`](paillier_zk::no_small_factor) with ℓ = 256 and ε = 512.

use paillier_zk::{no_small_factor as pi_fac, rug::Integer};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{ProofDigest, SharedState};
use crate::error::{Error, Reason};

const L: usize = 256;
const EPSILON: usize = 512;

const DOMAIN: &[u8] = b"fac-proof";

/// Verifier's ring-Pedersen parameters
#[derive(Debug, Clone, Copy)]
pub struct Aux<'a> {
    /// `N̂`
    pub n_hat: &'a Integer,
    /// `s`
    pub s: &'a Integer,
    /// `t`
    pub t: &'a Integer,
}

impl Aux<'_> {
    fn to_zk(self) -> pi_fac::Aux {
        pi_fac::Aux {
            s: self.s.clone(),
            t: self.t.clone(),
            rsa_modulo: self.n_hat.clone(),
            multiexp: None,
            crt: None,
        }
    }
}

fn security_params() -> pi_fac::SecurityParams {
    pi_fac::SecurityParams {
        l: L,
        epsilon: EPSILON,
        q: Integer::from(1) << (L as u32),
    }
}

/// No small factor proof
#[derive(Clone, Serialize, Deserialize)]
pub struct FacProof {
    proof: pi_fac::non_interactive::Proof,
}

impl FacProof {
    /// Proves that `n0 = p * q` has no small factors
    pub fn prove(
        rng: &mut (impl RngCore + CryptoRng),
        n0: &Integer,
        p: &Integer,
        q: &Integer,
        aux: Aux,
        binding: &[&[u8]],
    ) -> Result<Self, Error> {
        let n_root = Integer::from(n0.sqrt_ref());
        let proof = pi_fac::non_interactive::prove::<ProofDigest>(
            &SharedState::new(DOMAIN, binding),
            &aux.to_zk(),
            pi_fac::Data { n: n0, n_root: &n_root },
            pi_fac::PrivateData { p, q },
            &security_params(),
            rng,
        )
        .map_err(|_| Reason::InvalidModulus("ring-Pedersen parameters are not invertible"))?;
        Ok(Self { proof })
    }

    /// Verifies the proof for modulus `n0`
    ///
    /// Besides the algebraic relations, every response is checked to lie within its range.
    pub fn verify(&self, n0: &Integer, aux: Aux, binding: &[&[u8]]) -> Result<(), Error> {
        let invalid = || Error::from(Reason::InvalidProof("no small factor"));
        if *n0 <= 0 || *aux.n_hat <= 0 {
            return Err(invalid());
        }
        let n_root = Integer::from(n0.sqrt_ref());
        pi_fac::non_interactive::verify::<ProofDigest>(
            &SharedState::new(DOMAIN, binding),
            &aux.to_zk(),
            pi_fac::Data { n: n0, n_root: &n_root },
            &security_params(),
            &self.proof,
        )
        .map_err(|_| invalid())
    }
}

impl core::fmt::Debug for FacProof {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FacProof").finish_non_exhaustive()
    }
}
