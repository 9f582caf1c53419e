//! Proof of knowledge of discrete logarithm modulo `NTilde`
//!
//! Statement: `h2 = h1^x mod N` where `h1` generates a subgroup of order `pq` and `N = (2p + 1)(2q + 1)`.
//! Each of the [`ITERATIONS`] rounds has soundness error 1/2. `paillier_zk` has no proof for
//! this statement, it's built here on [`rug`](paillier_zk::rug) arithmetic.

use paillier_zk::rug::{ops::RemRounding, Integer};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Reason},
    utils::{self, hex_int},
};

/// Number of iterations
pub const ITERATIONS: usize = 128;

/// Public statement of [`DlnProof`]
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    /// Base
    pub h1: &'a Integer,
    /// `h1^x mod N`
    pub h2: &'a Integer,
    /// Modulus
    pub n: &'a Integer,
}

/// Secret witness of [`DlnProof`]
pub struct Witness<'a> {
    /// Discrete logarithm of `h2` base `h1`
    pub x: &'a Integer,
    /// Sophie Germain prime `p`
    pub p: &'a Integer,
    /// Sophie Germain prime `q`
    pub q: &'a Integer,
}

/// Discrete logarithm proof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlnProof {
    #[serde(with = "hex_int::vec")]
    alpha: Vec<Integer>,
    #[serde(with = "hex_int::vec")]
    t: Vec<Integer>,
}

impl DlnProof {
    /// Proves the statement
    pub fn prove(
        rng: &mut (impl RngCore + CryptoRng),
        statement: Statement,
        witness: Witness,
        binding: &[&[u8]],
    ) -> Self {
        let order = Integer::from(witness.p * witness.q);
        let a = (0..ITERATIONS)
            .map(|_| utils::random_below(rng, &order))
            .collect::<Vec<_>>();
        let alpha = a
            .iter()
            .map(|a_i| pow_mod(statement.h1, a_i, statement.n))
            .collect::<Vec<_>>();
        let challenge = challenge(&statement, &alpha, binding);
        let t = a
            .iter()
            .enumerate()
            .map(|(i, a_i)| {
                if bit(&challenge, i) {
                    Integer::from(a_i + witness.x).rem_euc(&order)
                } else {
                    a_i.clone()
                }
            })
            .collect();
        Self { alpha, t }
    }

    /// Verifies the proof
    pub fn verify(&self, statement: Statement, binding: &[&[u8]]) -> Result<(), Error> {
        let invalid = || Error::from(Reason::InvalidProof("discrete log"));
        let n = statement.n;
        if *n <= 1 || self.alpha.len() != ITERATIONS || self.t.len() != ITERATIONS {
            return Err(invalid());
        }
        let in_range = |x: &Integer| *x > 1 && x < n;
        if !in_range(statement.h1) || !in_range(statement.h2) || statement.h1 == statement.h2 {
            return Err(invalid());
        }
        if self.alpha.iter().any(|a| *a <= 0 || a >= n) || self.t.iter().any(|t| *t < 0) {
            return Err(invalid());
        }

        let challenge = challenge(&statement, &self.alpha, binding);
        for (i, (alpha_i, t_i)) in self.alpha.iter().zip(&self.t).enumerate() {
            let lhs = pow_mod(statement.h1, t_i, n);
            let rhs = if bit(&challenge, i) {
                Integer::from(alpha_i * statement.h2).rem_euc(n)
            } else {
                alpha_i.clone()
            };
            if lhs != rhs {
                return Err(invalid());
            }
        }
        Ok(())
    }
}

fn challenge(statement: &Statement, alpha: &[Integer], binding: &[&[u8]]) -> [u8; 32] {
    let h1 = utils::to_bytes(statement.h1);
    let h2 = utils::to_bytes(statement.h2);
    let n = utils::to_bytes(statement.n);
    let alpha = alpha.iter().map(utils::to_bytes).collect::<Vec<_>>();

    let mut parts = binding.to_vec();
    parts.extend([h1.as_slice(), h2.as_slice(), n.as_slice()]);
    parts.extend(alpha.iter().map(Vec::as_slice));
    utils::hash_parts(b"dln-proof", &parts)
}

/// `base^exp mod n` for non-negative `exp`
fn pow_mod(base: &Integer, exp: &Integer, n: &Integer) -> Integer {
    base.pow_mod_ref(exp, n).map(Integer::from).unwrap_or_default()
}

fn bit(challenge: &[u8; 32], i: usize) -> bool {
    (challenge[i / 8] >> (i % 8)) & 1 == 1
}
