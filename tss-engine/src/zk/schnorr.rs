//! Schnorr proof of knowledge of discrete logarithm on a curve

use digest::Digest;
use generic_ec::{Curve, Point, Scalar, SecretScalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Reason};

/// Proof of knowledge of `x` such that `X = x G`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SchnorrProof<E: Curve> {
    commitment: Point<E>,
    response: Scalar<E>,
}

impl<E: Curve> SchnorrProof<E> {
    /// Proves knowledge of `x`
    pub fn prove(
        rng: &mut (impl RngCore + CryptoRng),
        x: &SecretScalar<E>,
        binding: &[&[u8]],
    ) -> Self {
        let nonce = SecretScalar::<E>::random(rng);
        let commitment = Point::generator() * nonce.as_ref();
        let public = Point::generator() * x.as_ref();
        let challenge = challenge(&public, &commitment, binding);
        let response = nonce.as_ref() + challenge * x.as_ref();
        Self {
            commitment,
            response,
        }
    }

    /// Verifies the proof for `public = x G`
    pub fn verify(&self, public: &Point<E>, binding: &[&[u8]]) -> Result<(), Error> {
        let challenge = challenge(public, &self.commitment, binding);
        if Point::generator() * self.response == self.commitment + public * challenge {
            Ok(())
        } else {
            Err(Reason::InvalidProof("schnorr").into())
        }
    }
}

fn challenge<E: Curve>(public: &Point<E>, commitment: &Point<E>, binding: &[&[u8]]) -> Scalar<E> {
    let mut hash = sha2::Sha512::new().chain_update(b"schnorr-proof").chain_update(E::CURVE_NAME);
    for part in binding {
        hash.update((part.len() as u64).to_be_bytes());
        hash.update(part);
    }
    let hash = hash
        .chain_update(public.to_bytes(true))
        .chain_update(commitment.to_bytes(true))
        .finalize();
    Scalar::from_be_bytes_mod_order(hash)
}
