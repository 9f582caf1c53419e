//! Signature finalization
//!
//! Partial signatures are summed into the final scalar, and the signature is verified against
//! the group public key before it's released.

use generic_ec::{Point, Scalar};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Reason},
    Ciphersuite,
};

/// Schnorr Signature
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Signature<C: Ciphersuite> {
    /// $R$ component of the signature
    pub r: Point<C::Curve>,
    /// $s$ component of the signature
    pub s: Scalar<C::Curve>,
}

impl<C: Ciphersuite> Signature<C> {
    /// Verifies signature against a public key and a message
    pub fn verify(&self, public_key: &Point<C::Curve>, msg: &[u8]) -> Result<(), Error> {
        let challenge = C::compute_challenge(&self.r, public_key, msg);

        let lhs = Point::generator() * self.s;
        let rhs = self.r + public_key * challenge;

        if lhs == rhs {
            Ok(())
        } else {
            Err(Reason::InvalidSignature.into())
        }
    }

    /// Encodes signature as `R || s`
    ///
    /// For [`Ed25519`](crate::ciphersuite::Ed25519) it's the standard 64 bytes encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let r = C::serialize_point(&self.r);
        let s = C::serialize_scalar(&self.s);
        [r.as_ref(), s.as_ref()].concat()
    }

    /// Decodes signature encoded via [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let point_len = C::serialize_point(&(Point::generator() * Scalar::one())).as_ref().len();
        if bytes.len() <= point_len {
            return None;
        }
        let (r, s) = bytes.split_at(point_len);
        Some(Self {
            r: C::deserialize_point(r).ok()?,
            s: C::deserialize_scalar(s).ok()?,
        })
    }
}

/// Sums partial signatures into a signature and verifies it
///
/// Returns [`ErrorKind::Verification`](crate::ErrorKind::Verification) error if resulting
/// signature doesn't verify against `public_key` and `msg`. The signature is never returned in
/// that case.
pub fn finalize<C: Ciphersuite>(
    r: Point<C::Curve>,
    partials: &[Scalar<C::Curve>],
    public_key: &Point<C::Curve>,
    msg: &[u8],
) -> Result<Signature<C>, Error> {
    let s = partials.iter().copied().sum();
    let signature = Signature { r, s };
    signature.verify(public_key, msg)?;
    Ok(signature)
}
