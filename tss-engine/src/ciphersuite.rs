//! Signing ciphersuite
//!
//! Ciphersuite specifies which curve, challenge hash and encodings to use during the signing.
//!
//! Out of the box, we provide:
//! * [Ed25519], requires `curve-ed25519` feature, produces signatures accepted by any
//!   standard Ed25519 verifier
//! * [Secp256k1], requires `curve-secp256k1` feature

use generic_ec::{
    errors::{InvalidPoint, InvalidScalar},
    Curve, Point, Scalar,
};

#[cfg(feature = "curve-ed25519")]
mod ed25519;
#[cfg(feature = "curve-secp256k1")]
mod secp256k1;

#[cfg(feature = "curve-ed25519")]
pub use ed25519::Ed25519;
#[cfg(feature = "curve-secp256k1")]
pub use secp256k1::Secp256k1;

/// Ciphersuite determines an underlying curve and set of cryptographic primitives
/// used in the signing protocol
pub trait Ciphersuite: Sized + Clone + Copy + core::fmt::Debug + Send + Sync + 'static {
    /// Name of the ciphersuite
    const NAME: &'static str;

    /// Underlying curve on which signatures will be produced
    type Curve: Curve;

    /// Computes the challenge according to Schnorr scheme
    ///
    /// `k = H(R, A, msg)` where `R` is the aggregated nonce and `A` is the group public key.
    fn compute_challenge(
        group_commitment: &Point<Self::Curve>,
        group_public_key: &Point<Self::Curve>,
        msg: &[u8],
    ) -> Scalar<Self::Curve>;

    /// Byte array that contains bytes representation of the point
    type PointBytes: AsRef<[u8]>;
    /// Serializes point
    fn serialize_point(point: &Point<Self::Curve>) -> Self::PointBytes;
    /// Deserializes point
    fn deserialize_point(bytes: &[u8]) -> Result<Point<Self::Curve>, InvalidPoint>;

    /// Byte array that contains bytes representation of the scalar
    type ScalarBytes: AsRef<[u8]>;
    /// Serializes scalar
    fn serialize_scalar(scalar: &Scalar<Self::Curve>) -> Self::ScalarBytes;
    /// Deserializes scalar
    fn deserialize_scalar(bytes: &[u8]) -> Result<Scalar<Self::Curve>, InvalidScalar>;
}
