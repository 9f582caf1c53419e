use digest::Digest;

use crate::Ciphersuite;

/// Schnorr over secp256k1 with SHA-256 challenge
///
/// Challenge is `SHA-256(NAME || R || A || msg)` with points in compressed form, interpreted as
/// a big-endian integer reduced modulo the group order.
#[derive(Debug, Clone, Copy)]
pub struct Secp256k1;

impl Ciphersuite for Secp256k1 {
    const NAME: &'static str = "SECP256K1-SHA256";

    type Curve = generic_ec::curves::Secp256k1;

    fn compute_challenge(
        group_commitment: &generic_ec::Point<Self::Curve>,
        group_public_key: &generic_ec::Point<Self::Curve>,
        msg: &[u8],
    ) -> generic_ec::Scalar<Self::Curve> {
        let hash = sha2::Sha256::new()
            .chain_update(Self::NAME)
            .chain_update(Self::serialize_point(group_commitment))
            .chain_update(Self::serialize_point(group_public_key))
            .chain_update(msg)
            .finalize();

        generic_ec::Scalar::from_be_bytes_mod_order(hash)
    }

    type PointBytes = generic_ec::EncodedPoint<Self::Curve>;
    fn serialize_point(point: &generic_ec::Point<Self::Curve>) -> Self::PointBytes {
        point.to_bytes(true)
    }
    fn deserialize_point(
        bytes: &[u8],
    ) -> Result<generic_ec::Point<Self::Curve>, generic_ec::errors::InvalidPoint> {
        generic_ec::Point::from_bytes(bytes)
    }

    type ScalarBytes = generic_ec::EncodedScalar<Self::Curve>;
    fn serialize_scalar(scalar: &generic_ec::Scalar<Self::Curve>) -> Self::ScalarBytes {
        scalar.to_be_bytes()
    }
    fn deserialize_scalar(
        bytes: &[u8],
    ) -> Result<generic_ec::Scalar<Self::Curve>, generic_ec::errors::InvalidScalar> {
        generic_ec::Scalar::from_be_bytes(bytes)
    }
}
