//! Messages sent within keygen protocol

use generic_ec::{Curve, Scalar};
use paillier_zk::rug::Integer;
use serde::{Deserialize, Serialize};

use crate::{
    commitment::{HashCommitment, Opening},
    paillier::KeyProof,
    round::Delivery,
    utils::hex_int,
    vss::PolynomialCommitment,
    zk::{DlnProof, FacProof, ModProof},
};

/// Type tag of [`MsgRound1`]
pub const ROUND1: &str = "ecdsa:keygen:round1";
/// Type tag of [`MsgRound2Share`]
pub const ROUND2_SHARE: &str = "ecdsa:keygen:round2-1";
/// Type tag of [`MsgRound2Decommit`]
pub const ROUND2_DECOMMIT: &str = "ecdsa:keygen:round2-2";
/// Type tag of [`MsgRound3`]
pub const ROUND3: &str = "ecdsa:keygen:round3";

pub(crate) const KINDS: &[(&str, Delivery)] = &[
    (ROUND1, Delivery::Broadcast),
    (ROUND2_SHARE, Delivery::P2P),
    (ROUND2_DECOMMIT, Delivery::Broadcast),
    (ROUND3, Delivery::Broadcast),
];

/// Message from round 1, broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRound1 {
    /// Commitment to the sharing polynomial
    pub commitment: HashCommitment,
    /// Paillier modulus
    #[serde(with = "hex_int")]
    pub paillier_n: Integer,
    /// `NTilde`
    #[serde(with = "hex_int")]
    pub ntilde: Integer,
    /// `h1`
    #[serde(with = "hex_int")]
    pub h1: Integer,
    /// `h2`
    #[serde(with = "hex_int")]
    pub h2: Integer,
    /// Proof of knowledge of `log_h1(h2)`
    pub dln_proof_1: DlnProof,
    /// Proof of knowledge of `log_h2(h1)`
    pub dln_proof_2: DlnProof,
}

/// Message from round 2, sent point-to-point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MsgRound2Share<E: Curve> {
    /// Recipient's share of the sender's secret
    pub share: Scalar<E>,
    /// Proof that sender's Paillier modulus has no small factors
    pub fac_proof: FacProof,
}

/// Message from round 2, broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MsgRound2Decommit<E: Curve> {
    /// Opens the round 1 commitment
    pub opening: Opening,
    /// Sharing polynomial commitment
    pub polynomial: PolynomialCommitment<E>,
    /// Proof that sender's Paillier modulus is a Paillier-Blum modulus
    pub mod_proof: ModProof,
}

/// Message from round 3, broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRound3 {
    /// Proof that sender's Paillier key is well formed
    pub key_proof: KeyProof,
}
