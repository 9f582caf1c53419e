//! Messages sent within signing protocol

use generic_ec::{Curve, Point, Scalar};
use serde::{Deserialize, Serialize};

use crate::{
    commitment::{HashCommitment, Opening},
    round::Delivery,
    zk::SchnorrProof,
};

/// Type tag of [`MsgRound1`]
pub const ROUND1: &str = "eddsa:signing:round1";
/// Type tag of [`MsgRound2`]
pub const ROUND2: &str = "eddsa:signing:round2";
/// Type tag of [`MsgRound3`]
pub const ROUND3: &str = "eddsa:signing:round3";

pub(crate) const KINDS: &[(&str, Delivery)] = &[
    (ROUND1, Delivery::Broadcast),
    (ROUND2, Delivery::Broadcast),
    (ROUND3, Delivery::Broadcast),
];

/// Message from round 1, broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRound1 {
    /// Commitment to the nonce point
    pub commitment: HashCommitment,
}

/// Message from round 2, broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MsgRound2<E: Curve> {
    /// Nonce point `R_j`
    pub nonce_point: Point<E>,
    /// Opens the round 1 commitment
    pub opening: Opening,
    /// Proof of knowledge of the nonce
    pub proof: SchnorrProof<E>,
}

/// Message from round 3, broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MsgRound3<E: Curve> {
    /// Partial signature `s_j = r_j + k w_j`
    pub partial: Scalar<E>,
}
