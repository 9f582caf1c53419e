//! Zero-knowledge proofs
//!
//! Non-interactive (Fiat-Shamir) proofs used by the protocols. Every prover and verifier takes a
//! `binding`: context (session id, prover identity) hashed into the challenge, so a proof can't
//! be replayed in another session or by another party.
//!
//! No small factor and Paillier-Blum modulus proofs come from [`paillier_zk`], the discrete log
//! proof over `NTilde` and the Schnorr proof are implemented here.

pub mod dln;
pub mod fac;
pub mod modulus;
pub mod schnorr;

pub use self::{dln::DlnProof, fac::FacProof, modulus::ModProof, schnorr::SchnorrProof};

/// Digest used in challenges of [`paillier_zk`] proofs
type ProofDigest = sha2::Sha256;

/// Fiat-Shamir shared state of [`paillier_zk`] proofs
#[derive(udigest::Digestable)]
#[udigest(tag = "tss-engine.zk.shared-state")]
struct SharedState {
    #[udigest(as_bytes)]
    binding: [u8; 32],
}

impl SharedState {
    fn new(domain: &[u8], binding: &[&[u8]]) -> Self {
        Self {
            binding: crate::utils::hash_parts(domain, binding),
        }
    }
}
