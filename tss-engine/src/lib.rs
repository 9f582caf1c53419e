//! Multi-party threshold signature protocol engine
//!
//! Parties jointly generate a key without anyone learning it, and any `t + 1` of them can later
//! sign a message. The engine is message-driven: it doesn't talk to the network itself. Outgoing
//! messages are handed to an [`Outbox`](transport::Outbox), incoming messages are delivered via
//! [`Participant::update`]. A round is executed as soon as its last expected message arrives.
//!
//! This crate provides:
//! * [Pre-parameters generation](pre_params) \
//!   Safe primes and a Paillier keypair needed by keygen. Expensive, meant to be done ahead of
//!   time and reused.
//! * [Distributed key generation](keygen()) based on Feldman VSS, with proofs that every party's
//!   Paillier and ring-Pedersen parameters are well formed
//! * [Threshold Schnorr signing](signing()) \
//!   Produces standard [Ed25519](ciphersuite::Ed25519) signatures. Signature is verified before
//!   it's released.
//! * [Message aggregation](aggregator) barrier collecting one message per expected sender
//!
//! Every failure is reported as [`Error`] carrying its [kind](ErrorKind) and the parties
//! responsible for it.

#![forbid(unsafe_code, unused_crate_dependencies)]
#![deny(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
#![deny(missing_docs)]
#![allow(clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use {generic_ec, paillier_zk, paillier_zk::rug};

pub mod aggregator;
pub mod ciphersuite;
pub mod commitment;
pub mod error;
pub mod key;
pub mod keygen;
pub mod message;
pub mod paillier;
pub mod params;
pub mod participant;
pub mod pre_params;
pub mod primes;
pub mod signing;
pub mod transport;
pub mod vss;
pub mod zk;

mod round;
mod utils;

pub use self::{
    ciphersuite::Ciphersuite,
    error::{Error, ErrorKind},
    key::KeyShare,
    message::Envelope,
    params::{PartyId, PrimeBits, SessionParameters},
    participant::{Participant, Party},
};

/// Distributed key generation
///
/// ## Example
/// ```rust,no_run
/// use tss_engine::{generic_ec::curves::Ed25519, PartyId, SessionParameters};
/// # fn doc_fn(
/// #     outbox: futures::channel::mpsc::UnboundedSender<tss_engine::Envelope>,
/// # ) -> Result<(), tss_engine::Error> {
///
/// let parties = [PartyId::new("alice", 1), PartyId::new("bob", 2), PartyId::new("carol", 3)];
/// let params = SessionParameters::new(parties.clone(), parties[0].clone(), 1)?
///     .set_session_nonce(*b"keygen #1");
///
/// let keygen = tss_engine::keygen::<Ed25519>(params).build(outbox, &mut rand_core::OsRng);
/// keygen.start()?;
/// # Ok(()) }
/// ```
pub fn keygen<E: generic_ec::Curve>(params: SessionParameters) -> keygen::KeygenBuilder<E> {
    keygen::KeygenBuilder::new(params)
}

/// Threshold signing
///
/// `params` list the signers, at least `t + 1` of the key share holders.
///
/// ## Example
/// ```rust,no_run
/// use tss_engine::ciphersuite::Ed25519;
/// # fn retrieve_key_share() -> tss_engine::KeyShare<<Ed25519 as tss_engine::Ciphersuite>::Curve> { unimplemented!() }
/// # fn doc_fn(
/// #     params: tss_engine::SessionParameters,
/// #     outbox: futures::channel::mpsc::UnboundedSender<tss_engine::Envelope>,
/// # ) -> Result<(), tss_engine::Error> {
///
/// let key_share = retrieve_key_share();
/// let msg = b"Hello, TSS World!";
///
/// let signing = tss_engine::signing::<Ed25519>(params, &key_share, msg)
///     .build(outbox, &mut rand_core::OsRng);
/// signing.start()?;
/// # Ok(()) }
/// ```
pub fn signing<'a, C: Ciphersuite>(
    params: SessionParameters,
    key_share: &'a KeyShare<C::Curve>,
    msg: &'a [u8],
) -> signing::SigningBuilder<'a, C> {
    signing::SigningBuilder::new(params, key_share, msg)
}
