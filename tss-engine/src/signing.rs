//! Threshold Schnorr signing
//!
//! Any `t + 1` holders of key shares can sign a message. Signers are the parties of the session
//! parameters, every one of them must hold a share of the same key.
//!
//! The protocol takes three rounds of messages:
//! 1. Every signer samples a nonce `r_i` and commits to `R_i = r_i G`
//! 2. Signers open their commitments and prove knowledge of `r_i`
//! 3. Every signer computes `R = sum R_j`, challenge `k = H(R, A, msg)` as defined by the
//!    [ciphersuite](crate::ciphersuite) and sends partial signature `s_i = r_i + k lambda_i x_i`
//!
//! Once all partial signatures are received, they're [finalized](finalize) into a signature that
//! is verified against the group public key before being released. If verification fails, the
//! error names the signers whose partial signatures are inconsistent with their public shares.

use std::sync::Arc;

use generic_ec::SecretScalar;
use rand_core::{CryptoRng, RngCore};

use crate::{
    error::{Error, Reason},
    key::KeyShare,
    message::Envelope,
    params::{PartyId, SessionParameters},
    participant::{Participant, Party},
    round::Session,
    transport::Outbox,
    utils, vss, Ciphersuite,
};

pub mod finalize;
pub mod msg;
mod rounds;

pub use self::finalize::Signature;
use self::rounds::{SigningSession, State};

/// Builder for signing protocol
pub struct SigningBuilder<'a, C: Ciphersuite> {
    params: SessionParameters,
    key_share: &'a KeyShare<C::Curve>,
    msg: &'a [u8],
}

impl<'a, C: Ciphersuite> SigningBuilder<'a, C> {
    /// Constructs a signing builder
    ///
    /// It could be easier to use [signing](crate::signing()) function located in the crate root.
    pub fn new(
        params: SessionParameters,
        key_share: &'a KeyShare<C::Curve>,
        msg: &'a [u8],
    ) -> Self {
        Self {
            params,
            key_share,
            msg,
        }
    }

    /// Builds the protocol
    ///
    /// Returns [`Participant::Failed`] if the key share is invalid or doesn't match the session
    /// parameters.
    pub fn build<R: RngCore + CryptoRng>(
        self,
        outbox: impl Outbox + 'static,
        rng: &mut R,
    ) -> Participant<Signing<C>> {
        self.try_build(outbox, rng).into()
    }

    fn try_build<R: RngCore + CryptoRng>(
        self,
        outbox: impl Outbox + 'static,
        rng: &mut R,
    ) -> Result<Signing<C>, Error> {
        let Self {
            params,
            key_share,
            msg,
        } = self;
        key_share.validate()?;

        if params.party() != key_share.owner() {
            return Err(Reason::InvalidSessionParameters("party doesn't own the key share").into());
        }
        if params.threshold() != key_share.threshold() {
            return Err(
                Reason::InvalidSessionParameters("threshold doesn't match the key share").into(),
            );
        }
        if params.n() <= usize::from(key_share.threshold()) {
            return Err(Reason::InvalidSessionParameters("at least t+1 signers are required").into());
        }

        let mut ids = Vec::with_capacity(params.n());
        let mut public_shares = Vec::with_capacity(params.n());
        for signer in params.parties() {
            let j = key_share.index_of(signer).ok_or(Reason::InvalidSessionParameters(
                "signer doesn't hold a key share",
            ))?;
            ids.push(key_share.share_ids()[j]);
            public_shares.push(key_share.public_shares()[j]);
        }

        let lambda_i = vss::lagrange_coefficient(&ids, &ids[params.index()])
            .ok_or(Reason::Bug("signers share ids repeat"))?;
        let mut wi = lambda_i * key_share.secrets().secret_share().as_ref();
        let wi = SecretScalar::new(&mut wi);

        let state = State::new(
            &params,
            utils::fork_rng(rng),
            msg.to_vec(),
            key_share.public_key(),
            ids,
            public_shares,
            wi,
        );
        Ok(Signing {
            session: Session::new(params, "signing", msg::KINDS, Box::new(outbox), state),
        })
    }
}

/// Signing protocol engine
pub struct Signing<C: Ciphersuite> {
    session: Arc<SigningSession<C>>,
}

impl<C: Ciphersuite> Party for Signing<C> {
    type Output = Signature<C>;

    fn party_id(&self) -> &PartyId {
        self.session.me()
    }

    fn start(&self) -> Result<(), Error> {
        self.session.mark_started()?;
        let result = rounds::round1(&self.session);
        if let Err(err) = &result {
            self.session.abort(err.clone());
        }
        result
    }

    fn validate_message(&self, envelope: &Envelope) -> Result<(), Error> {
        self.session.validate(envelope)
    }

    fn store_message(&self, envelope: Envelope) -> Result<(), Error> {
        self.session.deliver(envelope)
    }

    fn waiting_for(&self) -> Result<Vec<PartyId>, Error> {
        self.session.waiting_for()
    }

    fn output(&self) -> Result<Option<Signature<C>>, Error> {
        self.session.output()?.transpose()
    }
}

impl<C: Ciphersuite> core::fmt::Debug for Signing<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signing")
            .field("ciphersuite", &C::NAME)
            .field("party", self.session.me())
            .finish_non_exhaustive()
    }
}
