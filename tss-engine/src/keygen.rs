//! Distributed key generation
//!
//! Threshold ECDSA-style key generation with Feldman VSS. Every party needs [pre-parameters]
//! (a Paillier keypair and ring-Pedersen parameters). They can be generated ahead of time and
//! supplied via [`KeygenBuilder::set_pre_params`], otherwise they're generated in round 1
//! within the session's time budget.
//!
//! The protocol takes three rounds of messages:
//! 1. Commitment to the sharing polynomial, Paillier modulus, `(NTilde, h1, h2)` along with two
//!    proofs that `h1` and `h2` generate the same group
//! 2. Every peer receives its share and a proof that our Paillier modulus has no small factors;
//!    polynomial commitment is opened to everyone along with a Paillier-Blum modulus proof
//! 3. Paillier key correctness proof bound to the resulting public key
//!
//! Any invalid commitment, proof or share aborts the session naming the party who sent it.
//!
//! [pre-parameters]: crate::pre_params
//!
//! ## Example
//! ```rust,no_run
//! # fn doc_fn(
//! #     params: tss_engine::SessionParameters,
//! #     outbox: futures::channel::mpsc::UnboundedSender<tss_engine::message::Envelope>,
//! # ) -> Result<(), tss_engine::Error> {
//! use tss_engine::generic_ec::curves::Secp256k1;
//!
//! let mut rng = rand_core::OsRng;
//! let keygen = tss_engine::keygen::<Secp256k1>(params).build(outbox, &mut rng);
//! keygen.start()?;
//! // deliver incoming messages via `keygen.update(envelope)` until `keygen.output()` is ready
//! # Ok(()) }
//! ```

use std::{marker::PhantomData, sync::Arc};

use generic_ec::Curve;
use rand_core::{CryptoRng, RngCore};

use crate::{
    error::{Error, Reason},
    key::KeyShare,
    message::Envelope,
    params::{PartyId, SessionParameters},
    participant::{Participant, Party},
    pre_params::DirtyPreParams,
    round::Session,
    transport::Outbox,
    utils,
};

pub mod msg;
mod rounds;

use self::rounds::{KeygenSession, State};

/// Builder for keygen protocol
pub struct KeygenBuilder<E: Curve> {
    params: SessionParameters,
    pre_params: Option<DirtyPreParams>,
    _curve: PhantomData<E>,
}

impl<E: Curve> KeygenBuilder<E> {
    /// Constructs a keygen builder
    ///
    /// It could be easier to use [keygen](crate::keygen()) function located in the crate root.
    pub fn new(params: SessionParameters) -> Self {
        Self {
            params,
            pre_params: None,
            _curve: PhantomData,
        }
    }

    /// Supplies previously generated pre-parameters
    ///
    /// They're validated when the protocol is built. If not set, pre-parameters are generated
    /// in round 1.
    pub fn set_pre_params(mut self, pre_params: impl Into<DirtyPreParams>) -> Self {
        self.pre_params = Some(pre_params.into());
        self
    }

    /// Builds the protocol
    ///
    /// Outgoing messages are sent to `outbox`. Returns [`Participant::Failed`] if supplied
    /// pre-parameters are invalid or don't match the session prime sizes.
    pub fn build<R: RngCore + CryptoRng>(
        self,
        outbox: impl Outbox + 'static,
        rng: &mut R,
    ) -> Participant<Keygen<E>> {
        self.try_build(outbox, rng).into()
    }

    fn try_build<R: RngCore + CryptoRng>(
        self,
        outbox: impl Outbox + 'static,
        rng: &mut R,
    ) -> Result<Keygen<E>, Error> {
        let pre_params = self.pre_params.map(DirtyPreParams::validate).transpose()?;
        if let Some(pre_params) = &pre_params {
            let bits = self.params.prime_bits();
            if pre_params.paillier_sk().public_key().n().significant_bits() != bits.paillier_modulus
                || pre_params.ntilde().significant_bits() != 2 * bits.safe_prime
            {
                return Err(Reason::InconsistentPreParams(
                    "prime sizes don't match session parameters",
                )
                .into());
            }
        }
        let state = State::new(&self.params, utils::fork_rng(rng), pre_params)?;
        Ok(Keygen {
            session: Session::new(
                self.params,
                "keygen",
                msg::KINDS,
                Box::new(outbox),
                state,
            ),
        })
    }
}

/// Keygen protocol engine
pub struct Keygen<E: Curve> {
    session: Arc<KeygenSession<E>>,
}

impl<E: Curve> Party for Keygen<E> {
    type Output = KeyShare<E>;

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

    fn output(&self) -> Result<Option<KeyShare<E>>, Error> {
        self.session.output()?.transpose()
    }
}

impl<E: Curve> core::fmt::Debug for Keygen<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Keygen")
            .field("party", self.session.me())
            .finish_non_exhaustive()
    }
}
