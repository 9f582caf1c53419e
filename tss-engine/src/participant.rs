//! Protocol participant
//!
//! [`Party`] is implemented by every protocol engine ([`Keygen`](crate::keygen::Keygen),
//! [`Signing`](crate::signing::Signing)). Builders return a [`Participant`], which is either an
//! active engine or a failure that happened while constructing it. A failed participant can
//! be passed around wherever a live one is expected: every operation on it returns the error it
//! was constructed with.

use crate::{error::Error, message::Envelope, params::PartyId, transport::MessageReceiver};

/// Interface of a protocol engine
pub trait Party: Send + Sync {
    /// Output of the protocol
    type Output;

    /// Identity of this party
    fn party_id(&self) -> &PartyId;

    /// Runs the first round
    ///
    /// Returns an error if the protocol was already started.
    fn start(&self) -> Result<(), Error>;

    /// Checks that the message fits the protocol and the session, without side effects
    fn validate_message(&self, envelope: &Envelope) -> Result<(), Error>;

    /// Feeds the message to the protocol
    ///
    /// If the message completes a round, the next round is executed before returning.
    fn store_message(&self, envelope: Envelope) -> Result<(), Error>;

    /// Validates and stores the message
    fn update(&self, envelope: Envelope) -> Result<(), Error> {
        self.validate_message(&envelope)?;
        self.store_message(envelope)
    }

    /// Parties whose messages the protocol is waiting for
    fn waiting_for(&self) -> Result<Vec<PartyId>, Error>;

    /// Protocol output
    ///
    /// `Ok(None)` while the protocol is running, `Err(_)` if it was aborted.
    fn output(&self) -> Result<Option<Self::Output>, Error>;
}

/// Protocol participant: an active engine or a construction failure
#[derive(Debug)]
pub enum Participant<P> {
    /// Engine is ready to run
    Active(P),
    /// Engine couldn't be constructed
    Failed(Error),
}

impl<P: Party> Participant<P> {
    /// Identity of this party
    pub fn party_id(&self) -> Result<&PartyId, Error> {
        match self {
            Self::Active(p) => Ok(p.party_id()),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// See [`Party::start`]
    pub fn start(&self) -> Result<(), Error> {
        match self {
            Self::Active(p) => p.start(),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// See [`Party::validate_message`]
    pub fn validate_message(&self, envelope: &Envelope) -> Result<(), Error> {
        match self {
            Self::Active(p) => p.validate_message(envelope),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// See [`Party::store_message`]
    pub fn store_message(&self, envelope: Envelope) -> Result<(), Error> {
        match self {
            Self::Active(p) => p.store_message(envelope),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// See [`Party::update`]
    pub fn update(&self, envelope: Envelope) -> Result<(), Error> {
        match self {
            Self::Active(p) => p.update(envelope),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// See [`Party::waiting_for`]
    pub fn waiting_for(&self) -> Result<Vec<PartyId>, Error> {
        match self {
            Self::Active(p) => p.waiting_for(),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// See [`Party::output`]
    pub fn output(&self) -> Result<Option<P::Output>, Error> {
        match self {
            Self::Active(p) => p.output(),
            Self::Failed(err) => Err(err.clone()),
        }
    }

    /// Indicates whether construction failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Construction error, if any
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Active(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl<P> From<Result<P, Error>> for Participant<P> {
    fn from(result: Result<P, Error>) -> Self {
        match result {
            Ok(p) => Self::Active(p),
            Err(err) => Self::Failed(err),
        }
    }
}

impl<P: Party> MessageReceiver for Participant<P> {
    fn receive(&self, envelope: Envelope) -> Result<(), Error> {
        self.update(envelope)
    }
}
