//! Errors
//!
//! Every failure in the crate is reported as [`Error`]. It carries a coarse [`ErrorKind`], a
//! human-readable reason and the list of parties believed to be responsible for the failure, if
//! that can be determined.

use core::fmt;

use crate::params::PartyId;

/// Error returned by the protocol engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}{}", Culprits(.culprits))]
pub struct Error {
    reason: Reason,
    culprits: Vec<PartyId>,
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or insufficient input: pre-parameters, proofs, shares, payloads or
    /// session parameters
    Validation,
    /// Parameter search ran out of time or was cancelled
    Timeout,
    /// Message doesn't fit the protocol: wrong type, unknown sender, duplicate delivery, etc.
    Protocol,
    /// Final signature didn't verify against the group public key
    Verification,
    /// Internal invariant was broken
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum Reason {
    #[error("invalid session parameters: {0}")]
    InvalidSessionParameters(&'static str),
    #[error("pre-parameters are incomplete: {0}")]
    MissingPreParams(&'static str),
    #[error("pre-parameters are outdated: prime factors or alpha/beta are missing")]
    OutdatedPreParams,
    #[error("pre-parameters are inconsistent: {0}")]
    InconsistentPreParams(&'static str),
    #[error("generated number failed primality test")]
    NotPrime,
    #[error("invalid modulus: {0}")]
    InvalidModulus(&'static str),
    #[error("invalid {0} proof")]
    InvalidProof(&'static str),
    #[error("de-commitment doesn't match the commitment")]
    InvalidDecommitment,
    #[error("secret share doesn't match the polynomial commitment")]
    InvalidShare,
    #[error("invalid key share: {0}")]
    InvalidKeyShare(&'static str),
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("parameter generation timed out or was cancelled")]
    Timeout,

    #[error("unexpected message type: expected {expected}, got {got}")]
    UnexpectedMessageType { expected: String, got: String },
    #[error("unknown message type {0}")]
    UnknownMessageType(String),
    #[error("message from unknown sender")]
    UnknownSender,
    #[error("message received twice from the same sender")]
    DuplicateMessage,
    #[error("all expected messages were already received")]
    AlreadyCompleted,
    #[error("no handler registered for message type {0}")]
    NoHandler(String),
    #[error("message is addressed to another party")]
    WrongRecipient,
    #[error("message was delivered point-to-point but must be broadcast, or vice versa")]
    WrongDelivery,
    #[error("protocol was already started")]
    AlreadyStarted,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("outbox is closed")]
    OutboxClosed,
    #[error("bug occurred: {0}")]
    Bug(&'static str),
}

impl Error {
    /// Kind of the error
    pub fn kind(&self) -> ErrorKind {
        match &self.reason {
            Reason::InvalidSessionParameters(_)
            | Reason::MissingPreParams(_)
            | Reason::OutdatedPreParams
            | Reason::InconsistentPreParams(_)
            | Reason::NotPrime
            | Reason::InvalidModulus(_)
            | Reason::InvalidProof(_)
            | Reason::InvalidDecommitment
            | Reason::InvalidShare
            | Reason::InvalidKeyShare(_)
            | Reason::MalformedMessage(_) => ErrorKind::Validation,
            Reason::Timeout => ErrorKind::Timeout,
            Reason::UnexpectedMessageType { .. }
            | Reason::UnknownMessageType(_)
            | Reason::UnknownSender
            | Reason::DuplicateMessage
            | Reason::AlreadyCompleted
            | Reason::NoHandler(_)
            | Reason::WrongRecipient
            | Reason::WrongDelivery
            | Reason::AlreadyStarted => ErrorKind::Protocol,
            Reason::InvalidSignature => ErrorKind::Verification,
            Reason::OutboxClosed | Reason::Bug(_) => ErrorKind::Internal,
        }
    }

    /// Parties believed to be responsible for the error
    ///
    /// Empty if the responsible party couldn't be determined or the error is local.
    pub fn culprits(&self) -> &[PartyId] {
        &self.culprits
    }

    /// Attaches a responsible party to the error
    pub(crate) fn with_culprit(mut self, party: &PartyId) -> Self {
        if !self.culprits.contains(party) {
            self.culprits.push(party.clone());
        }
        self
    }

    /// Attaches a list of responsible parties to the error
    pub(crate) fn with_culprits<'p>(self, parties: impl IntoIterator<Item = &'p PartyId>) -> Self {
        parties
            .into_iter()
            .fold(self, |err, party| err.with_culprit(party))
    }
}

impl Reason {
    pub(crate) fn blame(self, party: &PartyId) -> Error {
        Error::from(self).with_culprit(party)
    }
}

impl From<Reason> for Error {
    fn from(reason: Reason) -> Self {
        Self {
            reason,
            culprits: Vec::new(),
        }
    }
}

struct Culprits<'a>(&'a [PartyId]);

impl fmt::Display for Culprits<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((first, rest)) = self.0.split_first() else {
            return Ok(());
        };
        write!(f, " (culprits: {first}")?;
        for party in rest {
            write!(f, ", {party}")?;
        }
        f.write_str(")")
    }
}

/// Result alias with [`Error`]
pub type Result<T, E = Error> = core::result::Result<T, E>;
