//! Message aggregation barrier
//!
//! [`Aggregator`] waits for exactly one message of a given type from every expected sender.
//! Once the last missing message arrives, the completion callback is invoked exactly once with
//! the senders and their payloads ordered as the expected senders list (not in arrival order).
//!
//! Messages may be delivered concurrently from several threads. Recording a message and counting
//! down the missing ones happens in a single critical section, so exactly one delivery observes
//! completion. The callback itself runs on that thread after the lock is released.
//!
//! There's no timeout: if some sender never delivers, the aggregator waits forever.

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::{
    error::{Error, Reason},
    message::Envelope,
    params::PartyId,
    transport::MessageReceiver,
    utils,
};

type OnComplete<T> = Box<dyn FnOnce(Vec<PartyId>, Vec<T>) -> Result<(), Error> + Send>;

/// Barrier collecting one payload of type `T` per expected sender
pub struct Aggregator<T> {
    kind: String,
    expected: Vec<PartyId>,
    state: Mutex<State<T>>,
}

struct State<T> {
    packets: Vec<Option<T>>,
    missing: usize,
    on_complete: Option<OnComplete<T>>,
}

impl<T: DeserializeOwned + Send> Aggregator<T> {
    /// Constructs an aggregator
    ///
    /// * `kind`: type tag of accepted messages
    /// * `expected`: senders, output of the aggregator follows this order
    /// * `on_complete`: invoked once all expected messages are received
    pub fn new(
        kind: impl Into<String>,
        expected: Vec<PartyId>,
        on_complete: impl FnOnce(Vec<PartyId>, Vec<T>) -> Result<(), Error> + Send + 'static,
    ) -> Self {
        let packets = expected.iter().map(|_| None).collect();
        Self {
            kind: kind.into(),
            state: Mutex::new(State {
                packets,
                missing: expected.len(),
                on_complete: Some(Box::new(on_complete)),
            }),
            expected,
        }
    }

    /// Type tag of accepted messages
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Receives a message
    ///
    /// Rejected messages leave the aggregator untouched. If the message completes the
    /// aggregator, the completion callback is invoked and its result is returned.
    pub fn receive(&self, envelope: &Envelope) -> Result<(), Error> {
        if envelope.kind != self.kind {
            return Err(Reason::UnexpectedMessageType {
                expected: self.kind.clone(),
                got: envelope.kind.clone(),
            }
            .blame(&envelope.from));
        }

        let completed = {
            let mut state = utils::lock(&self.state)?;
            if state.on_complete.is_none() {
                return Err(Reason::AlreadyCompleted.blame(&envelope.from));
            }
            let index = self
                .expected
                .iter()
                .position(|p| p.key == envelope.from.key)
                .ok_or_else(|| Reason::UnknownSender.blame(&envelope.from))?;
            if state.packets[index].is_some() {
                return Err(Reason::DuplicateMessage.blame(&envelope.from));
            }
            let payload = envelope.payload::<T>()?;

            state.packets[index] = Some(payload);
            state.missing -= 1;

            if state.missing == 0 {
                let on_complete = state
                    .on_complete
                    .take()
                    .ok_or(Reason::Bug("completion callback is missing"))?;
                let packets = core::mem::take(&mut state.packets)
                    .into_iter()
                    .collect::<Option<Vec<_>>>()
                    .ok_or(Reason::Bug("aggregator completed with missing packets"))?;
                Some((on_complete, packets))
            } else {
                None
            }
        };

        match completed {
            Some((on_complete, packets)) => {
                tracing::trace!(kind = %self.kind, "all messages received");
                on_complete(self.expected.clone(), packets)
            }
            None => Ok(()),
        }
    }

    /// Senders whose messages are still missing
    pub fn waiting_for(&self) -> Result<Vec<PartyId>, Error> {
        let state = utils::lock(&self.state)?;
        if state.on_complete.is_none() {
            return Ok(Vec::new());
        }
        Ok(self
            .expected
            .iter()
            .zip(&state.packets)
            .filter(|(_, packet)| packet.is_none())
            .map(|(party, _)| party.clone())
            .collect())
    }

    /// Indicates whether every expected message was received
    pub fn is_complete(&self) -> bool {
        utils::lock(&self.state)
            .map(|state| state.on_complete.is_none())
            .unwrap_or(false)
    }
}

impl<T: DeserializeOwned + Send> MessageReceiver for Aggregator<T> {
    fn receive(&self, envelope: Envelope) -> Result<(), Error> {
        Aggregator::receive(self, &envelope)
    }
}

/// Type-erased barrier, lets a round engine keep aggregators of different payload types together
pub(crate) trait Barrier: Send + Sync {
    fn receive(&self, envelope: &Envelope) -> Result<(), Error>;
    fn waiting_for(&self) -> Result<Vec<PartyId>, Error>;
}

impl<T: DeserializeOwned + Send> Barrier for Aggregator<T> {
    fn receive(&self, envelope: &Envelope) -> Result<(), Error> {
        Aggregator::receive(self, envelope)
    }
    fn waiting_for(&self) -> Result<Vec<PartyId>, Error> {
        Aggregator::waiting_for(self)
    }
}
