//! Message-driven round machinery shared by keygen and signing
//!
//! A [`Session`] owns the protocol state behind a mutex, the outbox and a [`Router`]. A round
//! computes under the state lock, releases it, sends its messages and then arms a barrier for
//! the next batch of messages. The barrier callback runs the next round on whichever thread
//! delivered the last message.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    aggregator::{Aggregator, Barrier},
    error::{Error, ErrorKind, Reason},
    message::Envelope,
    params::{PartyId, SessionParameters},
    transport::Outbox,
    utils,
};

/// How a message type travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Broadcast,
    P2P,
}

pub(crate) struct Session<S, O> {
    params: SessionParameters,
    protocol: &'static str,
    kinds: &'static [(&'static str, Delivery)],
    outbox: Box<dyn Outbox>,
    router: Router,
    started: AtomicBool,
    state: Mutex<S>,
    output: Mutex<Option<Result<O, Error>>>,
}

impl<S, O> Session<S, O>
where
    S: Send + 'static,
    O: Clone + Send + 'static,
{
    pub fn new(
        params: SessionParameters,
        protocol: &'static str,
        kinds: &'static [(&'static str, Delivery)],
        outbox: Box<dyn Outbox>,
        state: S,
    ) -> Arc<Self> {
        Arc::new(Self {
            params,
            protocol,
            kinds,
            outbox,
            router: Router::default(),
            started: AtomicBool::new(false),
            state: Mutex::new(state),
            output: Mutex::new(None),
        })
    }

    pub fn params(&self) -> &SessionParameters {
        &self.params
    }

    pub fn me(&self) -> &PartyId {
        self.params.party()
    }

    /// Fails if the session was already started
    pub fn mark_started(&self) -> Result<(), Error> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Reason::AlreadyStarted.into());
        }
        tracing::debug!(protocol = self.protocol, party = %self.me(), "session started");
        Ok(())
    }

    /// Runs `f` with exclusive access to the state
    ///
    /// `f` must not send messages or arm barriers.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> Result<R, Error>) -> Result<R, Error> {
        let mut state = utils::lock(&self.state)?;
        f(&mut state)
    }

    pub fn broadcast<T: Serialize>(&self, kind: &str, payload: &T) -> Result<(), Error> {
        let envelope = Envelope::wrap(kind, payload, self.me().clone(), None)?;
        self.outbox.send(envelope)
    }

    pub fn send_to<T: Serialize>(&self, kind: &str, to: &PartyId, payload: &T) -> Result<(), Error> {
        let envelope = Envelope::wrap(kind, payload, self.me().clone(), Some(to.clone()))?;
        self.outbox.send(envelope)
    }

    /// Arms a barrier collecting messages of type `kind` from every other party
    ///
    /// Once all of them arrive, `next` is invoked with payloads ordered as the session parties.
    /// Messages that arrived before arming are fed to the barrier right away.
    pub fn arm<T>(
        self: &Arc<Self>,
        kind: &'static str,
        next: impl FnOnce(&Arc<Self>, Vec<PartyId>, Vec<T>) -> Result<(), Error> + Send + 'static,
    ) -> Result<(), Error>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let session = Arc::downgrade(self);
        let aggregator = Aggregator::new(kind, self.params.others(), move |senders, payloads| {
            let session = session
                .upgrade()
                .ok_or(Reason::Bug("session is dropped"))?;
            let result = next(&session, senders, payloads);
            if let Err(err) = &result {
                session.abort(err.clone());
            }
            result
        });
        let result = self.router.arm(kind, Arc::new(aggregator));
        self.settle(result)
    }

    /// Checks that the message fits the protocol and the session
    pub fn validate(&self, envelope: &Envelope) -> Result<(), Error> {
        let from = &envelope.from;
        let delivery = self
            .kinds
            .iter()
            .find(|(kind, _)| *kind == envelope.kind)
            .map(|(_, delivery)| *delivery)
            .ok_or_else(|| Reason::UnknownMessageType(envelope.kind.clone()).blame(from))?;
        if from == self.me() || self.params.index_of(from).is_none() {
            return Err(Reason::UnknownSender.blame(from));
        }
        match &envelope.to {
            Some(to) if to != self.me() => return Err(Reason::WrongRecipient.blame(from)),
            Some(_) if delivery == Delivery::Broadcast => {
                return Err(Reason::WrongDelivery.blame(from))
            }
            None if delivery == Delivery::P2P => return Err(Reason::WrongDelivery.blame(from)),
            _ => (),
        }
        Ok(())
    }

    /// Routes the message to its barrier
    ///
    /// Every delivery after an abort returns the abort error.
    pub fn deliver(&self, envelope: Envelope) -> Result<(), Error> {
        if let Some(Err(err)) = self.output()? {
            return Err(err);
        }
        let result = self.router.route(envelope);
        self.settle(result)
    }

    /// Aborts on any error except protocol violations that didn't change the state
    fn settle(&self, result: Result<(), Error>) -> Result<(), Error> {
        if let Err(err) = &result {
            if err.kind() != ErrorKind::Protocol {
                self.abort(err.clone());
            }
        }
        result
    }

    /// Records the first error as the session outcome
    pub fn abort(&self, err: Error) {
        match utils::lock(&self.output) {
            Ok(mut output) if output.is_none() => {
                tracing::warn!(protocol = self.protocol, party = %self.me(), %err, "session aborted");
                *output = Some(Err(err));
            }
            Ok(_) => (),
            Err(_) => {
                tracing::error!(protocol = self.protocol, party = %self.me(), %err, "couldn't record abort");
            }
        }
    }

    pub fn finish(&self, value: O) -> Result<(), Error> {
        let mut output = utils::lock(&self.output)?;
        if output.is_none() {
            *output = Some(Ok(value));
        }
        Ok(())
    }

    /// `None` while the session is running
    pub fn output(&self) -> Result<Option<Result<O, Error>>, Error> {
        Ok(utils::lock(&self.output)?.clone())
    }

    /// Parties whose messages for the armed barriers are still missing
    pub fn waiting_for(&self) -> Result<Vec<PartyId>, Error> {
        if let Some(Err(err)) = self.output()? {
            return Err(err);
        }
        self.router.waiting_for()
    }
}

/// Dispatches messages to barriers by type, buffering messages for barriers not armed yet
#[derive(Default)]
pub(crate) struct Router {
    inner: Mutex<RouterState>,
}

#[derive(Default)]
struct RouterState {
    armed: HashMap<String, Arc<dyn Barrier>>,
    pending: Vec<Envelope>,
}

impl Router {
    pub fn route(&self, envelope: Envelope) -> Result<(), Error> {
        let barrier = {
            let mut inner = utils::lock(&self.inner)?;
            match inner.armed.get(&envelope.kind) {
                Some(barrier) => barrier.clone(),
                None => {
                    if inner
                        .pending
                        .iter()
                        .any(|e| e.kind == envelope.kind && e.from == envelope.from)
                    {
                        return Err(Reason::DuplicateMessage.blame(&envelope.from));
                    }
                    tracing::trace!(kind = %envelope.kind, from = %envelope.from, "buffered early message");
                    inner.pending.push(envelope);
                    return Ok(());
                }
            }
        };
        barrier.receive(&envelope)
    }

    /// Registers the barrier and feeds it with buffered messages of its type
    ///
    /// Returns the first error produced by buffered messages, the rest are still delivered.
    pub fn arm(&self, kind: &str, barrier: Arc<dyn Barrier>) -> Result<(), Error> {
        let buffered = {
            let mut inner = utils::lock(&self.inner)?;
            if inner.armed.contains_key(kind) {
                return Err(Reason::Bug("barrier is armed twice").into());
            }
            inner.armed.insert(kind.to_owned(), barrier.clone());
            let (buffered, rest) = core::mem::take(&mut inner.pending)
                .into_iter()
                .partition::<Vec<_>, _>(|e| e.kind == kind);
            inner.pending = rest;
            buffered
        };

        let mut result = Ok(());
        for envelope in buffered {
            let delivered = barrier.receive(&envelope);
            if result.is_ok() {
                result = delivered;
            }
        }
        result
    }

    pub fn waiting_for(&self) -> Result<Vec<PartyId>, Error> {
        let barriers = utils::lock(&self.inner)?
            .armed
            .values()
            .cloned()
            .collect::<Vec<_>>();
        let mut parties = Vec::new();
        for barrier in barriers {
            parties.extend(barrier.waiting_for()?);
        }
        parties.sort_unstable();
        parties.dedup();
        Ok(parties)
    }
}
