//! Transport contract
//!
//! The engine never talks to a network itself. Outbound messages are handed to an [`Outbox`];
//! inbound messages are pushed into a [`MessageReceiver`]. A [`MessageBroker`] routes inbound
//! messages to the receiver registered for their type.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    error::{Error, Reason},
    message::Envelope,
};

/// Consumer of inbound messages
pub trait MessageReceiver: Send + Sync {
    /// Delivers a message
    fn receive(&self, envelope: Envelope) -> Result<(), Error>;
}

impl<R: MessageReceiver + ?Sized> MessageReceiver for Arc<R> {
    fn receive(&self, envelope: Envelope) -> Result<(), Error> {
        (**self).receive(envelope)
    }
}

/// Routes inbound messages to receivers registered per message type
pub trait MessageBroker: MessageReceiver {
    /// Registers `receiver` as the handler of messages of type `kind`
    ///
    /// Replaces previously registered handler, if any.
    fn connect(&self, kind: &str, receiver: Arc<dyn MessageReceiver>);
}

/// Sink for outbound messages
pub trait Outbox: Send + Sync {
    /// Sends a message
    fn send(&self, envelope: Envelope) -> Result<(), Error>;
}

impl Outbox for futures::channel::mpsc::UnboundedSender<Envelope> {
    fn send(&self, envelope: Envelope) -> Result<(), Error> {
        self.unbounded_send(envelope)
            .map_err(|_| Reason::OutboxClosed.into())
    }
}

impl<O: Outbox + ?Sized> Outbox for Arc<O> {
    fn send(&self, envelope: Envelope) -> Result<(), Error> {
        (**self).send(envelope)
    }
}

/// In-process [`MessageBroker`]
#[derive(Default)]
pub struct LocalBroker {
    handlers: RwLock<HashMap<String, Arc<dyn MessageReceiver>>>,
}

impl LocalBroker {
    /// Constructs a broker with no handlers
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageReceiver for LocalBroker {
    fn receive(&self, envelope: Envelope) -> Result<(), Error> {
        let handler = self
            .handlers
            .read()
            .map_err(|_| Reason::Bug("broker lock is poisoned"))?
            .get(&envelope.kind)
            .cloned();
        match handler {
            Some(handler) => handler.receive(envelope),
            None => Err(Reason::NoHandler(envelope.kind).into()),
        }
    }
}

impl MessageBroker for LocalBroker {
    fn connect(&self, kind: &str, receiver: Arc<dyn MessageReceiver>) {
        match self.handlers.write() {
            Ok(mut handlers) => {
                handlers.insert(kind.to_owned(), receiver);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(kind.to_owned(), receiver);
            }
        }
    }
}
