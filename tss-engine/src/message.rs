//! Message envelope
//!
//! Every protocol message travels as an [`Envelope`]: a type tag, the sender, an optional
//! recipient (absent for broadcast) and a JSON payload whose schema is determined by the type
//! tag. On the wire it looks like:
//!
//! ```json
//! { "type": "ecdsa:keygen:round1", "from": { "moniker": "alice", "key": 1 }, "data": { .. } }
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{Error, Reason},
    params::PartyId,
};

/// Typed, addressed protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Type tag, determines schema of `data`
    #[serde(rename = "type")]
    pub kind: String,
    /// Sender
    pub from: PartyId,
    /// Recipient, `None` if message is broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PartyId>,
    /// Payload
    pub data: serde_json::Value,
}

impl Envelope {
    /// Wraps a payload into an envelope
    pub fn wrap<T: Serialize>(
        kind: impl Into<String>,
        payload: &T,
        from: PartyId,
        to: Option<PartyId>,
    ) -> Result<Self, Error> {
        let data = serde_json::to_value(payload)
            .map_err(|err| Reason::MalformedMessage(format!("serialize payload: {err}")))?;
        Ok(Self {
            kind: kind.into(),
            from,
            to,
            data,
        })
    }

    /// Decodes the payload
    ///
    /// Returns validation error blaming the sender if payload doesn't fit the schema.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, Error> {
        T::deserialize(&self.data).map_err(|err| {
            Reason::MalformedMessage(format!("{} payload: {err}", self.kind)).blame(&self.from)
        })
    }

    /// Indicates whether the message is broadcast
    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }
}
