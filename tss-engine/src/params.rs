//! Session parameters

use core::fmt;
use std::time::Duration;

use generic_ec::{Curve, NonZero, Scalar};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Reason};

/// Default budget for pre-parameters generation
pub const DEFAULT_PRE_PARAMS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Identity of a protocol participant
///
/// Parties are compared, ordered and hashed by their `key` only. The moniker is a human-readable
/// label used in logs and errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyId {
    /// Human-readable name
    pub moniker: String,
    /// Stable integer key, must be non-zero and unique within a session
    pub key: u64,
}

impl PartyId {
    /// Constructs a party identity
    pub fn new(moniker: impl Into<String>, key: u64) -> Self {
        Self {
            moniker: moniker.into(),
            key,
        }
    }

    /// Shamir share identifier of the party: its key as a scalar
    ///
    /// Returns `None` if key is zero.
    pub fn share_id<E: Curve>(&self) -> Option<NonZero<Scalar<E>>> {
        NonZero::from_scalar(Scalar::from(self.key))
    }
}

impl PartialEq for PartyId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for PartyId {}
impl PartialOrd for PartyId {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PartyId {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}
impl core::hash::Hash for PartyId {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.moniker, self.key)
    }
}

/// Bit lengths of primes used in pre-parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeBits {
    /// Bit length of each safe prime `P = 2p + 1` making up `NTilde`
    pub safe_prime: u32,
    /// Bit length of the Paillier modulus
    pub paillier_modulus: u32,
}

impl PrimeBits {
    /// Minimal bit length of a safe prime accepted by the prime search
    pub const MIN_SAFE_PRIME: u32 = 32;

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.safe_prime < Self::MIN_SAFE_PRIME {
            return Err(Reason::InvalidSessionParameters("safe prime is too short").into());
        }
        if self.paillier_modulus < 2 * Self::MIN_SAFE_PRIME || self.paillier_modulus % 2 != 0 {
            return Err(Reason::InvalidSessionParameters(
                "paillier modulus must be even and at least 64 bits long",
            )
            .into());
        }
        Ok(())
    }
}

impl Default for PrimeBits {
    fn default() -> Self {
        Self {
            safe_prime: 1024,
            paillier_modulus: 2048,
        }
    }
}

/// Parameters of one protocol run
///
/// Built once and immutable afterwards. Parties are kept sorted by key, and every per-party
/// vector produced by the protocol follows that order.
#[derive(Debug, Clone)]
pub struct SessionParameters {
    parties: Vec<PartyId>,
    party: PartyId,
    index: usize,
    threshold: u16,
    concurrency: usize,
    pre_params_timeout: Duration,
    prime_bits: PrimeBits,
    session_nonce: Vec<u8>,
}

impl SessionParameters {
    /// Constructs session parameters
    ///
    /// * `parties`: every participant of the session, including this one
    /// * `party`: identity of this participant
    /// * `threshold`: `t` such that any `t + 1` parties can sign, `1 <= t < n`
    pub fn new(
        parties: impl IntoIterator<Item = PartyId>,
        party: PartyId,
        threshold: u16,
    ) -> Result<Self, Error> {
        let mut parties = parties.into_iter().collect::<Vec<_>>();
        parties.sort_unstable();

        if parties.iter().any(|p| p.key == 0) {
            return Err(Reason::InvalidSessionParameters("party key must be non-zero").into());
        }
        if parties.windows(2).any(|w| w[0] == w[1]) {
            return Err(Reason::InvalidSessionParameters("party keys must be distinct").into());
        }
        if threshold < 1 || usize::from(threshold) >= parties.len() {
            return Err(
                Reason::InvalidSessionParameters("threshold must satisfy 1 <= t < n").into(),
            );
        }
        let index = parties
            .binary_search(&party)
            .map_err(|_| Reason::InvalidSessionParameters("party is not in the list"))?;

        Ok(Self {
            parties,
            party,
            index,
            threshold,
            concurrency: 0,
            pre_params_timeout: DEFAULT_PRE_PARAMS_TIMEOUT,
            prime_bits: PrimeBits::default(),
            session_nonce: Vec::new(),
        })
    }

    /// Sets worker concurrency for pre-parameters generation
    ///
    /// `0` (default) means the amount of available hardware parallelism.
    pub fn set_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets time budget for pre-parameters generation
    pub fn set_pre_params_timeout(mut self, timeout: Duration) -> Self {
        self.pre_params_timeout = timeout;
        self
    }

    /// Sets prime sizes for pre-parameters generation and validation
    pub fn set_prime_bits(mut self, prime_bits: PrimeBits) -> Result<Self, Error> {
        prime_bits.validate()?;
        self.prime_bits = prime_bits;
        Ok(self)
    }

    /// Sets a nonce mixed into the session identifier
    ///
    /// Distinct runs among the same parties should use distinct nonces.
    pub fn set_session_nonce(mut self, nonce: impl Into<Vec<u8>>) -> Self {
        self.session_nonce = nonce.into();
        self
    }

    /// All parties, sorted by key
    pub fn parties(&self) -> &[PartyId] {
        &self.parties
    }
    /// This party
    pub fn party(&self) -> &PartyId {
        &self.party
    }
    /// Position of this party in [`parties`](Self::parties)
    pub fn index(&self) -> usize {
        self.index
    }
    /// Threshold `t`
    pub fn threshold(&self) -> u16 {
        self.threshold
    }
    /// Number of parties `n`
    pub fn n(&self) -> usize {
        self.parties.len()
    }
    /// Worker concurrency, resolved against available parallelism
    pub fn concurrency(&self) -> usize {
        if self.concurrency > 0 {
            self.concurrency
        } else {
            default_concurrency()
        }
    }
    /// Time budget for pre-parameters generation
    pub fn pre_params_timeout(&self) -> Duration {
        self.pre_params_timeout
    }
    /// Prime sizes
    pub fn prime_bits(&self) -> PrimeBits {
        self.prime_bits
    }
    /// Session nonce
    pub fn session_nonce(&self) -> &[u8] {
        &self.session_nonce
    }

    /// Every party except this one, in the session order
    pub fn others(&self) -> Vec<PartyId> {
        self.parties
            .iter()
            .filter(|p| **p != self.party)
            .cloned()
            .collect()
    }

    /// Position of the party in [`parties`](Self::parties)
    pub fn index_of(&self, party: &PartyId) -> Option<usize> {
        self.parties.binary_search(party).ok()
    }

    /// Share identifiers of every party, in the session order
    pub(crate) fn share_ids<E: Curve>(&self) -> Result<Vec<NonZero<Scalar<E>>>, Error> {
        self.parties
            .iter()
            .map(|p| {
                p.share_id()
                    .ok_or(Reason::InvalidSessionParameters("party key must be non-zero").into())
            })
            .collect()
    }
}

pub(crate) fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
