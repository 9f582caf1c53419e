//! Key share
//!
//! [`KeyShare`] is the output of distributed key generation. Every per-party vector in it is
//! indexed by the party's position in the session's sorted party list.
//!
//! Key shares are serde-serializable to be persisted. Serialized form contains the secret
//! share, so it must be stored securely. Deserialization runs [`KeyShare::validate`] and fails
//! on an inconsistent key share.

use generic_ec::{Curve, NonZero, Point, Scalar, SecretScalar};
use paillier_zk::rug::Integer;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Reason},
    paillier,
    params::PartyId,
    pre_params::PreParams,
    utils::hex_int,
};

/// Secret state of a party that is never transmitted
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct LocalSecrets<E: Curve> {
    #[serde(with = "secret_scalar")]
    pub(crate) xi: SecretScalar<E>,
    pub(crate) share_id: NonZero<Scalar<E>>,
}

impl<E: Curve> LocalSecrets<E> {
    /// Secret share `x_i` of the group secret key
    pub fn secret_share(&self) -> &SecretScalar<E> {
        &self.xi
    }
    /// Share identifier `k_i`
    pub fn share_id(&self) -> &NonZero<Scalar<E>> {
        &self.share_id
    }
}

impl<E: Curve> core::fmt::Debug for LocalSecrets<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalSecrets")
            .field("share_id", &self.share_id)
            .finish_non_exhaustive()
    }
}

/// Key share of one party
///
/// Every instance is [validated](KeyShare::validate), including deserialized ones.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "", try_from = "DirtyKeyShare<E>")]
pub struct KeyShare<E: Curve> {
    pub(crate) pre_params: PreParams,
    pub(crate) secrets: LocalSecrets<E>,
    pub(crate) parties: Vec<PartyId>,
    pub(crate) index: usize,
    pub(crate) threshold: u16,
    pub(crate) ks: Vec<NonZero<Scalar<E>>>,
    #[serde(with = "hex_int::vec")]
    pub(crate) ntilde: Vec<Integer>,
    #[serde(with = "hex_int::vec")]
    pub(crate) h1: Vec<Integer>,
    #[serde(with = "hex_int::vec")]
    pub(crate) h2: Vec<Integer>,
    pub(crate) big_x: Vec<Point<E>>,
    pub(crate) paillier_pks: Vec<paillier::PublicKey>,
    pub(crate) public_key: Point<E>,
}

impl<E: Curve> KeyShare<E> {
    /// Pre-parameters of this party
    pub fn pre_params(&self) -> &PreParams {
        &self.pre_params
    }
    /// Secrets of this party
    pub fn secrets(&self) -> &LocalSecrets<E> {
        &self.secrets
    }
    /// Every party that holds a share, sorted by key
    pub fn parties(&self) -> &[PartyId] {
        &self.parties
    }
    /// The party owning this share
    pub fn owner(&self) -> &PartyId {
        // index is checked against the party list by `validate`
        &self.parties[self.index]
    }
    /// Position of the owner in [`parties`](Self::parties)
    pub fn index(&self) -> usize {
        self.index
    }
    /// Threshold `t`: any `t + 1` parties can sign
    pub fn threshold(&self) -> u16 {
        self.threshold
    }
    /// Share identifiers of every party
    pub fn share_ids(&self) -> &[NonZero<Scalar<E>>] {
        &self.ks
    }
    /// `NTilde` of every party
    pub fn ntilde(&self) -> &[Integer] {
        &self.ntilde
    }
    /// `h1` of every party
    pub fn h1(&self) -> &[Integer] {
        &self.h1
    }
    /// `h2` of every party
    pub fn h2(&self) -> &[Integer] {
        &self.h2
    }
    /// Public share `X_j = x_j G` of every party
    pub fn public_shares(&self) -> &[Point<E>] {
        &self.big_x
    }
    /// Paillier public key of every party
    pub fn paillier_pks(&self) -> &[paillier::PublicKey] {
        &self.paillier_pks
    }
    /// Group public key
    pub fn public_key(&self) -> Point<E> {
        self.public_key
    }

    /// Position of the party in [`parties`](Self::parties)
    pub fn index_of(&self, party: &PartyId) -> Option<usize> {
        self.parties.binary_search(party).ok()
    }

    /// Checks consistency of the key share
    ///
    /// Public shares must all lie on one polynomial of degree `t` whose constant term is the
    /// public key, and share ids must be derived from the party keys.
    pub fn validate(&self) -> Result<(), Error> {
        let n = self.parties.len();
        if [
            self.ks.len(),
            self.ntilde.len(),
            self.h1.len(),
            self.h2.len(),
            self.big_x.len(),
            self.paillier_pks.len(),
        ] != [n; 6]
        {
            return Err(Reason::InvalidKeyShare("per-party vectors have inconsistent lengths").into());
        }
        if self.index >= n || self.threshold < 1 || usize::from(self.threshold) >= n {
            return Err(Reason::InvalidKeyShare("index or threshold is out of range").into());
        }
        if !self.parties.windows(2).all(|w| w[0] < w[1]) {
            return Err(Reason::InvalidKeyShare("parties must be sorted and distinct").into());
        }
        if !self
            .parties
            .iter()
            .zip(&self.ks)
            .all(|(party, k)| party.share_id::<E>() == Some(*k))
        {
            return Err(Reason::InvalidKeyShare("share ids don't match party keys").into());
        }
        if (1..n).any(|j| self.ks[..j].contains(&self.ks[j])) {
            return Err(Reason::InvalidKeyShare("share ids repeat").into());
        }
        if self.ks[self.index] != self.secrets.share_id {
            return Err(Reason::InvalidKeyShare("share id mismatch").into());
        }
        if Point::generator() * self.secrets.xi.as_ref() != self.big_x[self.index] {
            return Err(Reason::InvalidKeyShare("secret share doesn't match public share").into());
        }
        if self.pre_params.paillier_sk().public_key() != &self.paillier_pks[self.index]
            || self.pre_params.ntilde() != &self.ntilde[self.index]
        {
            return Err(Reason::InvalidKeyShare("pre-parameters don't match public data").into());
        }

        // first t+1 public shares define the polynomial, the rest must lie on it
        let t = usize::from(self.threshold);
        let (ids, points) = (&self.ks[..=t], &self.big_x[..=t]);
        let at = |x: &Scalar<E>| {
            crate::vss::interpolate_at(ids, points, x)
                .ok_or(Reason::InvalidKeyShare("share ids repeat"))
        };
        if at(&Scalar::zero())? != self.public_key {
            return Err(Reason::InvalidKeyShare("public shares don't match public key").into());
        }
        for (k, x) in self.ks.iter().zip(&self.big_x).skip(t + 1) {
            if at(k.as_ref())? != *x {
                return Err(Reason::InvalidKeyShare(
                    "public shares don't lie on a polynomial of degree t",
                )
                .into());
            }
        }
        Ok(())
    }
}

/// Key share that hasn't been validated yet
#[derive(Deserialize)]
#[serde(bound = "")]
struct DirtyKeyShare<E: Curve> {
    pre_params: PreParams,
    secrets: LocalSecrets<E>,
    parties: Vec<PartyId>,
    index: usize,
    threshold: u16,
    ks: Vec<NonZero<Scalar<E>>>,
    #[serde(with = "hex_int::vec")]
    ntilde: Vec<Integer>,
    #[serde(with = "hex_int::vec")]
    h1: Vec<Integer>,
    #[serde(with = "hex_int::vec")]
    h2: Vec<Integer>,
    big_x: Vec<Point<E>>,
    paillier_pks: Vec<paillier::PublicKey>,
    public_key: Point<E>,
}

impl<E: Curve> TryFrom<DirtyKeyShare<E>> for KeyShare<E> {
    type Error = Error;

    fn try_from(dirty: DirtyKeyShare<E>) -> Result<Self, Error> {
        let key_share = Self {
            pre_params: dirty.pre_params,
            secrets: dirty.secrets,
            parties: dirty.parties,
            index: dirty.index,
            threshold: dirty.threshold,
            ks: dirty.ks,
            ntilde: dirty.ntilde,
            h1: dirty.h1,
            h2: dirty.h2,
            big_x: dirty.big_x,
            paillier_pks: dirty.paillier_pks,
            public_key: dirty.public_key,
        };
        key_share.validate()?;
        Ok(key_share)
    }
}

impl<E: Curve> core::fmt::Debug for KeyShare<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyShare")
            .field("owner", &self.parties.get(self.index))
            .field("threshold", &self.threshold)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

mod secret_scalar {
    use generic_ec::{Curve, Scalar, SecretScalar};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<E: Curve, S: Serializer>(
        x: &SecretScalar<E>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        x.as_ref().serialize(serializer)
    }

    pub fn deserialize<'de, E: Curve, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<SecretScalar<E>, D::Error> {
        let mut x = Scalar::<E>::deserialize(deserializer)?;
        Ok(SecretScalar::new(&mut x))
    }
}

/// Fixed-size table of write-once slots
pub(crate) struct Slots<T>(Vec<Option<T>>);

impl<T> Slots<T> {
    pub fn new(n: usize) -> Self {
        Self(core::iter::repeat_with(|| None).take(n).collect())
    }

    /// Fills the slot, fails if it's already filled
    pub fn set(&mut self, i: usize, value: T) -> Result<(), Error> {
        match self.0.get_mut(i) {
            Some(slot @ None) => {
                *slot = Some(value);
                Ok(())
            }
            Some(Some(_)) => Err(Reason::DuplicateMessage.into()),
            None => Err(Reason::Bug("slot index out of bounds").into()),
        }
    }

    pub fn get(&self, i: usize) -> Result<&T, Error> {
        self.0
            .get(i)
            .and_then(Option::as_ref)
            .ok_or(Reason::Bug("slot is not filled").into())
    }

    /// Returns every value if all slots are filled
    pub fn into_complete(self) -> Result<Vec<T>, Error> {
        self.0
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(Reason::Bug("not every slot is filled").into())
    }
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}
