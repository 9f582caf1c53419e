use std::sync::{Mutex, MutexGuard};

use digest::Digest;
use paillier_zk::rug::{integer::Order, ops::RemRounding, Integer};
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};

use crate::error::{Error, Reason};

pub(crate) type Hash = sha2::Sha512_256;

/// Locks the mutex, poisoning is reported as a bug
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error> {
    mutex
        .lock()
        .map_err(|_| Reason::Bug("lock is poisoned").into())
}

/// Derives an independent RNG from `rng`
pub(crate) fn fork_rng(rng: &mut (impl RngCore + CryptoRng)) -> ChaCha20Rng {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    ChaCha20Rng::from_seed(seed)
}

/// Hashes a list of byte strings, every string is prefixed with its length
pub(crate) fn hash_parts(domain: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hash = Hash::new();
    absorb(&mut hash, domain);
    for part in parts {
        absorb(&mut hash, part);
    }
    hash.finalize().into()
}

fn absorb(hash: &mut Hash, bytes: &[u8]) {
    hash.update((bytes.len() as u64).to_be_bytes());
    hash.update(bytes);
}

/// Big-endian bytes of a non-negative integer
pub(crate) fn to_bytes(x: &Integer) -> Vec<u8> {
    x.to_digits::<u8>(Order::Msf)
}

/// Hashes `parts` into an integer in `[0, n)`
///
/// Output is expanded to `bits(n) + 128` bits before reduction, so the bias is negligible.
pub(crate) fn hash_to_zn(n: &Integer, domain: &[u8], parts: &[&[u8]]) -> Integer {
    let seed = hash_parts(domain, parts);
    let blocks = (u64::from(n.significant_bits()) + 128).div_ceil(256);
    let mut bytes = Vec::with_capacity(blocks as usize * 32);
    for counter in 0..blocks {
        bytes.extend_from_slice(&hash_parts(&seed, &[&counter.to_be_bytes()]));
    }
    Integer::from_digits(&bytes, Order::Msf).rem_euc(n)
}

/// Samples uniform integer of at most `bits` bits
pub(crate) fn random_bits(rng: &mut (impl RngCore + ?Sized), bits: u32) -> Integer {
    if bits == 0 {
        return Integer::new();
    }
    let len = bits.div_ceil(8);
    let mut bytes = vec![0u8; len as usize];
    rng.fill_bytes(&mut bytes);
    Integer::from_digits(&bytes, Order::Msf) >> (len * 8 - bits)
}

/// Samples uniform integer in `[0, n)`, `n` must be positive
pub(crate) fn random_below(rng: &mut (impl RngCore + ?Sized), n: &Integer) -> Integer {
    debug_assert!(*n > 0);
    if *n <= 0 {
        return Integer::new();
    }
    let bits = n.significant_bits();
    loop {
        let candidate = random_bits(rng, bits);
        if &candidate < n {
            return candidate;
        }
    }
}

/// Serializes non-negative big integers as big-endian hex strings
pub(crate) mod hex_int {
    use paillier_zk::rug::{integer::Order, Integer};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &Integer, serializer: S) -> Result<S::Ok, S::Error> {
        if *x < 0 {
            return Err(serde::ser::Error::custom("negative integer"));
        }
        serializer.serialize_str(&hex::encode(super::to_bytes(x)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Integer, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Ok(Integer::from_digits(&bytes, Order::Msf))
    }

    pub mod vec {
        use paillier_zk::rug::Integer;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        #[derive(Serialize, Deserialize)]
        struct Wrap(#[serde(with = "super")] Integer);

        pub fn serialize<S: Serializer>(xs: &[Integer], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(xs.iter().map(|x| Wrap(x.clone())))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Integer>, D::Error> {
            let xs = Vec::<Wrap>::deserialize(deserializer)?;
            Ok(xs.into_iter().map(|Wrap(x)| x).collect())
        }
    }

    pub mod option {
        use paillier_zk::rug::Integer;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        #[derive(Serialize, Deserialize)]
        struct Wrap(#[serde(with = "super")] Integer);

        pub fn serialize<S: Serializer>(
            x: &Option<Integer>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            x.as_ref().map(|x| Wrap(x.clone())).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Integer>, D::Error> {
            Ok(Option::<Wrap>::deserialize(deserializer)?.map(|Wrap(x)| x))
        }
    }
}
