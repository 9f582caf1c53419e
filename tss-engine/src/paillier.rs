//! Paillier encryption
//!
//! Thin layer over [`fast_paillier`]: keys here are serializable and are built from two safe
//! primes, which also makes the modulus suitable for the Paillier-Blum modulus proof.
//! Plaintexts are taken from the signed range `[-N/2, N/2)`, as in `fast_paillier`.

use paillier_zk::{fast_paillier, rug::Integer, IntegerExt};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Reason},
    primes::{self, Cancellation},
    utils::{self, hex_int},
};

/// Number of iterations in [`KeyProof`]
pub const KEY_PROOF_ITERATIONS: usize = 13;

/// Paillier public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "hex_int")]
    n: Integer,
}

/// Paillier secret key
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "Primes", into = "Primes")]
pub struct SecretKey {
    public: PublicKey,
    p: Integer,
    q: Integer,
    phi: Integer,
}

#[derive(Serialize, Deserialize)]
struct Primes {
    #[serde(with = "hex_int")]
    p: Integer,
    #[serde(with = "hex_int")]
    q: Integer,
}

impl PublicKey {
    /// Wraps a modulus
    pub fn from_n(n: Integer) -> Self {
        Self { n }
    }

    /// Modulus `N`
    pub fn n(&self) -> &Integer {
        &self.n
    }

    /// `N^2`
    pub fn n_square(&self) -> Integer {
        self.n.clone().square()
    }

    fn encryption_key(&self) -> fast_paillier::EncryptionKey {
        fast_paillier::EncryptionKey::from_n(self.n.clone())
    }

    /// Encrypts `m`, returns ciphertext and nonce
    pub fn encrypt(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        m: &Integer,
    ) -> Result<(Integer, Integer), Error> {
        let nonce = Integer::gen_invertible(&self.n, &mut *rng);
        let c = self.encrypt_with_nonce(m, &nonce)?;
        Ok((c, nonce))
    }

    /// Encrypts `m` with the given nonce: `(1 + N)^m * r^N mod N^2`
    pub fn encrypt_with_nonce(&self, m: &Integer, nonce: &Integer) -> Result<Integer, Error> {
        self.encryption_key()
            .encrypt_with(m, nonce)
            .map_err(|_| Reason::InvalidModulus("plaintext or nonce is out of range").into())
    }

    /// Homomorphic addition of two ciphertexts
    pub fn add(&self, c1: &Integer, c2: &Integer) -> Result<Integer, Error> {
        self.encryption_key()
            .oadd(c1, c2)
            .map_err(|_| Reason::InvalidModulus("ciphertext is out of range").into())
    }
}

impl SecretKey {
    /// Builds a secret key from two distinct primes
    pub fn from_primes(p: Integer, q: Integer) -> Result<Self, Error> {
        if p == q || p <= 1 || q <= 1 {
            return Err(Reason::InvalidModulus("primes must be distinct").into());
        }
        let n = Integer::from(&p * &q);
        let phi = Integer::from(&p - 1u32) * Integer::from(&q - 1u32);
        if Integer::from(n.gcd_ref(&phi)) != 1 {
            return Err(Reason::InvalidModulus("N is not coprime with phi(N)").into());
        }
        Ok(Self {
            public: PublicKey { n },
            p,
            q,
            phi,
        })
    }

    /// Public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
    /// `phi(N) = (p - 1)(q - 1)`
    pub fn phi(&self) -> &Integer {
        &self.phi
    }
    /// First prime factor
    pub fn p(&self) -> &Integer {
        &self.p
    }
    /// Second prime factor
    pub fn q(&self) -> &Integer {
        &self.q
    }

    /// Decrypts a ciphertext into the signed range `[-N/2, N/2)`
    pub fn decrypt(&self, c: &Integer) -> Result<Integer, Error> {
        let n = self.public.n();
        if *c <= 0 || *c >= self.public.n_square() || Integer::from(c.gcd_ref(n)) != 1 {
            return Err(Reason::InvalidModulus("ciphertext is not in Z_N^2*").into());
        }
        let dk = fast_paillier::DecryptionKey::from_primes(self.p.clone(), self.q.clone())
            .map_err(|_| Reason::Bug("paillier primes became invalid"))?;
        dk.decrypt(c)
            .map_err(|_| Reason::InvalidModulus("ciphertext is not in Z_N^2*").into())
    }

    /// Proves that the key was generated correctly: `N` and `phi(N)` are coprime
    ///
    /// `binding` ties the proof to the context it's produced in.
    pub fn prove_correct_key(&self, binding: &[&[u8]]) -> Result<KeyProof, Error> {
        let n = &self.public.n;
        let n_inv = n
            .clone()
            .invert(&self.phi)
            .map_err(|_| Reason::InvalidModulus("N is not coprime with phi(N)"))?;
        let ys = key_proof_challenges(n, binding)
            .into_iter()
            .map(|x| x.pow_mod(&n_inv, n))
            .collect::<Result<_, _>>()
            .map_err(|_| Reason::Bug("N-th root doesn't exist"))?;
        Ok(KeyProof(ys))
    }
}

impl TryFrom<Primes> for SecretKey {
    type Error = Error;
    fn try_from(primes: Primes) -> Result<Self, Error> {
        Self::from_primes(primes.p, primes.q)
    }
}

impl From<SecretKey> for Primes {
    fn from(sk: SecretKey) -> Self {
        Self { p: sk.p, q: sk.q }
    }
}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Proof that a Paillier modulus `N` is coprime with `phi(N)`
///
/// Each challenge `x_i` is derived from the modulus and the binding; the prover reveals its
/// `N`-th root `y_i`, which only exists for every `x_i` if `gcd(N, phi(N)) = 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyProof(#[serde(with = "hex_int::vec")] Vec<Integer>);

impl KeyProof {
    /// Verifies the proof
    pub fn verify(&self, pk: &PublicKey, binding: &[&[u8]]) -> Result<(), Error> {
        let n = pk.n();
        if self.0.len() != KEY_PROOF_ITERATIONS || *n <= 1 || n.is_even() {
            return Err(Reason::InvalidProof("paillier key").into());
        }
        let valid = key_proof_challenges(n, binding)
            .iter()
            .zip(&self.0)
            .all(|(x, y)| {
                *y >= 0
                    && y < n
                    && y.pow_mod_ref(n, n).map(Integer::from).as_ref() == Some(x)
            });
        if valid {
            Ok(())
        } else {
            Err(Reason::InvalidProof("paillier key").into())
        }
    }
}

fn key_proof_challenges(n: &Integer, binding: &[&[u8]]) -> Vec<Integer> {
    let n_bytes = utils::to_bytes(n);
    (0..KEY_PROOF_ITERATIONS as u64)
        .map(|i| {
            let mut parts = binding.to_vec();
            parts.push(&n_bytes);
            let i = i.to_be_bytes();
            parts.push(&i);
            utils::hash_to_zn(n, b"paillier-key-proof", &parts)
        })
        .collect()
}

/// Generates a Paillier keypair with modulus of exactly `modulus_bits` bits
///
/// Both primes are safe primes of `modulus_bits / 2` bits, their difference must be at least
/// `2^(modulus_bits/2 - 100)`.
pub fn generate_keypair<R: RngCore + CryptoRng>(
    rng: &mut R,
    modulus_bits: u32,
    concurrency: usize,
    cancel: &Cancellation,
) -> Result<SecretKey, Error> {
    let prime_bits = modulus_bits / 2;
    let min_distance_bits = prime_bits.saturating_sub(100);
    loop {
        let found = primes::safe_primes_concurrent(prime_bits, 2, concurrency, rng, cancel)?;
        let [p, q] = <[_; 2]>::try_from(found)
            .map_err(|_| Reason::Bug("unexpected number of safe primes"))?;
        let (p, q) = (p.safe_prime().clone(), q.safe_prime().clone());

        let distance = Integer::from(&p - &q).abs();
        if distance.significant_bits() < min_distance_bits {
            tracing::trace!("paillier primes are too close, retrying");
            continue;
        }
        if Integer::from(&p * &q).significant_bits() != modulus_bits {
            continue;
        }
        return SecretKey::from_primes(p, q);
    }
}
