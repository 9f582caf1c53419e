//! Pre-parameters
//!
//! Every party of ECDSA keygen needs a Paillier keypair and ring-Pedersen parameters
//! `(NTilde, h1, h2)`. Generating them requires finding four large safe primes, which is
//! expensive, so it's meant to be done ahead of time with [`PreParamsGenerator`] and the
//! result reused across sessions.
//!
//! Previously generated pre-parameters are loaded as [`DirtyPreParams`] and validated in two
//! tiers:
//! 1. Structural: Paillier key and `NTilde`, `h1`, `h2` are present
//! 2. Full: prime factors of `NTilde` and `alpha`, `beta` are present too, as they're required
//!    to produce proofs during keygen, and every algebraic relation holds
//!
//! Pre-parameters that pass only the first tier are reported as outdated.

use std::{thread, time::Duration, time::Instant};

use futures::{channel::oneshot, FutureExt};
use paillier_zk::{
    rug::{ops::RemRounding, Integer},
    IntegerExt,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Reason},
    paillier,
    params::{default_concurrency, PrimeBits},
    primes::{self, Cancellation, GermainSafePrime},
    utils::{self, hex_int},
};

/// Validated pre-parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct PreParams {
    paillier_sk: paillier::SecretKey,
    #[serde(with = "hex_int")]
    ntilde: Integer,
    #[serde(with = "hex_int")]
    h1: Integer,
    #[serde(with = "hex_int")]
    h2: Integer,
    #[serde(with = "hex_int")]
    alpha: Integer,
    #[serde(with = "hex_int")]
    beta: Integer,
    #[serde(with = "hex_int")]
    p: Integer,
    #[serde(with = "hex_int")]
    q: Integer,
}

impl PreParams {
    /// Paillier secret key
    pub fn paillier_sk(&self) -> &paillier::SecretKey {
        &self.paillier_sk
    }
    /// `NTilde = (2p + 1)(2q + 1)`
    pub fn ntilde(&self) -> &Integer {
        &self.ntilde
    }
    /// `h1`, a quadratic residue mod `NTilde`
    pub fn h1(&self) -> &Integer {
        &self.h1
    }
    /// `h2 = h1^alpha mod NTilde`
    pub fn h2(&self) -> &Integer {
        &self.h2
    }
    /// `alpha`
    pub fn alpha(&self) -> &Integer {
        &self.alpha
    }
    /// `beta = alpha^-1 mod pq`
    pub fn beta(&self) -> &Integer {
        &self.beta
    }
    /// Sophie Germain prime `p`
    pub fn p(&self) -> &Integer {
        &self.p
    }
    /// Sophie Germain prime `q`
    pub fn q(&self) -> &Integer {
        &self.q
    }
    /// `p * q`, order of the group generated by `h1`
    pub fn pq(&self) -> Integer {
        Integer::from(&self.p * &self.q)
    }

    /// Checks every algebraic relation between the components
    ///
    /// Includes [`PRIMALITY_ROUNDS`](primes::PRIMALITY_ROUNDS) primality test repetitions on
    /// `p`, `q`, `2p + 1` and `2q + 1`.
    pub fn validate(&self) -> Result<(), Error> {
        let safe_p = GermainSafePrime::new(self.p.clone())?;
        let safe_q = GermainSafePrime::new(self.q.clone())?;
        if self.p == self.q {
            return Err(Reason::InconsistentPreParams("p and q must be distinct").into());
        }
        if self.ntilde != Integer::from(safe_p.safe_prime() * safe_q.safe_prime()) {
            return Err(Reason::InconsistentPreParams("NTilde != P * Q").into());
        }
        if self.h1 <= 1 || self.h1 >= self.ntilde || self.h1 == self.h2 {
            return Err(Reason::InconsistentPreParams("h1 is out of range").into());
        }
        let h1_alpha = self.h1.pow_mod_ref(&self.alpha, &self.ntilde).map(Integer::from);
        if self.alpha <= 0 || h1_alpha.as_ref() != Some(&self.h2) {
            return Err(Reason::InconsistentPreParams("h2 != h1^alpha mod NTilde").into());
        }
        if Integer::from(&self.alpha * &self.beta).rem_euc(&self.pq()) != 1 {
            return Err(Reason::InconsistentPreParams("alpha * beta != 1 mod pq").into());
        }
        let paillier_n = self.paillier_sk.public_key().n();
        if Integer::from(self.paillier_sk.p() * self.paillier_sk.q()) != *paillier_n {
            return Err(Reason::InconsistentPreParams("paillier N != p * q").into());
        }
        Ok(())
    }
}

impl core::fmt::Debug for PreParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PreParams")
            .field("paillier_pk", self.paillier_sk.public_key())
            .field("ntilde_bits", &self.ntilde.significant_bits())
            .finish_non_exhaustive()
    }
}

/// Pre-parameters that haven't been validated yet
///
/// Every field is optional so that pre-parameters produced by older versions, which didn't
/// store prime factors, can still be loaded and reported as outdated.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DirtyPreParams {
    /// Paillier secret key
    #[serde(default)]
    pub paillier_sk: Option<paillier::SecretKey>,
    /// `NTilde`
    #[serde(default, with = "hex_int::option")]
    pub ntilde: Option<Integer>,
    /// `h1`
    #[serde(default, with = "hex_int::option")]
    pub h1: Option<Integer>,
    /// `h2`
    #[serde(default, with = "hex_int::option")]
    pub h2: Option<Integer>,
    /// `alpha`
    #[serde(default, with = "hex_int::option")]
    pub alpha: Option<Integer>,
    /// `beta`
    #[serde(default, with = "hex_int::option")]
    pub beta: Option<Integer>,
    /// Sophie Germain prime `p`
    #[serde(default, with = "hex_int::option")]
    pub p: Option<Integer>,
    /// Sophie Germain prime `q`
    #[serde(default, with = "hex_int::option")]
    pub q: Option<Integer>,
}

impl DirtyPreParams {
    /// Paillier key and ring-Pedersen parameters are present
    pub fn is_structurally_valid(&self) -> bool {
        self.paillier_sk.is_some() && self.ntilde.is_some() && self.h1.is_some() && self.h2.is_some()
    }

    /// Structurally valid, and the values needed to produce proofs are present
    pub fn is_valid_with_proof(&self) -> bool {
        self.is_structurally_valid()
            && self.alpha.is_some()
            && self.beta.is_some()
            && self.p.is_some()
            && self.q.is_some()
    }

    /// Validates pre-parameters
    pub fn validate(self) -> Result<PreParams, Error> {
        let Self {
            paillier_sk: Some(paillier_sk),
            ntilde: Some(ntilde),
            h1: Some(h1),
            h2: Some(h2),
            alpha,
            beta,
            p,
            q,
        } = self
        else {
            return Err(Reason::MissingPreParams("paillier key, NTilde, h1 and h2 are required").into());
        };
        let (Some(alpha), Some(beta), Some(p), Some(q)) = (alpha, beta, p, q) else {
            return Err(Reason::OutdatedPreParams.into());
        };

        let pre_params = PreParams {
            paillier_sk,
            ntilde,
            h1,
            h2,
            alpha,
            beta,
            p,
            q,
        };
        pre_params.validate()?;
        Ok(pre_params)
    }
}

impl From<PreParams> for DirtyPreParams {
    fn from(pre_params: PreParams) -> Self {
        Self {
            paillier_sk: Some(pre_params.paillier_sk),
            ntilde: Some(pre_params.ntilde),
            h1: Some(pre_params.h1),
            h2: Some(pre_params.h2),
            alpha: Some(pre_params.alpha),
            beta: Some(pre_params.beta),
            p: Some(pre_params.p),
            q: Some(pre_params.q),
        }
    }
}

impl core::fmt::Debug for DirtyPreParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirtyPreParams")
            .field("structurally_valid", &self.is_structurally_valid())
            .field("valid_with_proof", &self.is_valid_with_proof())
            .finish_non_exhaustive()
    }
}

/// Generates [`PreParams`]
///
/// Generation is expensive (minutes for default prime sizes), and is meant to be done out of
/// band from live protocol sessions.
///
/// ## Example
/// ```rust,no_run
/// use std::time::Duration;
/// use tss_engine::pre_params::PreParamsGenerator;
///
/// let pre_params = PreParamsGenerator::new(Duration::from_secs(300))
///     .set_concurrency(4)
///     .generate(&mut rand_core::OsRng)?;
/// # Ok::<_, tss_engine::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PreParamsGenerator {
    timeout: Duration,
    concurrency: usize,
    prime_bits: PrimeBits,
}

impl PreParamsGenerator {
    /// Constructs a generator with the time budget
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            concurrency: 0,
            prime_bits: PrimeBits::default(),
        }
    }

    /// Sets amount of workers, `0` means amount of available hardware parallelism
    pub fn set_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets prime sizes
    pub fn set_prime_bits(mut self, prime_bits: PrimeBits) -> Self {
        self.prime_bits = prime_bits;
        self
    }

    /// Generates pre-parameters within the time budget
    pub fn generate<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<PreParams, Error> {
        self.generate_with(rng, &Cancellation::with_timeout(self.timeout))
    }

    /// Generates pre-parameters until `cancel` fires
    ///
    /// Two searches run concurrently: one for the Paillier keypair (it gets two thirds of the
    /// workers, as its primes must also be far enough apart) and one for the two safe primes of
    /// `NTilde`. Generation fails as soon as either search fails, in which case `cancel` is fired
    /// to stop the other one.
    pub fn generate_with<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        cancel: &Cancellation,
    ) -> Result<PreParams, Error> {
        self.prime_bits.validate()?;
        let concurrency = if self.concurrency > 0 {
            self.concurrency
        } else {
            default_concurrency()
        };
        let concurrency = (concurrency / 3).max(1);
        let started_at = Instant::now();

        tracing::info!(
            safe_prime_bits = self.prime_bits.safe_prime,
            paillier_modulus_bits = self.prime_bits.paillier_modulus,
            concurrency,
            "generating pre-parameters",
        );

        let mut paillier_rng = utils::fork_rng(rng);
        let mut primes_rng = utils::fork_rng(rng);
        let (paillier_tx, paillier_rx) = oneshot::channel();
        let (primes_tx, primes_rx) = oneshot::channel();

        let (paillier_sk, safe_primes) = thread::scope(|scope| {
            let modulus_bits = self.prime_bits.paillier_modulus;
            let safe_prime_bits = self.prime_bits.safe_prime;
            scope.spawn(move || {
                let result = paillier::generate_keypair(
                    &mut paillier_rng,
                    modulus_bits,
                    concurrency * 2,
                    cancel,
                );
                let _ = paillier_tx.send(result);
            });
            scope.spawn(move || {
                let result = primes::safe_primes_concurrent(
                    safe_prime_bits,
                    2,
                    concurrency,
                    &mut primes_rng,
                    cancel,
                );
                let _ = primes_tx.send(result);
            });

            let paillier = paillier_rx.map(|r| r.unwrap_or(Err(Reason::Bug("paillier search dropped").into())));
            let primes = primes_rx.map(|r| r.unwrap_or(Err(Reason::Bug("safe primes search dropped").into())));
            let joined = futures::executor::block_on(futures::future::try_join(paillier, primes));
            if joined.is_err() {
                cancel.cancel();
            }
            joined
        })
        .inspect_err(|err| tracing::warn!(%err, "pre-parameters generation failed"))?;

        let [safe_p, safe_q] = <[GermainSafePrime; 2]>::try_from(safe_primes)
            .map_err(|_| Reason::Bug("unexpected number of safe primes"))?;
        safe_p.validate()?;
        safe_q.validate()?;

        let ntilde = Integer::from(safe_p.safe_prime() * safe_q.safe_prime());
        let p = safe_p.prime().clone();
        let q = safe_q.prime().clone();
        let pq = Integer::from(&p * &q);

        let f1 = Integer::gen_invertible(&ntilde, &mut *rng);
        let (alpha, beta) = loop {
            let alpha = Integer::gen_invertible(&ntilde, &mut *rng);
            if let Ok(beta) = alpha.clone().invert(&pq) {
                break (alpha, beta);
            }
        };
        let h1 = f1.square().rem_euc(&ntilde);
        let h2 = h1
            .pow_mod_ref(&alpha, &ntilde)
            .map(Integer::from)
            .ok_or(Reason::Bug("h1 is not invertible"))?;

        tracing::info!(elapsed = ?started_at.elapsed(), "pre-parameters generated");

        Ok(PreParams {
            paillier_sk,
            ntilde,
            h1,
            h2,
            alpha,
            beta,
            p,
            q,
        })
    }
}
