//! Safe prime search
//!
//! A safe prime is a prime `P = 2p + 1` where `p` (a Sophie Germain prime) is also prime. The
//! search runs on a bounded pool of worker threads, each with its own RNG. Workers draw random
//! candidates and test both `p` and `2p + 1` with GMP's probabilistic primality test. The
//! search stops as soon as enough distinct primes were found or the [`Cancellation`] signal
//! fires.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use paillier_zk::rug::{integer::IsPrime, Integer};
use rand_core::{CryptoRng, RngCore};

use crate::{
    error::{Error, Reason},
    utils,
};

/// Number of primality test repetitions used to accept a prime
pub const PRIMALITY_ROUNDS: u32 = 30;

/// Interval between progress reports of a running search
pub const PROGRESS_TICK: Duration = Duration::from_secs(8);

/// Cancellation signal shared by every worker of a search
///
/// Fires either when [`cancel`](Self::cancel) is called on any clone, or when the deadline
/// passes.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Signal that only fires on explicit [`cancel`](Self::cancel)
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that also fires once `timeout` elapses
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Default::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Fires the signal
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed)
    }

    /// Checks whether the signal fired
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Sophie Germain prime `p` together with its safe prime `2p + 1`
#[derive(Clone, PartialEq, Eq)]
pub struct GermainSafePrime {
    prime: Integer,
    safe_prime: Integer,
}

impl GermainSafePrime {
    /// Wraps a Sophie Germain prime, checking that both it and `2p + 1` are primes
    pub fn new(prime: Integer) -> Result<Self, Error> {
        let safe_prime = Integer::from(&prime << 1u32) + 1u32;
        let candidate = Self { prime, safe_prime };
        candidate.validate()?;
        Ok(candidate)
    }

    /// Sophie Germain prime `p`
    pub fn prime(&self) -> &Integer {
        &self.prime
    }

    /// Safe prime `2p + 1`
    pub fn safe_prime(&self) -> &Integer {
        &self.safe_prime
    }

    /// Re-checks both numbers, [`PRIMALITY_ROUNDS`] repetitions each
    pub fn validate(&self) -> Result<(), Error> {
        if Integer::from(&self.prime << 1u32) + 1u32 != self.safe_prime
            || !is_prime(&self.prime)
            || !is_prime(&self.safe_prime)
        {
            return Err(Reason::NotPrime.into());
        }
        Ok(())
    }
}

impl core::fmt::Debug for GermainSafePrime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GermainSafePrime")
            .field("bits", &self.safe_prime.significant_bits())
            .finish_non_exhaustive()
    }
}

/// Primality test with [`PRIMALITY_ROUNDS`] repetitions
pub fn is_prime(n: &Integer) -> bool {
    *n > 1 && n.is_probably_prime(PRIMALITY_ROUNDS) != IsPrime::No
}

/// Searches a single Germain/safe prime pair where the safe prime has exactly `bits` bits
///
/// Returns `None` if search was interrupted.
fn search_one(
    bits: u32,
    rng: &mut impl RngCore,
    cancel: &Cancellation,
    done: &AtomicBool,
) -> Option<GermainSafePrime> {
    let q_bits = bits - 1;
    loop {
        if cancel.is_cancelled() || done.load(Ordering::Relaxed) {
            return None;
        }

        // Setting two top bits makes product of two such safe primes exactly 2*bits long
        let mut q = utils::random_bits(rng, q_bits);
        q.set_bit(q_bits - 1, true);
        q.set_bit(q_bits - 2, true);
        q.set_bit(0, true);

        // 2q + 1 is divisible by 3 when q = 1 mod 3
        if q.mod_u(3) != 2 {
            continue;
        }
        if q.is_probably_prime(PRIMALITY_ROUNDS) == IsPrime::No {
            continue;
        }
        let safe = Integer::from(&q << 1u32) + 1u32;
        if safe.is_probably_prime(PRIMALITY_ROUNDS) == IsPrime::No {
            continue;
        }
        return Some(GermainSafePrime {
            prime: q,
            safe_prime: safe,
        });
    }
}

/// Searches `count` distinct safe primes of exactly `bits` bits using `concurrency` workers
///
/// Returns [`ErrorKind::Timeout`](crate::ErrorKind::Timeout) error if `cancel` fires before
/// the search completes.
pub fn safe_primes_concurrent<R: RngCore + CryptoRng>(
    bits: u32,
    count: usize,
    concurrency: usize,
    rng: &mut R,
    cancel: &Cancellation,
) -> Result<Vec<GermainSafePrime>, Error> {
    if bits < crate::params::PrimeBits::MIN_SAFE_PRIME {
        return Err(Reason::InvalidSessionParameters("safe prime is too short").into());
    }
    let concurrency = concurrency.max(1);
    let workers_rng = (0..concurrency)
        .map(|_| utils::fork_rng(rng))
        .collect::<Vec<_>>();
    let done = AtomicBool::new(false);
    let started_at = Instant::now();

    tracing::debug!(bits, count, concurrency, "searching safe primes");

    thread::scope(|scope| {
        let (found_tx, found_rx) = mpsc::channel();
        for mut worker_rng in workers_rng {
            let found_tx = found_tx.clone();
            let done = &done;
            scope.spawn(move || {
                while let Some(prime) = search_one(bits, &mut worker_rng, cancel, done) {
                    if found_tx.send(prime).is_err() {
                        break;
                    }
                }
            });
        }
        drop(found_tx);

        let mut found: Vec<GermainSafePrime> = Vec::with_capacity(count);
        let result = loop {
            match found_rx.recv_timeout(PROGRESS_TICK) {
                Ok(prime) => {
                    if !found.contains(&prime) {
                        found.push(prime);
                        tracing::trace!(found = found.len(), count, "found a safe prime");
                    }
                    if found.len() >= count {
                        break Ok(core::mem::take(&mut found));
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        break Err(Reason::Timeout.into());
                    }
                    tracing::debug!(
                        bits,
                        found = found.len(),
                        count,
                        elapsed = ?started_at.elapsed(),
                        "still generating safe primes",
                    );
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    // workers only exit once interrupted
                    break Err(Reason::Timeout.into());
                }
            }
        };
        done.store(true, Ordering::Relaxed);

        if result.is_ok() {
            tracing::debug!(bits, count, elapsed = ?started_at.elapsed(), "safe primes found");
        }
        result
    })
}
