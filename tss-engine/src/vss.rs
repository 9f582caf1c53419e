//! Feldman verifiable secret sharing
//!
//! Secret `s` is shared via a random polynomial `f(x) = s + a_1 x + .. + a_t x^t` of degree `t`.
//! Party with share identifier `i` receives `f(i)`. Commitment to the polynomial consists of
//! `a_k G` for every coefficient, which lets every party check its share without learning
//! anything about the secret. Any `t + 1` shares reconstruct the secret, `t` shares reveal
//! nothing.

use generic_ec::{Curve, NonZero, Point, Scalar, SecretScalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Public commitment to a sharing polynomial: `[a_0 G, a_1 G, .., a_t G]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PolynomialCommitment<E: Curve>(Vec<Point<E>>);

impl<E: Curve> PolynomialCommitment<E> {
    /// Degree of the polynomial, i.e. threshold `t`
    pub fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Commitment to the secret: `a_0 G`
    pub fn constant_term(&self) -> Point<E> {
        self.0.first().copied().unwrap_or_else(Point::zero)
    }

    /// Coefficient commitments
    pub fn coefficients(&self) -> &[Point<E>] {
        &self.0
    }

    /// Evaluates `f(x) G`
    pub fn evaluate(&self, x: &Scalar<E>) -> Point<E> {
        self.0
            .iter()
            .rev()
            .fold(Point::zero(), |acc, coef| acc * x + coef)
    }

    /// Commitment to the sum of two polynomials of the same degree
    pub fn add(&self, other: &Self) -> Option<Self> {
        if self.0.len() != other.0.len() {
            return None;
        }
        Some(Self(
            self.0.iter().zip(&other.0).map(|(a, b)| a + b).collect(),
        ))
    }

    /// Encodes every coefficient commitment, used for hash commitments
    pub fn to_bytes(&self) -> Vec<Vec<u8>> {
        self.0
            .iter()
            .map(|point| point.to_bytes(true).as_ref().to_vec())
            .collect()
    }
}

/// Shares `secret` with threshold `t` among parties with the given share identifiers
///
/// Returns commitment to the polynomial and the shares, `shares[j]` corresponds to `ids[j]`.
pub fn share<E: Curve>(
    rng: &mut (impl RngCore + CryptoRng),
    t: u16,
    secret: &SecretScalar<E>,
    ids: &[NonZero<Scalar<E>>],
) -> (PolynomialCommitment<E>, Vec<SecretScalar<E>>) {
    let coefficients = core::iter::once(secret.clone())
        .chain(core::iter::repeat_with(|| SecretScalar::random(rng)).take(t.into()))
        .collect::<Vec<_>>();
    let commitment = coefficients
        .iter()
        .map(|a| Point::generator() * a.as_ref())
        .collect();

    let shares = ids
        .iter()
        .map(|id| {
            let mut value = coefficients
                .iter()
                .rev()
                .fold(Scalar::zero(), |acc, coef| acc * id.as_ref() + coef.as_ref());
            SecretScalar::new(&mut value)
        })
        .collect();

    (PolynomialCommitment(commitment), shares)
}

/// Checks that `share` is the evaluation of the committed polynomial at `id`
pub fn verify_share<E: Curve>(
    commitment: &PolynomialCommitment<E>,
    id: &NonZero<Scalar<E>>,
    share: &Scalar<E>,
) -> bool {
    Point::generator() * share == commitment.evaluate(id.as_ref())
}

/// Reconstructs the secret from shares
///
/// Needs at least `t + 1` distinct shares to return the original secret. Returns `None` if
/// identifiers repeat or lists differ in length.
pub fn reconstruct<E: Curve>(ids: &[NonZero<Scalar<E>>], shares: &[Scalar<E>]) -> Option<Scalar<E>> {
    if ids.len() != shares.len() || ids.is_empty() {
        return None;
    }
    ids.iter()
        .zip(shares)
        .try_fold(Scalar::zero(), |acc, (id, share)| {
            Some(acc + lagrange_coefficient(ids, id)? * share)
        })
}

/// Lagrange coefficient of `x_i` for interpolation at zero over `ids`
///
/// `lambda_i = prod_{j != i} x_j / (x_j - x_i)`. Returns `None` if `x_i` is not in `ids` or ids
/// repeat.
pub fn lagrange_coefficient<E: Curve>(
    ids: &[NonZero<Scalar<E>>],
    x_i: &NonZero<Scalar<E>>,
) -> Option<Scalar<E>> {
    let mut x_i_observed = false;

    let mut num = Scalar::one();
    let mut denom = NonZero::<Scalar<E>>::one();

    for (j, x_j) in ids.iter().enumerate() {
        if ids[..j].contains(x_j) {
            return None;
        }
        let Some(subtraction) = NonZero::from_scalar(x_j - x_i) else {
            // x_i equals to x_j
            x_i_observed = true;
            continue;
        };
        num *= x_j.as_ref();
        denom = denom * subtraction;
    }

    if !x_i_observed {
        return None;
    }

    Some(num * denom.invert())
}

/// Evaluates at `x` the polynomial in the exponent passing through `(ids[m], points[m])`
///
/// The polynomial has degree `ids.len() - 1`. Returns `None` if ids repeat or lists differ in
/// length.
pub fn interpolate_at<E: Curve>(
    ids: &[NonZero<Scalar<E>>],
    points: &[Point<E>],
    x: &Scalar<E>,
) -> Option<Point<E>> {
    if ids.len() != points.len() || ids.is_empty() {
        return None;
    }
    ids.iter()
        .zip(points)
        .enumerate()
        .try_fold(Point::zero(), |acc, (m, (x_m, point))| {
            let (num, denom) = ids.iter().enumerate().filter(|(l, _)| *l != m).fold(
                (Scalar::<E>::one(), Scalar::<E>::one()),
                |(num, denom), (_, x_l)| {
                    (num * (x - x_l.as_ref()), denom * (x_m.as_ref() - x_l.as_ref()))
                },
            );
            Some(acc + point * (num * denom.invert()?))
        })
}
