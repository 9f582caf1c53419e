use std::sync::Arc;

use generic_ec::{Curve, NonZero, Point, Scalar, SecretScalar};
use paillier_zk::rug::Integer;
use rand_chacha::ChaCha20Rng;

use super::msg::{
    MsgRound1, MsgRound2Decommit, MsgRound2Share, MsgRound3, ROUND1, ROUND2_DECOMMIT,
    ROUND2_SHARE, ROUND3,
};
use crate::{
    commitment::{self, HashCommitment, Opening},
    error::{Error, Reason},
    key::{KeyShare, LocalSecrets, Slots},
    paillier,
    params::{PartyId, SessionParameters},
    pre_params::{PreParams, PreParamsGenerator},
    round::Session,
    utils,
    vss::{self, PolynomialCommitment},
    zk::{dln, fac, DlnProof, FacProof, ModProof},
};

pub(crate) type KeygenSession<E> = Session<State<E>, KeyShare<E>>;

pub(crate) struct State<E: Curve> {
    pub rng: ChaCha20Rng,
    pub ssid: [u8; 32],
    pub ids: Vec<NonZero<Scalar<E>>>,
    pub pre_params: Option<PreParams>,

    polynomial: Option<PolynomialCommitment<E>>,
    opening: Option<Opening>,
    shares: Vec<SecretScalar<E>>,

    commitments: Slots<HashCommitment>,
    paillier_pks: Slots<paillier::PublicKey>,
    ntilde: Slots<Integer>,
    h1: Slots<Integer>,
    h2: Slots<Integer>,

    round2_shares: Option<Vec<MsgRound2Share<E>>>,
    round2_decommits: Option<Vec<MsgRound2Decommit<E>>>,

    draft: Option<Draft<E>>,
}

struct Draft<E: Curve> {
    xi: SecretScalar<E>,
    big_x: Vec<Point<E>>,
    public_key: Point<E>,
}

impl<E: Curve> State<E> {
    pub fn new(
        params: &SessionParameters,
        rng: ChaCha20Rng,
        pre_params: Option<PreParams>,
    ) -> Result<Self, Error> {
        let n = params.n();
        Ok(Self {
            rng,
            ssid: ssid::<E>(params),
            ids: params.share_ids()?,
            pre_params,
            polynomial: None,
            opening: None,
            shares: Vec::new(),
            commitments: Slots::new(n),
            paillier_pks: Slots::new(n),
            ntilde: Slots::new(n),
            h1: Slots::new(n),
            h2: Slots::new(n),
            round2_shares: None,
            round2_decommits: None,
            draft: None,
        })
    }

    /// Returns both halves of round 2 once they're received
    fn round2_complete(&mut self) -> Option<(Vec<MsgRound2Share<E>>, Vec<MsgRound2Decommit<E>>)> {
        if self.round2_shares.is_some() && self.round2_decommits.is_some() {
            self.round2_shares.take().zip(self.round2_decommits.take())
        } else {
            None
        }
    }
}

/// Session identifier: binds every proof to the curve, the parties, the threshold and the nonce
fn ssid<E: Curve>(params: &SessionParameters) -> [u8; 32] {
    let keys = params
        .parties()
        .iter()
        .flat_map(|p| p.key.to_be_bytes())
        .collect::<Vec<_>>();
    utils::hash_parts(
        b"ecdsa-keygen-ssid",
        &[
            E::CURVE_NAME.as_bytes(),
            &params.threshold().to_be_bytes(),
            &keys,
            params.session_nonce(),
        ],
    )
}

/// Context the prover's proofs are bound to
struct Binding {
    ssid: [u8; 32],
    key: [u8; 8],
}

impl Binding {
    fn new(ssid: &[u8; 32], prover: &PartyId) -> Self {
        Self {
            ssid: *ssid,
            key: prover.key.to_be_bytes(),
        }
    }

    fn parts(&self) -> [&[u8]; 2] {
        [&self.ssid, &self.key]
    }

    fn with<'a>(&'a self, extra: &'a [u8]) -> [&'a [u8]; 3] {
        [&self.ssid, &self.key, extra]
    }
}

fn index_of(params: &SessionParameters, party: &PartyId) -> Result<usize, Error> {
    params
        .index_of(party)
        .ok_or_else(|| Reason::UnknownSender.blame(party))
}

fn missing(what: &'static str) -> Error {
    Reason::Bug(what).into()
}

pub(super) fn round1<E: Curve>(session: &Arc<KeygenSession<E>>) -> Result<(), Error> {
    let params = session.params();
    let i = params.index();
    tracing::debug!(party = %params.party(), round = 1, "keygen round");

    let msg = session.with_state(|state| {
        let pre_params = match state.pre_params.take() {
            Some(pre_params) => pre_params,
            None => PreParamsGenerator::new(params.pre_params_timeout())
                .set_concurrency(params.concurrency())
                .set_prime_bits(params.prime_bits())
                .generate(&mut state.rng)?,
        };

        let u = SecretScalar::<E>::random(&mut state.rng);
        let (polynomial, shares) = vss::share(&mut state.rng, params.threshold(), &u, &state.ids);
        drop(u);

        let encoded = polynomial.to_bytes();
        let encoded = encoded.iter().map(Vec::as_slice).collect::<Vec<_>>();
        let (commitment, opening) = commitment::commit(&mut state.rng, &encoded);

        let binding = Binding::new(&state.ssid, params.party());
        let dln_proof_1 = DlnProof::prove(
            &mut state.rng,
            dln::Statement {
                h1: pre_params.h1(),
                h2: pre_params.h2(),
                n: pre_params.ntilde(),
            },
            dln::Witness {
                x: pre_params.alpha(),
                p: pre_params.p(),
                q: pre_params.q(),
            },
            &binding.parts(),
        );
        let dln_proof_2 = DlnProof::prove(
            &mut state.rng,
            dln::Statement {
                h1: pre_params.h2(),
                h2: pre_params.h1(),
                n: pre_params.ntilde(),
            },
            dln::Witness {
                x: pre_params.beta(),
                p: pre_params.p(),
                q: pre_params.q(),
            },
            &binding.parts(),
        );

        let paillier_pk = pre_params.paillier_sk().public_key().clone();
        let msg = MsgRound1 {
            commitment: commitment.clone(),
            paillier_n: paillier_pk.n().clone(),
            ntilde: pre_params.ntilde().clone(),
            h1: pre_params.h1().clone(),
            h2: pre_params.h2().clone(),
            dln_proof_1,
            dln_proof_2,
        };

        state.commitments.set(i, commitment)?;
        state.paillier_pks.set(i, paillier_pk)?;
        state.ntilde.set(i, msg.ntilde.clone())?;
        state.h1.set(i, msg.h1.clone())?;
        state.h2.set(i, msg.h2.clone())?;
        state.polynomial = Some(polynomial);
        state.opening = Some(opening);
        state.shares = shares;
        state.pre_params = Some(pre_params);
        Ok(msg)
    })?;

    session.broadcast(ROUND1, &msg)?;
    session.arm(ROUND1, round2)
}

fn round2<E: Curve>(
    session: &Arc<KeygenSession<E>>,
    senders: Vec<PartyId>,
    msgs: Vec<MsgRound1>,
) -> Result<(), Error> {
    let params = session.params();
    let bits = params.prime_bits();
    tracing::debug!(party = %params.party(), round = 2, "keygen round");

    let (shares, decommit) = session.with_state(|state| {
        for (sender, msg) in senders.iter().zip(&msgs) {
            let binding = Binding::new(&state.ssid, sender);
            if msg.paillier_n.significant_bits() != bits.paillier_modulus {
                return Err(Reason::InvalidModulus("paillier modulus has unexpected size").blame(sender));
            }
            if msg.ntilde.significant_bits() != 2 * bits.safe_prime {
                return Err(Reason::InvalidModulus("NTilde has unexpected size").blame(sender));
            }
            if msg.h1 == msg.h2 {
                return Err(Reason::InconsistentPreParams("h1 and h2 must be distinct").blame(sender));
            }
            let coprime = |x: &Integer| Integer::from(x.gcd_ref(&msg.ntilde)) == 1;
            if !coprime(&msg.h1) || !coprime(&msg.h2) {
                return Err(Reason::InconsistentPreParams("h1 and h2 must be coprime with NTilde")
                    .blame(sender));
            }
            msg.dln_proof_1
                .verify(
                    dln::Statement {
                        h1: &msg.h1,
                        h2: &msg.h2,
                        n: &msg.ntilde,
                    },
                    &binding.parts(),
                )
                .map_err(|err| err.with_culprit(sender))?;
            msg.dln_proof_2
                .verify(
                    dln::Statement {
                        h1: &msg.h2,
                        h2: &msg.h1,
                        n: &msg.ntilde,
                    },
                    &binding.parts(),
                )
                .map_err(|err| err.with_culprit(sender))?;
        }

        for (sender, msg) in senders.iter().zip(&msgs) {
            let j = index_of(params, sender)?;
            let record = |result: Result<(), Error>| result.map_err(|err| err.with_culprit(sender));
            record(state.commitments.set(j, msg.commitment.clone()))?;
            record(state.paillier_pks.set(j, paillier::PublicKey::from_n(msg.paillier_n.clone())))?;
            record(state.ntilde.set(j, msg.ntilde.clone()))?;
            record(state.h1.set(j, msg.h1.clone()))?;
            record(state.h2.set(j, msg.h2.clone()))?;
        }

        let pre_params = state.pre_params.as_ref().ok_or_else(|| missing("pre-parameters"))?;
        let sk = pre_params.paillier_sk();
        let binding = Binding::new(&state.ssid, params.party());

        let mut shares = Vec::with_capacity(senders.len());
        for (recipient, msg) in senders.iter().zip(&msgs) {
            let j = index_of(params, recipient)?;
            let share = state.shares.get(j).ok_or_else(|| missing("own share"))?;
            let fac_proof = FacProof::prove(
                &mut state.rng,
                sk.public_key().n(),
                sk.p(),
                sk.q(),
                fac::Aux {
                    n_hat: &msg.ntilde,
                    s: &msg.h1,
                    t: &msg.h2,
                },
                &binding.parts(),
            )?;
            shares.push((
                recipient.clone(),
                MsgRound2Share {
                    share: *share.as_ref(),
                    fac_proof,
                },
            ));
        }

        let decommit = MsgRound2Decommit {
            opening: state.opening.clone().ok_or_else(|| missing("opening"))?,
            polynomial: state.polynomial.clone().ok_or_else(|| missing("polynomial"))?,
            mod_proof: ModProof::prove(
                &mut state.rng,
                sk.public_key().n(),
                sk.p(),
                sk.q(),
                &binding.parts(),
            )?,
        };
        Ok((shares, decommit))
    })?;

    for (recipient, msg) in &shares {
        session.send_to(ROUND2_SHARE, recipient, msg)?;
    }
    session.broadcast(ROUND2_DECOMMIT, &decommit)?;

    session.arm(ROUND2_SHARE, |session, _, msgs| {
        let ready = session.with_state(|state| {
            state.round2_shares = Some(msgs);
            Ok(state.round2_complete())
        })?;
        match ready {
            Some((shares, decommits)) => round3(session, shares, decommits),
            None => Ok(()),
        }
    })?;
    session.arm(ROUND2_DECOMMIT, |session, _, msgs| {
        let ready = session.with_state(|state| {
            state.round2_decommits = Some(msgs);
            Ok(state.round2_complete())
        })?;
        match ready {
            Some((shares, decommits)) => round3(session, shares, decommits),
            None => Ok(()),
        }
    })
}

fn round3<E: Curve>(
    session: &Arc<KeygenSession<E>>,
    shares: Vec<MsgRound2Share<E>>,
    decommits: Vec<MsgRound2Decommit<E>>,
) -> Result<(), Error> {
    let params = session.params();
    let i = params.index();
    let others = params.others();
    tracing::debug!(party = %params.party(), round = 3, "keygen round");

    let msg = session.with_state(|state| {
        let pre_params = state.pre_params.as_ref().ok_or_else(|| missing("pre-parameters"))?;
        let own_aux = fac::Aux {
            n_hat: pre_params.ntilde(),
            s: pre_params.h1(),
            t: pre_params.h2(),
        };
        let own_id = &state.ids[i];

        for ((sender, share), decommit) in others.iter().zip(&shares).zip(&decommits) {
            let j = index_of(params, sender)?;
            let binding = Binding::new(&state.ssid, sender);

            let encoded = decommit.polynomial.to_bytes();
            let encoded = encoded.iter().map(Vec::as_slice).collect::<Vec<_>>();
            if !state.commitments.get(j)?.verify(&decommit.opening, &encoded) {
                return Err(Reason::InvalidDecommitment.blame(sender));
            }
            if decommit.polynomial.degree() != usize::from(params.threshold()) {
                return Err(Reason::InvalidDecommitment.blame(sender));
            }
            let paillier_n = state.paillier_pks.get(j)?.n();
            decommit
                .mod_proof
                .verify(paillier_n, &binding.parts())
                .map_err(|err| err.with_culprit(sender))?;
            share
                .fac_proof
                .verify(paillier_n, own_aux, &binding.parts())
                .map_err(|err| err.with_culprit(sender))?;
            if !vss::verify_share(&decommit.polynomial, own_id, &share.share) {
                return Err(Reason::InvalidShare.blame(sender));
            }
        }

        let own_share = state.shares.get(i).ok_or_else(|| missing("own share"))?;
        let mut xi = shares
            .iter()
            .fold(*own_share.as_ref(), |acc, share| acc + share.share);
        let xi = SecretScalar::new(&mut xi);
        state.shares.clear();

        let polynomial = decommits
            .iter()
            .try_fold(
                state.polynomial.clone().ok_or_else(|| missing("polynomial"))?,
                |acc, decommit| acc.add(&decommit.polynomial),
            )
            .ok_or_else(|| missing("polynomials of different degrees"))?;
        let big_x = state
            .ids
            .iter()
            .map(|id| polynomial.evaluate(id.as_ref()))
            .collect::<Vec<_>>();
        let public_key = polynomial.constant_term();
        if Point::generator() * xi.as_ref() != big_x[i] {
            return Err(missing("x_i G doesn't match X_i"));
        }

        let binding = Binding::new(&state.ssid, params.party());
        let public_key_bytes = public_key.to_bytes(true);
        let key_proof = pre_params
            .paillier_sk()
            .prove_correct_key(&binding.with(public_key_bytes.as_ref()))?;

        state.draft = Some(Draft {
            xi,
            big_x,
            public_key,
        });
        Ok(MsgRound3 { key_proof })
    })?;

    session.broadcast(ROUND3, &msg)?;
    session.arm(ROUND3, finalize)
}

fn finalize<E: Curve>(
    session: &Arc<KeygenSession<E>>,
    senders: Vec<PartyId>,
    msgs: Vec<MsgRound3>,
) -> Result<(), Error> {
    let params = session.params();
    let i = params.index();

    let key_share = session.with_state(|state| {
        let draft = state.draft.take().ok_or_else(|| missing("key share draft"))?;
        let public_key_bytes = draft.public_key.to_bytes(true);
        for (sender, msg) in senders.iter().zip(&msgs) {
            let j = index_of(params, sender)?;
            let binding = Binding::new(&state.ssid, sender);
            msg.key_proof
                .verify(
                    state.paillier_pks.get(j)?,
                    &binding.with(public_key_bytes.as_ref()),
                )
                .map_err(|err| err.with_culprit(sender))?;
        }

        let key_share = KeyShare {
            pre_params: state.pre_params.take().ok_or_else(|| missing("pre-parameters"))?,
            secrets: LocalSecrets {
                xi: draft.xi,
                share_id: state.ids[i],
            },
            parties: params.parties().to_vec(),
            index: i,
            threshold: params.threshold(),
            ks: state.ids.clone(),
            ntilde: core::mem::take(&mut state.ntilde).into_complete()?,
            h1: core::mem::take(&mut state.h1).into_complete()?,
            h2: core::mem::take(&mut state.h2).into_complete()?,
            big_x: draft.big_x,
            paillier_pks: core::mem::take(&mut state.paillier_pks).into_complete()?,
            public_key: draft.public_key,
        };
        key_share.validate()?;
        Ok(key_share)
    })?;

    tracing::info!(
        party = %params.party(),
        public_key = %hex::encode(key_share.public_key().to_bytes(true)),
        "keygen completed",
    );
    session.finish(key_share)
}
