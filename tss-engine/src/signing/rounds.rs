use std::sync::Arc;

use generic_ec::{NonZero, Point, Scalar, SecretScalar};
use rand_chacha::ChaCha20Rng;

use super::{
    finalize::{finalize, Signature},
    msg::{MsgRound1, MsgRound2, MsgRound3, ROUND1, ROUND2, ROUND3},
};
use crate::{
    commitment::{self, HashCommitment, Opening},
    error::{Error, Reason},
    key::Slots,
    params::{PartyId, SessionParameters},
    round::Session,
    utils,
    zk::SchnorrProof,
    Ciphersuite,
};

pub(crate) type SigningSession<C> = Session<State<C>, Signature<C>>;

type E<C> = <C as Ciphersuite>::Curve;

pub(crate) struct State<C: Ciphersuite> {
    rng: ChaCha20Rng,
    ssid: [u8; 32],
    msg: Vec<u8>,
    public_key: Point<E<C>>,
    /// Share ids of the signers, in the session order
    ids: Vec<NonZero<Scalar<E<C>>>>,
    /// Public shares of the signers, in the session order
    public_shares: Vec<Point<E<C>>>,
    /// `w_i = lambda_i x_i`
    wi: SecretScalar<E<C>>,

    nonce: Option<SecretScalar<E<C>>>,
    opening: Option<Opening>,
    commitments: Slots<HashCommitment>,
    nonce_points: Slots<Point<E<C>>>,
    challenge: Option<(Point<E<C>>, Scalar<E<C>>)>,
    partial: Option<Scalar<E<C>>>,
}

impl<C: Ciphersuite> State<C> {
    pub fn new(
        params: &SessionParameters,
        rng: ChaCha20Rng,
        msg: Vec<u8>,
        public_key: Point<E<C>>,
        ids: Vec<NonZero<Scalar<E<C>>>>,
        public_shares: Vec<Point<E<C>>>,
        wi: SecretScalar<E<C>>,
    ) -> Self {
        let n = params.n();
        Self {
            rng,
            ssid: ssid::<C>(params, &public_key, &msg),
            msg,
            public_key,
            ids,
            public_shares,
            wi,
            nonce: None,
            opening: None,
            commitments: Slots::new(n),
            nonce_points: Slots::new(n),
            challenge: None,
            partial: None,
        }
    }
}

fn ssid<C: Ciphersuite>(params: &SessionParameters, public_key: &Point<E<C>>, msg: &[u8]) -> [u8; 32] {
    let keys = params
        .parties()
        .iter()
        .flat_map(|p| p.key.to_be_bytes())
        .collect::<Vec<_>>();
    utils::hash_parts(
        b"eddsa-signing-ssid",
        &[
            C::NAME.as_bytes(),
            &params.threshold().to_be_bytes(),
            &keys,
            params.session_nonce(),
            C::serialize_point(public_key).as_ref(),
            msg,
        ],
    )
}

fn binding<'a>(ssid: &'a [u8; 32], key: &'a [u8; 8]) -> [&'a [u8]; 2] {
    [ssid, key]
}

fn index_of(params: &SessionParameters, party: &PartyId) -> Result<usize, Error> {
    params
        .index_of(party)
        .ok_or_else(|| Reason::UnknownSender.blame(party))
}

fn missing(what: &'static str) -> Error {
    Reason::Bug(what).into()
}

pub(super) fn round1<C: Ciphersuite>(session: &Arc<SigningSession<C>>) -> Result<(), Error> {
    let params = session.params();
    tracing::debug!(party = %params.party(), round = 1, "signing round");

    let msg = session.with_state(|state| {
        let nonce = SecretScalar::<E<C>>::random(&mut state.rng);
        let nonce_point = Point::generator() * nonce.as_ref();
        let (commitment, opening) =
            commitment::commit(&mut state.rng, &[C::serialize_point(&nonce_point).as_ref()]);

        state.commitments.set(params.index(), commitment.clone())?;
        state.nonce_points.set(params.index(), nonce_point)?;
        state.nonce = Some(nonce);
        state.opening = Some(opening);
        Ok(MsgRound1 { commitment })
    })?;

    session.broadcast(ROUND1, &msg)?;
    session.arm(ROUND1, round2)
}

fn round2<C: Ciphersuite>(
    session: &Arc<SigningSession<C>>,
    senders: Vec<PartyId>,
    msgs: Vec<MsgRound1>,
) -> Result<(), Error> {
    let params = session.params();
    tracing::debug!(party = %params.party(), round = 2, "signing round");

    let msg = session.with_state(|state| {
        for (sender, msg) in senders.iter().zip(msgs) {
            let j = index_of(params, sender)?;
            state
                .commitments
                .set(j, msg.commitment)
                .map_err(|err| err.with_culprit(sender))?;
        }

        let nonce = state.nonce.as_ref().ok_or_else(|| missing("nonce"))?;
        let key = params.party().key.to_be_bytes();
        let proof = SchnorrProof::prove(&mut state.rng, nonce, &binding(&state.ssid, &key));
        Ok(MsgRound2 {
            nonce_point: *state.nonce_points.get(params.index())?,
            opening: state.opening.take().ok_or_else(|| missing("opening"))?,
            proof,
        })
    })?;

    session.broadcast(ROUND2, &msg)?;
    session.arm(ROUND2, round3)
}

fn round3<C: Ciphersuite>(
    session: &Arc<SigningSession<C>>,
    senders: Vec<PartyId>,
    msgs: Vec<MsgRound2<E<C>>>,
) -> Result<(), Error> {
    let params = session.params();
    tracing::debug!(party = %params.party(), round = 3, "signing round");

    let msg = session.with_state(|state| {
        for (sender, msg) in senders.iter().zip(&msgs) {
            let j = index_of(params, sender)?;
            let encoded = C::serialize_point(&msg.nonce_point);
            if !state
                .commitments
                .get(j)?
                .verify(&msg.opening, &[encoded.as_ref()])
            {
                return Err(Reason::InvalidDecommitment.blame(sender));
            }
            let key = sender.key.to_be_bytes();
            msg.proof
                .verify(&msg.nonce_point, &binding(&state.ssid, &key))
                .map_err(|err| err.with_culprit(sender))?;
        }
        for (sender, msg) in senders.iter().zip(&msgs) {
            let j = index_of(params, sender)?;
            state
                .nonce_points
                .set(j, msg.nonce_point)
                .map_err(|err| err.with_culprit(sender))?;
        }

        let r = msgs
            .iter()
            .fold(*state.nonce_points.get(params.index())?, |acc, msg| {
                acc + msg.nonce_point
            });
        let k = C::compute_challenge(&r, &state.public_key, &state.msg);

        let nonce = state.nonce.take().ok_or_else(|| missing("nonce"))?;
        let partial = nonce.as_ref() + k * state.wi.as_ref();
        state.challenge = Some((r, k));
        state.partial = Some(partial);
        Ok(MsgRound3 { partial })
    })?;

    session.broadcast(ROUND3, &msg)?;
    session.arm(ROUND3, round4)
}

fn round4<C: Ciphersuite>(
    session: &Arc<SigningSession<C>>,
    senders: Vec<PartyId>,
    msgs: Vec<MsgRound3<E<C>>>,
) -> Result<(), Error> {
    let params = session.params();
    tracing::debug!(party = %params.party(), round = 4, "signing round");

    let signature = session.with_state(|state| {
        let (r, k) = state.challenge.ok_or_else(|| missing("challenge"))?;

        let mut partials = vec![Scalar::zero(); params.n()];
        partials[params.index()] = state.partial.take().ok_or_else(|| missing("partial"))?;
        for (sender, msg) in senders.iter().zip(&msgs) {
            partials[index_of(params, sender)?] = msg.partial;
        }

        finalize::<C>(r, &partials, &state.public_key, &state.msg).map_err(|err| {
            let culprits = identify_culprits::<C>(state, params, k, &partials);
            err.with_culprits(&culprits)
        })
    })?;

    tracing::info!(party = %params.party(), "signing completed");
    session.finish(signature)
}

/// Parties whose partial signature doesn't satisfy `s_j G = R_j + k lambda_j X_j`
fn identify_culprits<C: Ciphersuite>(
    state: &State<C>,
    params: &SessionParameters,
    k: Scalar<E<C>>,
    partials: &[Scalar<E<C>>],
) -> Vec<PartyId> {
    params
        .parties()
        .iter()
        .enumerate()
        .filter(|(j, _)| {
            let (Some(id), Some(x_j), Ok(r_j), Some(s_j)) = (
                state.ids.get(*j),
                state.public_shares.get(*j),
                state.nonce_points.get(*j),
                partials.get(*j),
            ) else {
                return true;
            };
            let Some(lambda_j) = crate::vss::lagrange_coefficient(&state.ids, id) else {
                return true;
            };
            Point::generator() * *s_j != *r_j + *x_j * (k * lambda_j)
        })
        .map(|(_, party)| party.clone())
        .collect()
}
