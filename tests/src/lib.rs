use futures::channel::mpsc;
use rand_core::{CryptoRng, RngCore};
use tss_engine::{
    generic_ec::{Curve, Point},
    signing::Signature,
    Ciphersuite, Envelope, Error, KeyShare, Participant, Party, PartyId, PrimeBits,
    SessionParameters,
};

/// Prime sizes small enough to generate pre-parameters in tests within seconds
pub const TEST_PRIME_BITS: PrimeBits = PrimeBits {
    safe_prime: 128,
    paillier_modulus: 256,
};

pub trait ExternalVerifier: Ciphersuite {
    type InvalidSig: core::fmt::Debug;
    /// `false` if [`verify_sig`](Self::verify_sig) accepts everything
    const HAS_VERIFIER: bool = true;

    fn verify_sig(
        pk: &Point<Self::Curve>,
        sig: &Signature<Self>,
        msg: &[u8],
    ) -> Result<(), Self::InvalidSig>;
}

impl ExternalVerifier for tss_engine::ciphersuite::Ed25519 {
    type InvalidSig = ed25519::SignatureError;

    fn verify_sig(
        pk: &Point<Self::Curve>,
        sig: &Signature<Self>,
        msg: &[u8],
    ) -> Result<(), ed25519::SignatureError> {
        let pk = ed25519::VerifyingKey::from_bytes(
            Self::serialize_point(pk)
                .as_ref()
                .try_into()
                .expect("wrong size of pk"),
        )?;
        let sig_bytes: [u8; 64] = sig
            .to_bytes()
            .as_slice()
            .try_into()
            .expect("wrong size of signature");
        let sig = ed25519::Signature::from_bytes(&sig_bytes);

        pk.verify_strict(msg, &sig)
    }
}

impl ExternalVerifier for tss_engine::ciphersuite::Secp256k1 {
    type InvalidSig = core::convert::Infallible;
    const HAS_VERIFIER: bool = false;

    fn verify_sig(
        _pk: &Point<Self::Curve>,
        _sig: &Signature<Self>,
        _msg: &[u8],
    ) -> Result<(), Self::InvalidSig> {
        // No external verifier for secp256k1 ciphersuite
        Ok(())
    }
}

/// Parties `party-1`, .., `party-n` listed in reverse key order
pub fn parties(n: u16) -> Vec<PartyId> {
    (1..=n)
        .rev()
        .map(|i| PartyId::new(format!("party-{i}"), u64::from(i) * 7))
        .collect()
}

/// Session parameters of every party, with test prime sizes
pub fn session_params(parties: &[PartyId], t: u16) -> Vec<SessionParameters> {
    parties
        .iter()
        .map(|party| {
            SessionParameters::new(parties.iter().cloned(), party.clone(), t)
                .expect("invalid session parameters")
                .set_prime_bits(TEST_PRIME_BITS)
                .expect("invalid prime bits")
                .set_concurrency(2)
                .set_session_nonce(*b"test session")
        })
        .collect()
}

/// In-process network
///
/// Every party sends to its own channel. [`Network::run`] drains the channels and delivers
/// broadcast messages to everyone except the sender, and point-to-point messages to the
/// recipient only.
pub struct Network {
    parties: Vec<PartyId>,
    sent: Vec<mpsc::UnboundedReceiver<Envelope>>,
}

impl Network {
    /// Creates the network and an outbox for every party, in the given order
    pub fn new(parties: &[PartyId]) -> (Self, Vec<mpsc::UnboundedSender<Envelope>>) {
        let (outboxes, sent) = parties.iter().map(|_| mpsc::unbounded()).unzip();
        (
            Self {
                parties: parties.to_vec(),
                sent,
            },
            outboxes,
        )
    }

    /// Delivers messages until none are left
    ///
    /// `tamper` can modify every message in flight. Returns the first delivery error.
    pub fn run<P: Party>(
        &mut self,
        participants: &[Participant<P>],
        mut tamper: impl FnMut(&mut Envelope),
    ) -> Result<(), Error> {
        assert_eq!(participants.len(), self.parties.len());
        loop {
            let mut delivered = false;
            for sent in &mut self.sent {
                while let Ok(Some(mut envelope)) = sent.try_next() {
                    delivered = true;
                    tamper(&mut envelope);
                    for (party, participant) in self.parties.iter().zip(participants) {
                        if *party == envelope.from
                            || envelope.to.as_ref().is_some_and(|to| to != party)
                        {
                            continue;
                        }
                        participant.update(envelope.clone())?;
                    }
                }
            }
            if !delivered {
                return Ok(());
            }
        }
    }
}

/// Starts every participant and runs the network to completion
pub fn run_protocol<P: Party>(
    participants: &[Participant<P>],
    network: &mut Network,
    tamper: impl FnMut(&mut Envelope),
) -> Result<Vec<P::Output>, Error> {
    for participant in participants {
        participant.start()?;
    }
    network.run(participants, tamper)?;
    participants
        .iter()
        .map(|p| Ok(p.output()?.expect("protocol didn't complete")))
        .collect()
}

/// Carries out keygen among `parties` with threshold `t`
pub fn keygen<E: Curve, R: RngCore + CryptoRng>(
    rng: &mut R,
    parties: &[PartyId],
    t: u16,
) -> Result<Vec<KeyShare<E>>, Error> {
    let (mut network, outboxes) = Network::new(parties);
    let participants = session_params(parties, t)
        .into_iter()
        .zip(outboxes)
        .map(|(params, outbox)| tss_engine::keygen::<E>(params).build(outbox, rng))
        .collect::<Vec<_>>();
    run_protocol(&participants, &mut network, |_| ())
}
