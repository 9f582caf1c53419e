use generic_ec::curves::Secp256k1;
use tss_engine::{keygen::msg::ROUND1, Envelope, ErrorKind, Participant, PartyId};
use tss_engine_tests::{parties, session_params, Network};

#[test]
fn failed_participant_returns_its_error() {
    let mut rng = rand_dev::DevRng::new();
    let parties = parties(2);
    let params = session_params(&parties, 1).remove(0);
    let (_network, mut outboxes) = Network::new(&parties);

    let participant = tss_engine::keygen::<Secp256k1>(params)
        .set_pre_params(tss_engine::pre_params::DirtyPreParams::default())
        .build(outboxes.remove(0), &mut rng);
    let Participant::Failed(err) = &participant else {
        panic!("participant must fail to build")
    };
    assert_eq!(participant.error(), Some(err));

    let envelope = Envelope::wrap(ROUND1, &(), parties[1].clone(), None).unwrap();
    assert_eq!(participant.party_id().unwrap_err(), *err);
    assert_eq!(participant.start().unwrap_err(), *err);
    assert_eq!(participant.validate_message(&envelope).unwrap_err(), *err);
    assert_eq!(participant.store_message(envelope.clone()).unwrap_err(), *err);
    assert_eq!(participant.update(envelope).unwrap_err(), *err);
    assert_eq!(participant.waiting_for().unwrap_err(), *err);
    assert_eq!(participant.output().unwrap_err(), *err);
}

#[test]
fn active_participant_exposes_party_id() {
    let mut rng = rand_dev::DevRng::new();
    let parties = parties(2);
    let params = session_params(&parties, 1).remove(0);
    let (_network, mut outboxes) = Network::new(&parties);

    let participant =
        tss_engine::keygen::<Secp256k1>(params).build(outboxes.remove(0), &mut rng);
    assert!(!participant.is_failed());
    assert!(participant.error().is_none());
    assert_eq!(participant.party_id().unwrap(), &parties[0]);
}

#[test]
fn invalid_session_parameters_are_rejected() {
    let alice = PartyId::new("alice", 1);
    let bob = PartyId::new("bob", 2);

    let err = tss_engine::SessionParameters::new([alice.clone(), bob.clone()], alice.clone(), 2)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = tss_engine::SessionParameters::new([alice.clone(), bob.clone()], alice.clone(), 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let twin = PartyId::new("alice's twin", 1);
    let err = tss_engine::SessionParameters::new([alice.clone(), twin], alice.clone(), 1)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let zero = PartyId::new("zero", 0);
    let err = tss_engine::SessionParameters::new([alice.clone(), zero], alice.clone(), 1)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let carol = PartyId::new("carol", 3);
    let err = tss_engine::SessionParameters::new([alice, bob], carol, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
