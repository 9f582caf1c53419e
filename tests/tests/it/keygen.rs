#[generic_tests::define(attrs(test, test_case::case))]
mod generic {
    use generic_ec::{Curve, NonZero, Point, Scalar};
    use tss_engine::{
        keygen::msg::{
            MsgRound1, MsgRound2Decommit, MsgRound2Share, ROUND1, ROUND2_DECOMMIT, ROUND2_SHARE,
        },
        paillier,
        primes::Cancellation,
        vss,
        zk::{FacProof, ModProof},
        Envelope, Error, ErrorKind, KeyShare, PartyId,
    };
    use tss_engine_tests::{parties, session_params, run_protocol, Network};

    #[test_case::case(1, 2; "t1n2")]
    #[test_case::case(1, 3; "t1n3")]
    #[test_case::case(2, 4; "t2n4")]
    fn keygen<E: Curve>(t: u16, n: u16) {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(n);

        let key_shares = tss_engine_tests::keygen::<E, _>(&mut rng, &parties, t).unwrap();
        assert_eq!(key_shares.len(), usize::from(n));

        let public_key = key_shares[0].public_key();
        for (i, key_share) in key_shares.iter().enumerate() {
            key_share.validate().unwrap();
            assert_eq!(key_share.public_key(), public_key);
            assert_eq!(key_share.threshold(), t);
            assert_eq!(key_share.public_shares(), key_shares[0].public_shares());
            assert_eq!(key_share.paillier_pks(), key_shares[0].paillier_pks());
            assert_eq!(key_share.ntilde(), key_shares[0].ntilde());
            // parties were given in reverse order, share positions are sorted by key
            assert_eq!(*key_share.owner(), parties[i]);
            assert_eq!(key_share.index(), parties.len() - 1 - i);
            assert_eq!(
                Point::generator() * key_share.secrets().secret_share().as_ref(),
                key_share.public_shares()[key_share.index()]
            );
        }

        // any t + 1 shares reconstruct the secret key
        let ids = key_shares[..=usize::from(t)]
            .iter()
            .map(|k| *k.secrets().share_id())
            .collect::<Vec<NonZero<Scalar<E>>>>();
        let shares = key_shares[..=usize::from(t)]
            .iter()
            .map(|k| *k.secrets().secret_share().as_ref())
            .collect::<Vec<_>>();
        let sk = vss::reconstruct(&ids, &shares).unwrap();
        assert_eq!(Point::generator() * sk, public_key);

        let stored = serde_json::to_string(&key_shares[0]).unwrap();
        let restored: tss_engine::KeyShare<E> = serde_json::from_str(&stored).unwrap();
        restored.validate().unwrap();
        assert_eq!(restored.public_key(), public_key);
        assert_eq!(restored.owner(), key_shares[0].owner());
        assert_eq!(
            restored.secrets().secret_share().as_ref(),
            key_shares[0].secrets().secret_share().as_ref()
        );
    }

    /// Runs keygen among 3 parties with `t = 1`, letting `tamper` modify messages in flight
    fn keygen_with<E: Curve>(
        rng: &mut rand_dev::DevRng,
        parties: &[PartyId],
        tamper: impl FnMut(&mut Envelope),
    ) -> Result<Vec<KeyShare<E>>, Error> {
        let (mut network, outboxes) = Network::new(parties);
        let participants = session_params(parties, 1)
            .into_iter()
            .zip(outboxes)
            .map(|(params, outbox)| tss_engine::keygen::<E>(params).build(outbox, &mut *rng))
            .collect::<Vec<_>>();
        run_protocol(&participants, &mut network, tamper)
    }

    fn assert_blamed(err: Error, cheater: &PartyId) {
        assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
        assert_eq!(err.culprits(), [cheater.clone()]);
    }

    #[test]
    fn tampered_share_blames_sender<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);
        let cheater = parties[0].clone();

        let err = keygen_with::<E>(&mut rng, &parties, |envelope: &mut Envelope| {
            if envelope.kind == ROUND2_SHARE && envelope.from == cheater {
                let mut msg: MsgRound2Share<E> = envelope.payload().unwrap();
                msg.share = msg.share + Scalar::one();
                envelope.data = serde_json::to_value(&msg).unwrap();
            }
        })
        .unwrap_err();
        assert_blamed(err, &cheater);
    }

    #[test]
    fn invalid_dln_proof_blames_sender<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);
        let cheater = parties[0].clone();

        let err = keygen_with::<E>(&mut rng, &parties, |envelope: &mut Envelope| {
            if envelope.kind == ROUND1 && envelope.from == cheater {
                let mut msg: MsgRound1 = envelope.payload().unwrap();
                // each proof is valid, but for the opposite statement
                core::mem::swap(&mut msg.dln_proof_1, &mut msg.dln_proof_2);
                envelope.data = serde_json::to_value(&msg).unwrap();
            }
        })
        .unwrap_err();
        assert_blamed(err, &cheater);
    }

    #[test]
    fn invalid_mod_proof_blames_sender<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);
        let cheater = parties[0].clone();

        // valid proof, but for another modulus
        let other_key = paillier::generate_keypair(
            &mut rng,
            tss_engine_tests::TEST_PRIME_BITS.paillier_modulus,
            2,
            &Cancellation::new(),
        )
        .unwrap();
        let other_proof = ModProof::prove(
            &mut rng,
            other_key.public_key().n(),
            other_key.p(),
            other_key.q(),
            &[b"another context".as_slice()],
        )
        .unwrap();

        let err = keygen_with::<E>(&mut rng, &parties, |envelope: &mut Envelope| {
            if envelope.kind == ROUND2_DECOMMIT && envelope.from == cheater {
                let mut msg: MsgRound2Decommit<E> = envelope.payload().unwrap();
                msg.mod_proof = other_proof.clone();
                envelope.data = serde_json::to_value(&msg).unwrap();
            }
        })
        .unwrap_err();
        assert_blamed(err, &cheater);
    }

    #[test]
    fn invalid_fac_proof_blames_sender<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);
        let cheater = parties[0].clone();

        // proof addressed to one recipient is forwarded to the other one, where it's checked
        // against different ring-Pedersen parameters
        let mut first_proof: Option<FacProof> = None;
        let err = keygen_with::<E>(&mut rng, &parties, |envelope: &mut Envelope| {
            if envelope.kind == ROUND2_SHARE && envelope.from == cheater {
                let mut msg: MsgRound2Share<E> = envelope.payload().unwrap();
                match &first_proof {
                    None => first_proof = Some(msg.fac_proof.clone()),
                    Some(proof) => {
                        msg.fac_proof = proof.clone();
                        envelope.data = serde_json::to_value(&msg).unwrap();
                    }
                }
            }
        })
        .unwrap_err();
        assert!(first_proof.is_some());
        assert_blamed(err, &cheater);
    }

    #[test]
    fn wrong_decommitment_blames_sender<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);
        let cheater = parties[0].clone();

        let err = keygen_with::<E>(&mut rng, &parties, |envelope: &mut Envelope| {
            if envelope.kind == ROUND2_DECOMMIT && envelope.from == cheater {
                envelope.data["opening"] = serde_json::Value::String("00".repeat(32));
            }
        })
        .unwrap_err();
        assert_blamed(err, &cheater);
    }

    #[test]
    fn key_share_with_inconsistent_public_shares_is_rejected<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let key_shares = tss_engine_tests::keygen::<E, _>(&mut rng, &parties(3), 1).unwrap();
        let key_share = key_shares.iter().find(|k| k.index() == 1).unwrap();

        let valid = serde_json::to_value(key_share).unwrap();
        serde_json::from_value::<KeyShare<E>>(valid.clone()).unwrap();

        // own public share is intact, but the third one no longer lies on the polynomial
        let mut tampered = valid.clone();
        tampered["big_x"][2] = tampered["big_x"][1].clone();
        let err = serde_json::from_value::<KeyShare<E>>(tampered).unwrap_err();
        assert!(err.to_string().contains("polynomial"), "{err}");

        let mut tampered = valid.clone();
        let ks = tampered["ks"].as_array_mut().unwrap();
        ks.swap(0, 2);
        let err = serde_json::from_value::<KeyShare<E>>(tampered).unwrap_err();
        assert!(err.to_string().contains("share ids"), "{err}");

        let mut tampered = valid;
        tampered["index"] = serde_json::json!(7);
        let err = serde_json::from_value::<KeyShare<E>>(tampered).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn waits_for_other_parties<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);

        let (mut network, outboxes) = Network::new(&parties);
        let participants = session_params(&parties, 1)
            .into_iter()
            .zip(outboxes)
            .map(|(params, outbox)| tss_engine::keygen::<E>(params).build(outbox, &mut rng))
            .collect::<Vec<_>>();

        for participant in &participants {
            assert!(participant.waiting_for().unwrap().is_empty());
            participant.start().unwrap();
        }
        let mut others = parties[1..].to_vec();
        others.sort();
        assert_eq!(participants[0].waiting_for().unwrap(), others);
        assert!(participants[0].output().unwrap().is_none());

        let err = participants[0].start().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        network.run(&participants, |_| ()).unwrap();
        for participant in &participants {
            assert!(participant.waiting_for().unwrap().is_empty());
            assert!(participant.output().unwrap().is_some());
        }
    }

    #[test]
    fn rejects_misaddressed_messages<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(3);

        let (_network, outboxes) = Network::new(&parties);
        let participants = session_params(&parties, 1)
            .into_iter()
            .zip(outboxes)
            .map(|(params, outbox)| tss_engine::keygen::<E>(params).build(outbox, &mut rng))
            .collect::<Vec<_>>();
        let alice = &participants[0];

        let from_self = Envelope::wrap(ROUND1, &(), parties[0].clone(), None).unwrap();
        let err = alice.update(from_self).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let stranger = tss_engine::PartyId::new("stranger", 1000);
        let from_stranger = Envelope::wrap(ROUND1, &(), stranger.clone(), None).unwrap();
        let err = alice.update(from_stranger).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.culprits(), [stranger]);

        let unknown_type = Envelope::wrap("ecdsa:keygen:round9", &(), parties[1].clone(), None).unwrap();
        assert_eq!(
            alice.update(unknown_type).unwrap_err().kind(),
            ErrorKind::Protocol
        );

        let broadcast_share = Envelope::wrap(ROUND2_SHARE, &(), parties[1].clone(), None).unwrap();
        assert_eq!(
            alice.update(broadcast_share).unwrap_err().kind(),
            ErrorKind::Protocol
        );

        let for_someone_else = Envelope::wrap(
            ROUND2_SHARE,
            &(),
            parties[1].clone(),
            Some(parties[2].clone()),
        )
        .unwrap();
        assert_eq!(
            alice.update(for_someone_else).unwrap_err().kind(),
            ErrorKind::Protocol
        );

        // protocol violations don't abort the session
        assert!(alice.output().unwrap().is_none());
    }

    #[test]
    fn accepts_valid_pre_params<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(2);

        let pre_params = session_params(&parties, 1)
            .iter()
            .map(|params| {
                tss_engine::pre_params::PreParamsGenerator::new(params.pre_params_timeout())
                    .set_prime_bits(params.prime_bits())
                    .set_concurrency(3)
                    .generate(&mut rng)
                    .unwrap()
            })
            .collect::<Vec<_>>();

        let (mut network, outboxes) = Network::new(&parties);
        let participants = session_params(&parties, 1)
            .into_iter()
            .zip(outboxes)
            .zip(&pre_params)
            .map(|((params, outbox), pre_params)| {
                tss_engine::keygen::<E>(params)
                    .set_pre_params(pre_params.clone())
                    .build(outbox, &mut rng)
            })
            .collect::<Vec<_>>();
        let key_shares = run_protocol(&participants, &mut network, |_| ()).unwrap();

        for key_share in &key_shares {
            let own = pre_params
                .iter()
                .find(|p| p.ntilde() == &key_share.ntilde()[key_share.index()])
                .unwrap();
            assert_eq!(key_share.pre_params().h1(), own.h1());
        }
    }

    #[test]
    fn rejects_invalid_pre_params<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let parties = parties(2);
        let params = session_params(&parties, 1).remove(0);
        let (_network, mut outboxes) = Network::new(&parties);

        let keygen = tss_engine::keygen::<E>(params)
            .set_pre_params(tss_engine::pre_params::DirtyPreParams::default())
            .build(outboxes.remove(0), &mut rng);
        assert!(keygen.is_failed());
        assert_eq!(keygen.start().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[instantiate_tests(<generic_ec::curves::Secp256k1>)]
    mod secp256k1 {}
    #[instantiate_tests(<generic_ec::curves::Ed25519>)]
    mod ed25519 {}
}
