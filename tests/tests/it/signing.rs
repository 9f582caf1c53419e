#[generic_tests::define(attrs(test, test_case::case))]
mod generic {
    use generic_ec::{Point, Scalar, SecretScalar};
    use rand::{seq::SliceRandom, Rng, RngCore};
    use tss_engine::{
        signing::{finalize::finalize, msg::MsgRound3, msg::ROUND3, Signature},
        Ciphersuite, Envelope, ErrorKind, KeyShare, PartyId,
    };
    use tss_engine_tests::{parties, run_protocol, session_params, ExternalVerifier, Network};

    fn sign<C: Ciphersuite>(
        rng: &mut rand_dev::DevRng,
        key_shares: &[&KeyShare<C::Curve>],
        msg: &[u8],
        tamper: impl FnMut(&mut Envelope),
    ) -> Result<Vec<Signature<C>>, tss_engine::Error> {
        let signers = key_shares
            .iter()
            .map(|k| k.owner().clone())
            .collect::<Vec<PartyId>>();
        let (mut network, outboxes) = Network::new(&signers);
        let participants = session_params(&signers, key_shares[0].threshold())
            .into_iter()
            .zip(outboxes)
            .zip(key_shares)
            .map(|((params, outbox), key_share)| {
                tss_engine::signing::<C>(params, key_share, msg).build(outbox, rng)
            })
            .collect::<Vec<_>>();
        run_protocol(&participants, &mut network, tamper)
    }

    #[test_case::case(1, 2, 3; "t1s2n3")]
    #[test_case::case(1, 3, 3; "t1s3n3")]
    #[test_case::case(2, 3, 4; "t2s3n4")]
    fn signing<C: Ciphersuite + ExternalVerifier>(t: u16, signers: usize, n: u16) {
        let mut rng = rand_dev::DevRng::new();
        let key_shares =
            tss_engine_tests::keygen::<C::Curve, _>(&mut rng, &parties(n), t).unwrap();
        let public_key = key_shares[0].public_key();

        let signers = key_shares
            .choose_multiple(&mut rng, signers)
            .collect::<Vec<_>>();

        let mut msg = vec![0u8; rng.gen_range(20..=100)];
        rng.fill_bytes(&mut msg);

        let signatures = sign::<C>(&mut rng, &signers, &msg, |_| ()).unwrap();
        for sig in &signatures {
            sig.verify(&public_key, &msg).unwrap();
            assert_eq!(sig.to_bytes(), signatures[0].to_bytes());
            C::verify_sig(&public_key, sig, &msg).expect("external verifier: invalid signature");
        }

        let decoded = Signature::<C>::from_bytes(&signatures[0].to_bytes()).unwrap();
        decoded.verify(&public_key, &msg).unwrap();
        assert!(decoded.verify(&public_key, b"another message").is_err());

        let unrelated_key = Point::generator() * SecretScalar::<C::Curve>::random(&mut rng);
        assert_ne!(unrelated_key, public_key);
        assert!(decoded.verify(&unrelated_key, &msg).is_err());
        if C::HAS_VERIFIER {
            assert!(C::verify_sig(&unrelated_key, &decoded, &msg).is_err());
        }
    }

    #[test]
    fn tampered_partial_signature_blames_signer<C: Ciphersuite>() {
        let mut rng = rand_dev::DevRng::new();
        let key_shares = tss_engine_tests::keygen::<C::Curve, _>(&mut rng, &parties(3), 1).unwrap();
        let signers = [&key_shares[0], &key_shares[2]];
        let cheater = signers[1].owner().clone();

        let err = sign::<C>(&mut rng, &signers, b"message", |envelope| {
            if envelope.kind == ROUND3 && envelope.from == cheater {
                let mut msg: MsgRound3<C::Curve> = envelope.payload().unwrap();
                msg.partial = msg.partial + Scalar::one();
                envelope.data = serde_json::to_value(&msg).unwrap();
            }
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Verification);
        assert_eq!(err.culprits(), [cheater]);
    }

    #[test]
    fn finalize_rejects_invalid_signature<C: Ciphersuite>() {
        let mut rng = rand_dev::DevRng::new();
        let key_shares = tss_engine_tests::keygen::<C::Curve, _>(&mut rng, &parties(3), 1).unwrap();
        let public_key = key_shares[0].public_key();
        let signers = [&key_shares[1], &key_shares[2]];

        let sig = sign::<C>(&mut rng, &signers, b"message", |_| ())
            .unwrap()
            .remove(0);

        let same = finalize::<C>(sig.r, &[sig.s], &public_key, b"message").unwrap();
        assert_eq!(same.to_bytes(), sig.to_bytes());

        let err = finalize::<C>(sig.r, &[sig.s, Scalar::one()], &public_key, b"message")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Verification);

        let mut bytes = sig.to_bytes();
        let last = bytes.len() - 1;
        bytes[last / 2] ^= 1;
        if let Some(flipped) = Signature::<C>::from_bytes(&bytes) {
            assert!(flipped.verify(&public_key, b"message").is_err());
        }
    }

    #[test]
    fn rejects_mismatching_session<C: Ciphersuite>() {
        let mut rng = rand_dev::DevRng::new();
        let key_shares = tss_engine_tests::keygen::<C::Curve, _>(&mut rng, &parties(3), 1).unwrap();
        let owner = key_shares[0].owner().clone();
        let other = key_shares[1].owner().clone();
        let (_network, outboxes) = Network::new(&[owner.clone(), other.clone()]);

        // signing with someone else's key share
        let params = tss_engine::SessionParameters::new([owner.clone(), other.clone()], other.clone(), 1)
            .unwrap();
        let signing = tss_engine::signing::<C>(params, &key_shares[0], b"msg")
            .build(outboxes[0].clone(), &mut rng);
        assert_eq!(signing.error().unwrap().kind(), ErrorKind::Validation);

        // signer who doesn't hold a share
        let stranger = PartyId::new("stranger", 1000);
        let params = tss_engine::SessionParameters::new([owner.clone(), stranger], owner.clone(), 1)
            .unwrap();
        let signing = tss_engine::signing::<C>(params, &key_shares[0], b"msg")
            .build(outboxes[0].clone(), &mut rng);
        assert!(signing.is_failed());

        // threshold differs from the key's one
        let params = tss_engine::SessionParameters::new(
            key_shares.iter().map(|k| k.owner().clone()),
            owner.clone(),
            2,
        )
        .unwrap();
        let signing = tss_engine::signing::<C>(params, &key_shares[0], b"msg")
            .build(outboxes[0].clone(), &mut rng);
        assert!(signing.is_failed());
        assert_eq!(signing.start().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[instantiate_tests(<tss_engine::ciphersuite::Secp256k1>)]
    mod secp256k1 {}
    #[instantiate_tests(<tss_engine::ciphersuite::Ed25519>)]
    mod ed25519 {}
}
