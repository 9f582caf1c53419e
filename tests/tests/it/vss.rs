#[generic_tests::define(attrs(test, test_case::case))]
mod generic {
    use generic_ec::{Curve, NonZero, Scalar, SecretScalar};
    use tss_engine::vss;

    fn ids<E: Curve>(keys: &[u64]) -> Vec<NonZero<Scalar<E>>> {
        keys.iter()
            .map(|k| NonZero::from_scalar(Scalar::from(*k)).unwrap())
            .collect()
    }

    #[test_case::case(1, 3; "t1n3")]
    #[test_case::case(2, 5; "t2n5")]
    #[test_case::case(4, 5; "t4n5")]
    fn threshold_shares_reconstruct_secret<E: Curve>(t: u16, n: u16) {
        let mut rng = rand_dev::DevRng::new();
        let secret = SecretScalar::<E>::random(&mut rng);
        let keys = (1..=u64::from(n)).map(|i| i * 11).collect::<Vec<_>>();
        let ids = ids::<E>(&keys);

        let (commitment, shares) = vss::share(&mut rng, t, &secret, &ids);
        assert_eq!(commitment.degree(), usize::from(t));
        assert_eq!(
            commitment.constant_term(),
            generic_ec::Point::generator() * secret.as_ref()
        );
        for (id, share) in ids.iter().zip(&shares) {
            assert!(vss::verify_share(&commitment, id, share.as_ref()));
        }

        let shares = shares.iter().map(|s| *s.as_ref()).collect::<Vec<_>>();
        let k = usize::from(t) + 1;
        // any t + 1 shares work, take the last ones
        let reconstructed = vss::reconstruct(&ids[n as usize - k..], &shares[n as usize - k..]);
        assert_eq!(reconstructed, Some(*secret.as_ref()));

        // t shares don't determine the secret: different subsets interpolate to different values
        let first = vss::reconstruct(&ids[..k - 1], &shares[..k - 1]).unwrap();
        let last = vss::reconstruct(&ids[n as usize - k + 1..], &shares[n as usize - k + 1..]).unwrap();
        assert_ne!(first, *secret.as_ref());
        assert_ne!(last, *secret.as_ref());
        assert_ne!(first, last);
    }

    #[test]
    fn wrong_share_is_detected<E: Curve>() {
        let mut rng = rand_dev::DevRng::new();
        let secret = SecretScalar::<E>::random(&mut rng);
        let ids = ids::<E>(&[1, 2, 3]);

        let (commitment, shares) = vss::share(&mut rng, 1, &secret, &ids);
        let tampered = shares[0].as_ref() + Scalar::one();
        assert!(!vss::verify_share(&commitment, &ids[0], &tampered));
        assert!(!vss::verify_share(&commitment, &ids[1], shares[0].as_ref()));
    }

    #[test]
    fn repeated_ids_dont_interpolate<E: Curve>() {
        let repeated = ids::<E>(&[1, 2, 2]);
        assert_eq!(vss::lagrange_coefficient(&repeated, &repeated[0]), None);
        assert_eq!(
            vss::reconstruct(&repeated, &[Scalar::one(), Scalar::one(), Scalar::one()]),
            None
        );

        let pair = ids::<E>(&[1, 2]);
        let stranger = NonZero::from_scalar(Scalar::from(3u64)).unwrap();
        assert_eq!(vss::lagrange_coefficient(&pair, &stranger), None);
    }

    #[instantiate_tests(<generic_ec::curves::Secp256k1>)]
    mod secp256k1 {}
    #[instantiate_tests(<generic_ec::curves::Ed25519>)]
    mod ed25519 {}
}
