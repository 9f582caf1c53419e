use tss_engine::{
    paillier::{self, SecretKey},
    paillier_zk::IntegerExt,
    primes::Cancellation,
    rug::Integer,
    ErrorKind,
};

fn keypair(rng: &mut rand_dev::DevRng) -> SecretKey {
    paillier::generate_keypair(rng, 256, 2, &Cancellation::new()).unwrap()
}

#[test]
fn decrypts_what_was_encrypted() {
    let mut rng = rand_dev::DevRng::new();
    let sk = keypair(&mut rng);
    let pk = sk.public_key();
    assert_eq!(pk.n().significant_bits(), 256);

    let half_n = Integer::from(pk.n() >> 1u32);
    for _ in 0..10 {
        let m = Integer::from_rng_pm(&half_n, &mut rng);
        if m == half_n {
            continue;
        }
        let (c, _nonce) = pk.encrypt(&mut rng, &m).unwrap();
        assert_eq!(sk.decrypt(&c).unwrap(), m);
    }
}

#[test]
fn ciphertexts_add_up() {
    let mut rng = rand_dev::DevRng::new();
    let sk = keypair(&mut rng);
    let pk = sk.public_key();

    let quarter_n = Integer::from(pk.n() >> 3u32);
    let a = Integer::from_rng_pm(&quarter_n, &mut rng);
    let b = Integer::from_rng_pm(&quarter_n, &mut rng);
    let (ca, _) = pk.encrypt(&mut rng, &a).unwrap();
    let (cb, _) = pk.encrypt(&mut rng, &b).unwrap();

    let sum = pk.add(&ca, &cb).unwrap();
    assert_eq!(sk.decrypt(&sum).unwrap(), a + b);
}

#[test]
fn rejects_out_of_range_plaintext() {
    let mut rng = rand_dev::DevRng::new();
    let sk = keypair(&mut rng);
    let pk = sk.public_key();

    let err = pk.encrypt(&mut rng, &pk.n().clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = sk.decrypt(&Integer::from(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn key_proof_is_bound_to_context() {
    let mut rng = rand_dev::DevRng::new();
    let sk = keypair(&mut rng);
    let other = keypair(&mut rng);

    let proof = sk.prove_correct_key(&[b"session", b"alice"]).unwrap();
    proof.verify(sk.public_key(), &[b"session", b"alice"]).unwrap();
    assert!(proof.verify(sk.public_key(), &[b"session", b"bob"]).is_err());
    assert!(proof
        .verify(other.public_key(), &[b"session", b"alice"])
        .is_err());
}

#[test]
fn secret_key_is_restored_from_primes() {
    let mut rng = rand_dev::DevRng::new();
    let sk = keypair(&mut rng);

    let json = serde_json::to_value(&sk).unwrap();
    let restored: SecretKey = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(restored.public_key(), sk.public_key());
    assert_eq!(restored.phi(), sk.phi());

    let mut same_primes = json;
    same_primes["q"] = same_primes["p"].clone();
    assert!(serde_json::from_value::<SecretKey>(same_primes).is_err());
}
