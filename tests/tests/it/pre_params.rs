use std::time::Duration;

use tss_engine::{
    pre_params::{DirtyPreParams, PreParams, PreParamsGenerator},
    primes::Cancellation,
    rug::Integer,
    ErrorKind,
};
use tss_engine_tests::TEST_PRIME_BITS;

fn generate(rng: &mut rand_dev::DevRng) -> PreParams {
    PreParamsGenerator::new(Duration::from_secs(60))
        .set_concurrency(3)
        .set_prime_bits(TEST_PRIME_BITS)
        .generate(rng)
        .unwrap()
}

#[test]
fn generated_pre_params_are_valid() {
    let mut rng = rand_dev::DevRng::new();
    let pre_params = generate(&mut rng);

    pre_params.validate().unwrap();
    assert_eq!(
        pre_params.ntilde().significant_bits(),
        2 * TEST_PRIME_BITS.safe_prime
    );
    assert_eq!(
        pre_params.paillier_sk().public_key().n().significant_bits(),
        TEST_PRIME_BITS.paillier_modulus
    );
    assert_ne!(pre_params.h1(), pre_params.h2());
    let pow_mod = |base: &Integer, exp: &Integer| {
        base.clone().pow_mod(exp, pre_params.ntilde()).unwrap()
    };
    assert_eq!(pow_mod(pre_params.h1(), pre_params.alpha()), *pre_params.h2());
    assert_eq!(pow_mod(pre_params.h2(), pre_params.beta()), *pre_params.h1());

    let dirty = DirtyPreParams::from(pre_params);
    assert!(dirty.is_structurally_valid());
    assert!(dirty.is_valid_with_proof());
    dirty.validate().unwrap();
}

#[test]
fn generation_times_out() {
    let mut rng = rand_dev::DevRng::new();
    let err = PreParamsGenerator::new(Duration::ZERO)
        .set_concurrency(3)
        .generate(&mut rng)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[test]
fn generation_is_cancellable() {
    let mut rng = rand_dev::DevRng::new();
    let cancel = Cancellation::new();
    cancel.cancel();
    let err = PreParamsGenerator::new(Duration::from_secs(60))
        .set_concurrency(3)
        .generate_with(&mut rng, &cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[test]
fn empty_pre_params_are_missing() {
    let dirty = DirtyPreParams::default();
    assert!(!dirty.is_structurally_valid());
    assert!(!dirty.is_valid_with_proof());
    assert_eq!(dirty.validate().unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn pre_params_without_primes_are_outdated() {
    let mut rng = rand_dev::DevRng::new();
    let pre_params = generate(&mut rng);

    let mut json = serde_json::to_value(&pre_params).unwrap();
    let fields = json.as_object_mut().unwrap();
    fields.remove("p");
    fields.remove("q");

    let dirty: DirtyPreParams = serde_json::from_value(json).unwrap();
    assert!(dirty.is_structurally_valid());
    assert!(!dirty.is_valid_with_proof());
    let err = dirty.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("outdated"), "{err}");
}

#[test]
fn inconsistent_pre_params_are_rejected() {
    let mut rng = rand_dev::DevRng::new();
    let pre_params = generate(&mut rng);

    let mut swapped = DirtyPreParams::from(pre_params.clone());
    swapped.h2 = Some(pre_params.h1().clone());
    assert!(swapped.is_valid_with_proof());
    assert_eq!(swapped.validate().unwrap_err().kind(), ErrorKind::Validation);

    let mut wrong_ntilde = DirtyPreParams::from(pre_params.clone());
    wrong_ntilde.ntilde = Some(Integer::from(pre_params.ntilde() + 2u32));
    assert_eq!(
        wrong_ntilde.validate().unwrap_err().kind(),
        ErrorKind::Validation
    );

    let mut not_prime = DirtyPreParams::from(pre_params.clone());
    not_prime.p = Some(Integer::from(pre_params.p() + 1u32));
    assert_eq!(not_prime.validate().unwrap_err().kind(), ErrorKind::Validation);
}
