// Request signing tests

use chrono::{TimeZone, Utc};
use cloudinary::signature::{
    api_sign_request, ParamValue, RequestParams, SignatureAlgorithm, SignaturePayload,
};
use cloudinary::Error;
use sha1::{Digest, Sha1};
use sha2::Sha256;

fn params(pairs: &[(&str, ParamValue)]) -> RequestParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_signature_ignores_insertion_order() {
    // Test: {b:2,a:1} and {a:1,b:2} sign identically
    let forward: SignaturePayload = vec![("b", 2), ("a", 1)].into_iter().collect();
    let backward: SignaturePayload = vec![("a", 1), ("b", 2)].into_iter().collect();
    assert_eq!(
        forward.sign(Some("secret"), SignatureAlgorithm::Sha1).unwrap(),
        backward.sign(Some("secret"), SignatureAlgorithm::Sha1).unwrap()
    );
}

#[test]
fn test_sha1_matches_manual_digest() {
    let params = params(&[
        ("public_id", "sample".into()),
        ("timestamp", 1315060510u64.into()),
        ("tags", vec!["a", "b"].into()),
        ("api_key", "1234".into()),
        ("file", "bytes".into()),
    ]);
    let signature = api_sign_request(&params, Some("abcd"), SignatureAlgorithm::Sha1).unwrap();
    let expected = hex::encode(Sha1::digest(
        b"public_id=sample&tags=a,b&timestamp=1315060510abcd",
    ));
    assert_eq!(signature, expected);
}

#[test]
fn test_sha256_matches_manual_digest() {
    let params = params(&[("public_id", "sample".into()), ("timestamp", 1315060510u64.into())]);
    let signature = api_sign_request(&params, Some("abcd"), SignatureAlgorithm::Sha256).unwrap();
    let expected = hex::encode(Sha256::digest(b"public_id=sample&timestamp=1315060510abcd"));
    assert_eq!(signature, expected);
}

#[test]
fn test_value_types_are_stringified() {
    let start = Utc.with_ymd_and_hms(2019, 2, 22, 16, 20, 57).unwrap();
    let typed = params(&[("start", start.into()), ("quality", 0.4.into())]);
    let strings = params(&[
        ("start", "2019-02-22T16:20:57.000Z".into()),
        ("quality", "0.4".into()),
    ]);
    assert_eq!(
        api_sign_request(&typed, Some("s"), SignatureAlgorithm::Sha1).unwrap(),
        api_sign_request(&strings, Some("s"), SignatureAlgorithm::Sha1).unwrap()
    );
}

#[test]
fn test_missing_secret_never_signs() {
    let params = params(&[("public_id", "sample".into())]);
    let err = api_sign_request(&params, None, SignatureAlgorithm::Sha1).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_unsupported_algorithm() {
    let err = "md5".parse::<SignatureAlgorithm>().unwrap_err();
    assert!(matches!(err, Error::Signing(_)));
}
