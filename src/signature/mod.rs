//! Request signing
//!
//! Authenticated calls and signed delivery URLs share one algorithm:
//!
//! ```text
//! signature = hex(HASH(sorted "key=value" pairs joined by "&" + api_secret))
//! ```
//!
//! Values are rendered to their exact wire strings before hashing, and
//! keys are sorted explicitly, so the digest never depends on how the
//! parameter map was built.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::URL_SIGNATURE_LENGTH;
use crate::error::{Error, Result};

/// Keys never included in the signed payload
const EXCLUDED_KEYS: &[&str] = &["file", "signature", "api_key"];

/// Hash used to compute signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            _ => Err(Error::Signing(format!(
                "Signature algorithm {} is not supported. Supported algorithms: sha1, sha256",
                s
            ))),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request parameter, already in wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    /// Multi-valued parameter, joined with commas when signed
    Multi(Vec<String>),
}

impl ParamValue {
    /// The string that is hashed for this value
    pub fn to_wire(&self) -> String {
        match self {
            ParamValue::Single(value) => value.clone(),
            ParamValue::Multi(values) => values.join(","),
        }
    }

    pub fn is_present(&self) -> bool {
        match self {
            ParamValue::Single(value) => !value.is_empty(),
            ParamValue::Multi(values) => values.iter().any(|v| !v.is_empty()),
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Single(value.clone())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Multi(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

macro_rules! param_value_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    ParamValue::Single(value.to_string())
                }
            }
        )*
    };
}

param_value_from_number!(i32, i64, u32, u64, usize, f64);

/// Timestamps sign as ISO-8601 with millisecond precision
impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Single(value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Parameters destined for one request
pub type RequestParams = BTreeMap<String, ParamValue>;

/// Sorted key to wire-string mapping that is hashed
///
/// Excludes the file payload, the signature itself and the API key, as
/// well as blank values. The secret is only appended at hash time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignaturePayload {
    entries: BTreeMap<String, String>,
}

impl SignaturePayload {
    pub fn from_params(params: &RequestParams) -> Self {
        params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// `key=value` pairs in ascending key order, joined with `&`
    pub fn string_to_sign(&self) -> String {
        let mut sorted: Vec<(&String, &String)> = self.entries.iter().collect();
        sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
        sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Hash the payload with the secret appended, as lowercase hex
    pub fn sign(&self, secret: Option<&str>, algorithm: SignatureAlgorithm) -> Result<String> {
        let secret = require_secret(secret)?;
        let mut to_sign = self.string_to_sign();
        to_sign.push_str(secret);
        Ok(hex::encode(algorithm.digest(to_sign.as_bytes())))
    }
}

impl<K, V> FromIterator<(K, V)> for SignaturePayload
where
    K: AsRef<str>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .filter(|(k, _)| !EXCLUDED_KEYS.contains(&k.as_ref()))
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .filter(|(_, v)| v.is_present())
            .map(|(k, v)| (k, v.to_wire()))
            .collect();
        Self { entries }
    }
}

fn require_secret(secret: Option<&str>) -> Result<&str> {
    secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::configuration("Must supply api_secret"))
}

/// Sign request parameters with the API secret
///
/// ```
/// use cloudinary::signature::{api_sign_request, RequestParams, SignatureAlgorithm};
///
/// let mut params = RequestParams::new();
/// params.insert("public_id".into(), "sample".into());
/// params.insert("version".into(), 1312461204u64.into());
///
/// let signature = api_sign_request(&params, Some("secret"), SignatureAlgorithm::Sha1).unwrap();
/// assert_eq!(signature.len(), 40);
/// ```
pub fn api_sign_request(
    params: &RequestParams,
    secret: Option<&str>,
    algorithm: SignatureAlgorithm,
) -> Result<String> {
    let payload = SignaturePayload::from_params(params);
    let signature = payload.sign(secret, algorithm)?;
    tracing::debug!(
        params = payload.len(),
        algorithm = %algorithm,
        "Signed request parameters"
    );
    Ok(signature)
}

/// Signature component of a signed delivery URL: `s--XXXXXXXX--`
///
/// `to_sign` is the transformation path and the public id joined by `/`.
pub fn url_signature(
    to_sign: &str,
    secret: Option<&str>,
    algorithm: SignatureAlgorithm,
) -> Result<String> {
    let secret = require_secret(secret)?;
    let mut data = to_sign.to_string();
    data.push_str(secret);
    let encoded = URL_SAFE.encode(algorithm.digest(data.as_bytes()));
    Ok(format!("s--{}--", &encoded[..URL_SIGNATURE_LENGTH]))
}
