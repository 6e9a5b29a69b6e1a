// Request descriptors and response parsing for the upload API

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::constants::API_VERSION;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::signature::{api_sign_request, ParamValue, RequestParams};
use crate::url::ResourceType;

/// The `file` field of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePayload {
    /// Remote URL or data URI, fetched by the service
    Remote(String),
    /// Raw bytes sent as a multipart file part
    Bytes { filename: String, data: Bytes },
}

impl FilePayload {
    pub fn len(&self) -> usize {
        match self {
            FilePayload::Remote(url) => url.len(),
            FilePayload::Bytes { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the transport needs to perform one API call
///
/// Built and signed without any I/O; the transport owns the socket.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub fields: RequestParams,
    pub file: Option<FilePayload>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn post(url: impl Into<String>, fields: RequestParams) -> Self {
        Self {
            method: reqwest::Method::POST,
            url: url.into(),
            headers: Vec::new(),
            fields,
            file: None,
            timeout: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(ParamValue::to_wire)
    }
}

/// Raw response as returned by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Completed upload as reported by the service
///
/// `bytes` and `etag` are the service's aggregate size and integrity hash;
/// they are surfaced untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub public_id: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    /// Every other field of the response
    #[serde(flatten)]
    pub extra: Options,
}

/// `<upload_prefix>/v1_1/<cloud>/<resource_type>/<action>`
pub fn api_url(config: &Config, resource_type: ResourceType, action: &str) -> Result<String> {
    let cloud_name = config.require_cloud_name()?;
    Ok(format!(
        "{}/{}/{}/{}/{}",
        config.upload_prefix.trim_end_matches('/'),
        API_VERSION,
        cloud_name,
        resource_type,
        action
    ))
}

/// Add `timestamp`, `signature` and `api_key` to request parameters
///
/// Missing credentials fail here, so a signed endpoint is never called
/// unsigned.
pub fn signed_fields(params: &RequestParams, config: &Config, timestamp: i64) -> Result<RequestParams> {
    let api_key = config.require_api_key()?;
    let api_secret = config.require_api_secret()?;

    let mut fields = params.clone();
    fields.insert("timestamp".into(), timestamp.into());
    let signature = api_sign_request(&fields, Some(api_secret), config.signature_algorithm)?;
    fields.insert("signature".into(), signature.into());
    fields.insert("api_key".into(), api_key.into());
    Ok(fields)
}

/// Turn a transport response into a typed result
///
/// An `error` object in the body is surfaced with its message verbatim,
/// whatever the status code.
pub fn parse_response<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    let value: Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(e) if response.is_success() => return Err(e.into()),
        Err(_) => {
            return Err(Error::server(
                response.status,
                format!(
                    "Server returned unexpected status code - {}",
                    response.status
                ),
            ))
        }
    };

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::server(response.status, message));
    }

    if !response.is_success() {
        return Err(Error::server(
            response.status,
            format!(
                "Server returned unexpected status code - {}",
                response.status
            ),
        ));
    }

    Ok(serde_json::from_value(value)?)
}
