// HTTP transport boundary
//
// The core only builds `ApiRequest` descriptors; implementations of
// `Transport` own all socket I/O.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::request::{ApiRequest, ApiResponse, FilePayload};
use crate::constants::{TIMEOUT_MESSAGE, TIMEOUT_STATUS};
use crate::error::{Error, Result};

/// Pluggable HTTP client
///
/// Implementations report a non-2xx status as a normal response; only
/// connection-level failures and timeouts are errors. A timeout must be
/// reported as `Error::Server { status: 499, .. }`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `Transport` backed by `reqwest`, sending multipart forms
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn form(request: ApiRequest) -> Form {
        let mut form = Form::new();
        for (key, value) in &request.fields {
            form = form.text(key.clone(), value.to_wire());
        }
        match request.file {
            Some(FilePayload::Remote(url)) => form = form.text("file", url),
            Some(FilePayload::Bytes { filename, data }) => {
                let part = Part::stream(reqwest::Body::from(data)).file_name(filename);
                form = form.part("file", part);
            }
            None => {}
        }
        form
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let url = request.url.clone();
        builder = builder.multipart(Self::form(request));

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        tracing::debug!(url = %url, status = status, bytes = body.len(), "API response");
        Ok(ApiResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::server(TIMEOUT_STATUS, TIMEOUT_MESSAGE)
    } else {
        Error::Transport(e.to_string())
    }
}
