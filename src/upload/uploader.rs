// Uploader facade: upload, unsigned upload, explicit and large uploads

use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;

use super::chunked::{ChunkedUpload, PartOutcome, PartTemplate, UploadPlan};
use super::params::build_upload_params;
use super::request::{api_url, parse_response, signed_fields, ApiRequest, FilePayload, UploadResult};
use super::transport::{ReqwestTransport, Transport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::options::{take, take_string, Options};
use crate::url::ResourceType;

/// URL schemes the service fetches itself
const REMOTE_PREFIXES: &[&str] = &["http://", "https://", "s3://", "gs://", "ftp://", "data:"];

/// What to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// Remote URL or data URI, passed to the service as is
    Remote(String),
    /// Local file, read when the request is sent
    Path(PathBuf),
    /// In-memory content
    Bytes { filename: String, data: Bytes },
}

impl UploadSource {
    pub fn is_remote(source: &str) -> bool {
        let lower = source.to_ascii_lowercase();
        REMOTE_PREFIXES.iter().any(|p| lower.starts_with(p))
    }

    async fn into_payload(self) -> Result<FilePayload> {
        match self {
            UploadSource::Remote(url) => Ok(FilePayload::Remote(url)),
            UploadSource::Bytes { filename, data } => Ok(FilePayload::Bytes { filename, data }),
            UploadSource::Path(path) => {
                let data = tokio::fs::read(&path).await?;
                Ok(FilePayload::Bytes {
                    filename: file_name(&path),
                    data: Bytes::from(data),
                })
            }
        }
    }
}

impl From<&str> for UploadSource {
    fn from(source: &str) -> Self {
        if Self::is_remote(source) {
            UploadSource::Remote(source.to_string())
        } else {
            UploadSource::Path(PathBuf::from(source))
        }
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

/// Request fields resolved from options, before signing
struct Prepared {
    config: Config,
    url: String,
    params: crate::signature::RequestParams,
    timeout: Option<Duration>,
}

/// Upload API client
///
/// Holds read-only configuration and a transport; independent uploads
/// may run concurrently on clones.
#[derive(Clone)]
pub struct Uploader {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
}

impl Uploader {
    /// Uploader using the reqwest transport
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn prepare(&self, action: &str, mut options: Options) -> Result<Prepared> {
        let config = self.config.with_overrides(&mut options)?;
        let resource_type = match take_string(&mut options, "resource_type") {
            Some(resource_type) => resource_type.parse()?,
            None => ResourceType::Image,
        };
        let timeout = match take(&mut options, "timeout") {
            Some(value) => Some(Duration::from_millis(value.as_u64().ok_or_else(|| {
                Error::validation("timeout", "expected a number of milliseconds")
            })?)),
            None => config.timeout_ms.map(Duration::from_millis),
        };
        let (params, leftover) = build_upload_params(options)?;
        if !leftover.is_empty() {
            let ignored: Vec<&str> = leftover.keys().map(String::as_str).collect();
            tracing::debug!(ignored = ?ignored, action = action, "Ignoring unrecognized upload options");
        }
        let url = api_url(&config, resource_type, action)?;
        Ok(Prepared {
            config,
            url,
            params,
            timeout,
        })
    }

    /// Signed upload request, ready for the transport
    ///
    /// Everything that can fail locally fails here, before any I/O.
    pub fn prepare_upload(&self, file: FilePayload, options: Options) -> Result<ApiRequest> {
        let prepared = self.prepare("upload", options)?;
        let fields = signed_fields(&prepared.params, &prepared.config, Utc::now().timestamp())?;
        let mut request = ApiRequest::post(prepared.url, fields);
        request.file = Some(file);
        request.timeout = prepared.timeout;
        Ok(request)
    }

    /// Upload without a signature, authorized by an unsigned upload preset
    pub fn prepare_unsigned_upload(
        &self,
        file: FilePayload,
        upload_preset: &str,
        mut options: Options,
    ) -> Result<ApiRequest> {
        if upload_preset.is_empty() {
            return Err(Error::validation("upload_preset", "must not be empty"));
        }
        options.insert("upload_preset".into(), upload_preset.into());
        let prepared = self.prepare("upload", options)?;
        let mut request = ApiRequest::post(prepared.url, prepared.params);
        request.file = Some(file);
        request.timeout = prepared.timeout;
        Ok(request)
    }

    /// Signed `explicit` request for an existing asset
    pub fn prepare_explicit(&self, public_id: &str, mut options: Options) -> Result<ApiRequest> {
        if public_id.is_empty() {
            return Err(Error::validation("public_id", "must not be empty"));
        }
        options.insert("public_id".into(), public_id.into());
        if !options.contains_key("type") {
            options.insert("type".into(), "upload".into());
        }
        let prepared = self.prepare("explicit", options)?;
        let fields = signed_fields(&prepared.params, &prepared.config, Utc::now().timestamp())?;
        let mut request = ApiRequest::post(prepared.url, fields);
        request.timeout = prepared.timeout;
        Ok(request)
    }

    async fn execute(&self, request: ApiRequest) -> Result<UploadResult> {
        let response = self.transport.send(request).await?;
        parse_response(&response)
    }

    pub async fn upload(
        &self,
        source: impl Into<UploadSource>,
        options: Options,
    ) -> Result<UploadResult> {
        let file = source.into().into_payload().await?;
        let request = self.prepare_upload(file, options)?;
        self.execute(request).await
    }

    pub async fn unsigned_upload(
        &self,
        source: impl Into<UploadSource>,
        upload_preset: &str,
        options: Options,
    ) -> Result<UploadResult> {
        let file = source.into().into_payload().await?;
        let request = self.prepare_unsigned_upload(file, upload_preset, options)?;
        self.execute(request).await
    }

    pub async fn explicit(&self, public_id: &str, options: Options) -> Result<UploadResult> {
        let request = self.prepare_explicit(public_id, options)?;
        self.execute(request).await
    }

    /// Start a large upload from a byte stream
    ///
    /// `chunk_size` in options (or the configured chunk size) sets the
    /// part size. The returned plan is either a single request or a
    /// session to drive with `submit_next_part`.
    pub async fn begin_large<R>(
        &self,
        source: R,
        total_size: Option<u64>,
        filename: &str,
        mut options: Options,
    ) -> Result<UploadPlan<R>>
    where
        R: AsyncRead + Unpin + Send,
    {
        let part_size = match take(&mut options, "chunk_size") {
            Some(value) => value.as_u64().ok_or_else(|| {
                Error::validation("chunk_size", "expected a byte count")
            })?,
            None => self.config.chunk_size,
        };
        let prepared = self.prepare("upload", options)?;
        // fail on missing credentials before reading the source
        prepared.config.require_api_key()?;
        prepared.config.require_api_secret()?;

        let template = PartTemplate {
            url: prepared.url,
            params: prepared.params,
            headers: Vec::new(),
            filename: filename.to_string(),
            timeout: prepared.timeout,
        };
        ChunkedUpload::begin(
            source,
            total_size,
            part_size,
            template,
            Arc::new(prepared.config),
            self.transport.clone(),
        )
        .await
    }

    /// Upload a stream in parts, one at a time, until the service
    /// returns the completed resource
    pub async fn upload_large<R>(
        &self,
        source: R,
        total_size: Option<u64>,
        filename: &str,
        options: Options,
    ) -> Result<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        match self.begin_large(source, total_size, filename, options).await? {
            UploadPlan::Single(request) => self.execute(request).await,
            UploadPlan::Chunked(mut upload) => loop {
                if let PartOutcome::Complete(result) = upload.submit_next_part().await? {
                    return Ok(result);
                }
            },
        }
    }

    /// Large upload from any source
    ///
    /// Remote URLs are fetched by the service, so they go through a plain
    /// upload; local files and in-memory content are sent in parts.
    pub async fn upload_large_source(
        &self,
        source: impl Into<UploadSource>,
        mut options: Options,
    ) -> Result<UploadResult> {
        match source.into() {
            remote @ UploadSource::Remote(_) => {
                options.remove("chunk_size");
                self.upload(remote, options).await
            }
            UploadSource::Path(path) => self.upload_large_file(path, options).await,
            UploadSource::Bytes { filename, data } => {
                let total_size = data.len() as u64;
                let reader = std::io::Cursor::new(data);
                self.upload_large(reader, Some(total_size), &filename, options)
                    .await
            }
        }
    }

    /// Large upload of a local file, its size taken from metadata
    pub async fn upload_large_file(
        &self,
        path: impl AsRef<Path>,
        options: Options,
    ) -> Result<UploadResult> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let total_size = file.metadata().await?.len();
        self.upload_large(file, Some(total_size), &file_name(path), options)
            .await
    }
}
