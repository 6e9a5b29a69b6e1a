// Chunked upload controller
//
// A large source is sent as a sequence of parts, each a separate signed
// request to the upload endpoint:
//
//   Content-Range: bytes <start>-<end>/<total or -1>
//   X-Unique-Upload-Id: <constant for the session>
//
// Parts are strictly sequential. The caller (or `Uploader::upload_large`)
// drives the session by calling `submit_next_part` until it returns
// `PartOutcome::Complete`.

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::Instrument;
use uuid::Uuid;

use super::request::{parse_response, signed_fields, ApiRequest, FilePayload, UploadResult};
use super::transport::Transport;
use crate::config::Config;
use crate::constants::{
    CONTENT_RANGE_HEADER, MIN_PART_SIZE, PART_SIZE_ERROR_MESSAGE, UNIQUE_UPLOAD_ID_HEADER,
};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::signature::RequestParams;

/// Read buffer size when filling a part
const READ_CHUNK: usize = 64 * 1024;

/// Lifecycle of an upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Streaming,
    PartSent,
    Finalizing,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

/// A part the service acknowledged
///
/// The service answers a part with a 2xx only once it has stored the whole
/// part; acks carry no accepted-bytes count, so `size` is the bytes sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRecord {
    pub offset: u64,
    pub size: u64,
    /// Acknowledgment body; empty for the final part, whose body is the
    /// upload result
    pub ack: Options,
}

/// Bookkeeping for one chunked upload
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_id: String,
    pub total_size: Option<u64>,
    pub part_size: u64,
    pub next_offset: u64,
    pub parts: Vec<PartRecord>,
    pub state: SessionState,
}

impl UploadSession {
    /// New session; the part size must be at least 5 MiB
    pub fn new(total_size: Option<u64>, part_size: u64) -> Result<Self> {
        if part_size < MIN_PART_SIZE {
            return Err(Error::PartSize(PART_SIZE_ERROR_MESSAGE.to_string()));
        }
        Ok(Self {
            upload_id: Uuid::new_v4().simple().to_string(),
            total_size,
            part_size,
            next_offset: 0,
            parts: Vec::new(),
            state: SessionState::Init,
        })
    }

    /// `bytes start-end/total`, with `-1` for a total not yet known
    pub fn content_range(&self, size: u64, is_final: bool) -> String {
        let start = self.next_offset;
        let end = start + size.saturating_sub(1);
        let total = match (is_final, self.total_size) {
            (true, _) => (start + size).to_string(),
            (false, Some(total)) => total.to_string(),
            (false, None) => "-1".to_string(),
        };
        format!("bytes {}-{}/{}", start, end, total)
    }
}

/// Acknowledgment of an intermediate part
#[derive(Debug, Clone, PartialEq)]
pub struct PartAck {
    pub offset: u64,
    pub size: u64,
    pub body: Options,
}

/// Result of one `submit_next_part` call
#[derive(Debug, Clone, PartialEq)]
pub enum PartOutcome {
    Pending(PartAck),
    Complete(UploadResult),
}

/// How a large upload will proceed
#[derive(Debug)]
pub enum UploadPlan<R> {
    /// Source smaller than one part: a plain upload request
    Single(ApiRequest),
    Chunked(ChunkedUpload<R>),
}

/// Request template shared by every part of a session
#[derive(Debug, Clone)]
pub struct PartTemplate {
    pub url: String,
    pub params: RequestParams,
    pub headers: Vec<(String, String)>,
    pub filename: String,
    pub timeout: Option<Duration>,
}

/// Drives one chunked upload over a byte stream
pub struct ChunkedUpload<R> {
    session: UploadSession,
    source: R,
    buffer: BytesMut,
    eof: bool,
    template: PartTemplate,
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    span: tracing::Span,
}

impl<R> std::fmt::Debug for ChunkedUpload<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedUpload")
            .field("session", &self.session)
            .field("buffered", &self.buffer.len())
            .field("eof", &self.eof)
            .finish()
    }
}

impl<R> ChunkedUpload<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Start a large upload
    ///
    /// Validates the part size first. A source known to be smaller than
    /// one part is read whole and returned as a single upload request.
    pub async fn begin(
        mut source: R,
        total_size: Option<u64>,
        part_size: u64,
        template: PartTemplate,
        config: Arc<Config>,
        transport: Arc<dyn Transport>,
    ) -> Result<UploadPlan<R>> {
        let session = UploadSession::new(total_size, part_size)?;

        match total_size {
            Some(0) => return Err(Error::validation("file", "source is empty")),
            Some(total) if total < part_size => {
                let mut data = Vec::with_capacity(total as usize);
                source.read_to_end(&mut data).await?;
                if data.len() as u64 != total {
                    return Err(Error::validation(
                        "file",
                        format!("declared size {} but read {} bytes", total, data.len()),
                    ));
                }
                let fields = signed_fields(&template.params, &config, Utc::now().timestamp())?;
                let request = ApiRequest {
                    method: reqwest::Method::POST,
                    url: template.url,
                    headers: template.headers,
                    fields,
                    file: Some(FilePayload::Bytes {
                        filename: template.filename,
                        data: Bytes::from(data),
                    }),
                    timeout: template.timeout,
                };
                tracing::debug!(total_size = total, "Source fits in one part, uploading whole");
                return Ok(UploadPlan::Single(request));
            }
            _ => {}
        }

        let span = tracing::info_span!(
            "chunked_upload",
            upload_id = %session.upload_id,
            part_size = session.part_size,
            total_size = ?session.total_size
        );
        Ok(UploadPlan::Chunked(Self {
            session,
            source,
            buffer: BytesMut::new(),
            eof: false,
            template,
            config,
            transport,
            span,
        }))
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// Read, sign and send the next part
    ///
    /// Any failure moves the session to `Failed`; a terminal session
    /// rejects further calls.
    pub async fn submit_next_part(&mut self) -> Result<PartOutcome> {
        if self.session.state.is_terminal() {
            return Err(Error::SessionClosed(format!(
                "upload {} is {:?}",
                self.session.upload_id, self.session.state
            )));
        }

        let span = self.span.clone();
        let result = self.send_next_part().instrument(span).await;
        if let Err(e) = &result {
            self.session.state = SessionState::Failed;
            self.span.in_scope(|| {
                tracing::error!(
                    error = %e,
                    offset = self.session.next_offset,
                    parts_sent = self.session.parts.len(),
                    "Chunked upload failed"
                );
            });
        }
        result
    }

    async fn send_next_part(&mut self) -> Result<PartOutcome> {
        self.session.state = SessionState::Streaming;
        let (chunk, is_final) = self.read_part().await?;
        let offset = self.session.next_offset;
        let size = chunk.len() as u64;

        if size == 0 {
            return Err(Error::validation("file", "source is empty"));
        }
        if !is_final && size < MIN_PART_SIZE {
            return Err(Error::PartSize(PART_SIZE_ERROR_MESSAGE.to_string()));
        }
        if let Some(total) = self.session.total_size {
            let end = offset + size;
            if end > total || (is_final && end != total) {
                return Err(Error::validation(
                    "file",
                    format!("declared size {} does not match the source", total),
                ));
            }
        }

        let range = self.session.content_range(size, is_final);
        let request = self.part_request(chunk, range.clone())?;
        self.session.state = SessionState::PartSent;
        tracing::debug!(range = %range, is_final, "Sending part");

        let response = self.transport.send(request).await?;

        if is_final {
            self.session.state = SessionState::Finalizing;
            let result: UploadResult = parse_response(&response)?;
            self.record(offset, size, Options::new());
            self.session.state = SessionState::Done;
            tracing::info!(
                public_id = %result.public_id,
                bytes = ?result.bytes,
                parts = self.session.parts.len(),
                "Chunked upload complete"
            );
            Ok(PartOutcome::Complete(result))
        } else {
            let body: Options = parse_response(&response)?;
            self.record(offset, size, body.clone());
            Ok(PartOutcome::Pending(PartAck { offset, size, body }))
        }
    }

    fn record(&mut self, offset: u64, size: u64, ack: Options) {
        self.session.parts.push(PartRecord { offset, size, ack });
        self.session.next_offset = offset + size;
    }

    /// Signed request for one part; every part gets its own timestamp
    fn part_request(&self, chunk: Bytes, range: String) -> Result<ApiRequest> {
        let fields = signed_fields(&self.template.params, &self.config, Utc::now().timestamp())?;
        let mut headers = self.template.headers.clone();
        headers.push((CONTENT_RANGE_HEADER.to_string(), range));
        headers.push((
            UNIQUE_UPLOAD_ID_HEADER.to_string(),
            self.session.upload_id.clone(),
        ));
        Ok(ApiRequest {
            method: reqwest::Method::POST,
            url: self.template.url.clone(),
            headers,
            fields,
            file: Some(FilePayload::Bytes {
                filename: self.template.filename.clone(),
                data: chunk,
            }),
            timeout: self.template.timeout,
        })
    }

    /// Next part and whether it is the last one
    ///
    /// Reads one byte past the part size so the final part is known
    /// before it is sent, even when the source length is unknown.
    async fn read_part(&mut self) -> Result<(Bytes, bool)> {
        let part_size = self.session.part_size as usize;
        self.fill(part_size + 1).await?;
        if self.buffer.len() > part_size {
            Ok((self.buffer.split_to(part_size).freeze(), false))
        } else {
            Ok((self.buffer.split().freeze(), true))
        }
    }

    async fn fill(&mut self, want: usize) -> Result<()> {
        let mut chunk = vec![0u8; READ_CHUNK];
        while !self.eof && self.buffer.len() < want {
            let max = (want - self.buffer.len()).min(READ_CHUNK);
            let n = self.source.read(&mut chunk[..max]).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buffer.extend_from_slice(&chunk[..n]);
            }
        }
        Ok(())
    }
}
