//! Upload API: signed requests, the transport boundary and chunked uploads
//!
//! ```text
//! options -> build_upload_params -> signed_fields -> ApiRequest
//!         -> Transport::send -> ApiResponse -> parse_response -> UploadResult
//! ```
//!
//! Large sources go through [`ChunkedUpload`], which repeats the signed
//! request once per part.

pub mod chunked;
pub mod params;
pub mod request;
pub mod transport;
pub mod uploader;

pub use chunked::{
    ChunkedUpload, PartAck, PartOutcome, PartRecord, PartTemplate, SessionState, UploadPlan,
    UploadSession,
};
pub use params::build_upload_params;
pub use request::{
    api_url, parse_response, signed_fields, ApiRequest, ApiResponse, FilePayload, UploadResult,
};
pub use transport::{ReqwestTransport, Transport};
pub use uploader::{UploadSource, Uploader};
