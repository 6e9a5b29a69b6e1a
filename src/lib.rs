// Cloudinary client library
//
// Delivery URLs, signed API requests and chunked uploads. All compilation,
// signing and URL assembly is pure; only the upload transport performs I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod options;
pub mod signature;
pub mod transformation;
pub mod upload;
pub mod url;

pub use config::Config;
pub use error::{Error, Result};
pub use options::Options;
pub use signature::{api_sign_request, SignatureAlgorithm};
pub use transformation::generate_transformation_string;
pub use upload::{Transport, UploadResult, Uploader};
pub use url::{url, video_thumbnail_url, DeliveryType, DeliveryUrl, ResourceType};
