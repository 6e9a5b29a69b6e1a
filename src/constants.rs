// Constants module - centralized default values
//
// Hosts, limits and defaults shared by the URL assembler, the signer
// and the upload controller live here instead of as magic numbers.

// =============================================================================
// Delivery defaults
// =============================================================================

/// Shared delivery host used when no private CDN or custom domain is set
pub const SHARED_CDN: &str = "res.cloudinary.com";

/// Legacy shared secure distribution, treated as "no distribution configured"
pub const OLD_AKAMAI_SHARED_CDN: &str = "cloudinary-a.akamaihd.net";

/// Number of CDN subdomains public ids are sharded across
pub const CDN_SUBDOMAIN_COUNT: u32 = 5;

/// Default resource type for delivery URLs
pub const DEFAULT_RESOURCE_TYPE: &str = "image";

/// Default delivery type for delivery URLs
pub const DEFAULT_DELIVERY_TYPE: &str = "upload";

/// Default format of video thumbnails
pub const DEFAULT_VIDEO_THUMBNAIL_FORMAT: &str = "jpg";

/// Number of base64 characters kept from a URL signature digest
pub const URL_SIGNATURE_LENGTH: usize = 8;

// =============================================================================
// API defaults
// =============================================================================

/// Default API host prefix for upload endpoints
pub const DEFAULT_UPLOAD_PREFIX: &str = "https://api.cloudinary.com";

/// API version segment of upload endpoints
pub const API_VERSION: &str = "v1_1";

/// Environment variable holding the `cloudinary://` configuration URL
pub const CLOUDINARY_URL_ENV: &str = "CLOUDINARY_URL";

/// Scheme of configuration URLs
pub const CONFIG_URL_SCHEME: &str = "cloudinary";

// =============================================================================
// Chunked upload defaults
// =============================================================================

/// Minimum size of every part except the final one (5 MiB)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default part size for chunked uploads (20 MB)
pub const DEFAULT_CHUNK_SIZE: u64 = 20_000_000;

/// Header carrying the byte range of a part
pub const CONTENT_RANGE_HEADER: &str = "Content-Range";

/// Header carrying the session-constant upload identifier
pub const UNIQUE_UPLOAD_ID_HEADER: &str = "X-Unique-Upload-Id";

/// Message reported when a non-final part is under the minimum size
pub const PART_SIZE_ERROR_MESSAGE: &str = "All parts except EOF-chunk must be larger than 5mb";

// =============================================================================
// Transport defaults
// =============================================================================

/// Status reported when a client-specified timeout expires
pub const TIMEOUT_STATUS: u16 = 499;

/// Message reported when a client-specified timeout expires
pub const TIMEOUT_MESSAGE: &str = "Request Timeout";
