//! Delivery URL assembler
//!
//! ```text
//! <scheme>://<host>[/<cloud>]/<resource_type>/<type>[/<signature>][/<transformation>][/v<version>]/<public_id>[.<format>]
//! ```
//!
//! Pure: nothing here performs I/O. Options not consumed by the config
//! overrides, the URL keys or the transformation compiler are handed back
//! in [`DeliveryUrl::leftover`].

use flate2::Crc;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::constants::{
    CDN_SUBDOMAIN_COUNT, DEFAULT_VIDEO_THUMBNAIL_FORMAT, OLD_AKAMAI_SHARED_CDN, SHARED_CDN,
};
use crate::error::{Error, Result};
use crate::options::{is_present, take_bool, take_string, Options};
use crate::signature::url_signature;
use crate::transformation::{generate_transformation_string, HtmlSize};

/// Kind of asset being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceType {
    #[default]
    Image,
    Video,
    Raw,
    Auto,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Raw => "raw",
            ResourceType::Auto => "auto",
        }
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(ResourceType::Image),
            "video" => Ok(ResourceType::Video),
            "raw" => Ok(ResourceType::Raw),
            "auto" => Ok(ResourceType::Auto),
            _ => Err(Error::validation(
                "resource_type",
                format!("unknown resource type: {}", s),
            )),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access mode of a delivered asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryType {
    #[default]
    Upload,
    Private,
    Authenticated,
    Fetch,
    Facebook,
    Twitter,
    TwitterName,
    Gravatar,
    Youtube,
    Hulu,
    Vimeo,
    Animoto,
    Worldstarhiphop,
    Dailymotion,
    Multi,
    Text,
    Asset,
    List,
    Sprite,
}

impl DeliveryType {
    const ALL: &'static [DeliveryType] = &[
        DeliveryType::Upload,
        DeliveryType::Private,
        DeliveryType::Authenticated,
        DeliveryType::Fetch,
        DeliveryType::Facebook,
        DeliveryType::Twitter,
        DeliveryType::TwitterName,
        DeliveryType::Gravatar,
        DeliveryType::Youtube,
        DeliveryType::Hulu,
        DeliveryType::Vimeo,
        DeliveryType::Animoto,
        DeliveryType::Worldstarhiphop,
        DeliveryType::Dailymotion,
        DeliveryType::Multi,
        DeliveryType::Text,
        DeliveryType::Asset,
        DeliveryType::List,
        DeliveryType::Sprite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Upload => "upload",
            DeliveryType::Private => "private",
            DeliveryType::Authenticated => "authenticated",
            DeliveryType::Fetch => "fetch",
            DeliveryType::Facebook => "facebook",
            DeliveryType::Twitter => "twitter",
            DeliveryType::TwitterName => "twitter_name",
            DeliveryType::Gravatar => "gravatar",
            DeliveryType::Youtube => "youtube",
            DeliveryType::Hulu => "hulu",
            DeliveryType::Vimeo => "vimeo",
            DeliveryType::Animoto => "animoto",
            DeliveryType::Worldstarhiphop => "worldstarhiphop",
            DeliveryType::Dailymotion => "dailymotion",
            DeliveryType::Multi => "multi",
            DeliveryType::Text => "text",
            DeliveryType::Asset => "asset",
            DeliveryType::List => "list",
            DeliveryType::Sprite => "sprite",
        }
    }
}

impl FromStr for DeliveryType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DeliveryType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::validation("type", format!("unknown delivery type: {}", s)))
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL-shaping options, extracted before transformation compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    pub resource_type: ResourceType,
    pub delivery_type: DeliveryType,
    pub version: Option<String>,
    pub format: Option<String>,
    /// Add `v1` to public ids with folders when no version is given
    pub force_version: bool,
    pub sign_url: bool,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            resource_type: ResourceType::default(),
            delivery_type: DeliveryType::default(),
            version: None,
            format: None,
            force_version: true,
            sign_url: false,
        }
    }
}

impl UrlOptions {
    /// Remove URL keys from `options`
    ///
    /// Unknown resource or delivery types fail here, before anything else
    /// is computed.
    pub fn extract(options: &mut Options) -> Result<Self> {
        let mut url_options = UrlOptions::default();
        if let Some(resource_type) = take_string(options, "resource_type") {
            url_options.resource_type = resource_type.parse()?;
        }
        if let Some(delivery_type) = take_string(options, "type") {
            url_options.delivery_type = delivery_type.parse()?;
        }
        url_options.version = take_string(options, "version");
        url_options.format = take_string(options, "format");
        if let Some(force) = take_bool(options, "force_version") {
            url_options.force_version = force;
        }
        url_options.sign_url = take_bool(options, "sign_url").unwrap_or(false);
        Ok(url_options)
    }
}

/// A delivery URL and what the assembler did not use
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryUrl {
    pub url: String,
    pub html_size: HtmlSize,
    pub leftover: Options,
}

impl fmt::Display for DeliveryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Build the delivery URL for `public_id`
///
/// ```
/// use cloudinary::config::Config;
/// use cloudinary::options::from_value;
/// use cloudinary::url::url;
/// use serde_json::json;
///
/// let config = Config::new("test123", "1234", "b");
/// let options = from_value(json!({"resource_type": "video", "start_offset": "auto"}));
/// let delivery = url("video_id", options, &config).unwrap();
/// assert_eq!(
///     delivery.url,
///     "http://res.cloudinary.com/test123/video/upload/so_auto/video_id"
/// );
/// assert!(delivery.leftover.is_empty());
/// ```
pub fn url(public_id: &str, mut options: Options, config: &Config) -> Result<DeliveryUrl> {
    let config = config.with_overrides(&mut options)?;
    let mut url_options = UrlOptions::extract(&mut options)?;

    if url_options.delivery_type == DeliveryType::Fetch {
        // an explicit fetch_format wins over format
        if let Some(format) = url_options.format.take() {
            if !options.get("fetch_format").map(is_present).unwrap_or(false) {
                options.insert("fetch_format".into(), Value::String(format));
            }
        }
    }

    let (transformation, leftover) = generate_transformation_string(options)?;

    if is_absolute(public_id)
        && matches!(
            url_options.delivery_type,
            DeliveryType::Upload | DeliveryType::Asset
        )
    {
        return Ok(DeliveryUrl {
            url: public_id.to_string(),
            html_size: transformation.html_size,
            leftover,
        });
    }

    let cloud_name = config.require_cloud_name()?;
    let source = finalize_source(public_id, url_options.format.as_deref());

    let version = url_options.version.clone().or_else(|| {
        let needs_version = url_options.force_version
            && public_id.contains('/')
            && !is_absolute(public_id)
            && !starts_with_version(public_id);
        needs_version.then(|| "1".to_string())
    });

    let signature = if url_options.sign_url {
        let to_sign = join_non_empty(&[&transformation.path, &source]);
        Some(url_signature(
            &to_sign,
            config.api_secret.as_deref(),
            config.signature_algorithm,
        )?)
    } else {
        None
    };

    let prefix = url_prefix(public_id, cloud_name, &config);
    let version = version.map(|v| format!("v{}", v.trim_start_matches('v')));
    let url = join_non_empty(&[
        &prefix,
        url_options.resource_type.as_str(),
        url_options.delivery_type.as_str(),
        signature.as_deref().unwrap_or(""),
        &transformation.path,
        version.as_deref().unwrap_or(""),
        &source,
    ]);

    tracing::debug!(
        resource_type = %url_options.resource_type,
        delivery_type = %url_options.delivery_type,
        signed = url_options.sign_url,
        "Assembled delivery URL"
    );

    Ok(DeliveryUrl {
        url,
        html_size: transformation.html_size,
        leftover,
    })
}

/// Thumbnail image of a video, `jpg` unless another format is requested
pub fn video_thumbnail_url(
    public_id: &str,
    mut options: Options,
    config: &Config,
) -> Result<DeliveryUrl> {
    options.insert("resource_type".into(), Value::String("video".into()));
    if !options.get("format").map(is_present).unwrap_or(false) {
        options.insert(
            "format".into(),
            Value::String(DEFAULT_VIDEO_THUMBNAIL_FORMAT.into()),
        );
    }
    url(public_id, options, config)
}

/// Scheme, host and, on the shared domain, the cloud name
fn url_prefix(public_id: &str, cloud_name: &str, config: &Config) -> String {
    if cloud_name.starts_with('/') {
        return format!("/res{}", cloud_name);
    }

    let shared_domain = !config.private_cdn;
    let prefix = if config.secure {
        let distribution = config
            .secure_distribution
            .as_deref()
            .filter(|d| !d.is_empty() && *d != OLD_AKAMAI_SHARED_CDN);
        match distribution {
            Some(d) => format!("https://{}", d),
            None if config.private_cdn => format!("https://{}-{}", cloud_name, SHARED_CDN),
            None => format!("https://{}", SHARED_CDN),
        }
    } else if let Some(cname) = config.cname.as_deref().filter(|c| !c.is_empty()) {
        let subdomain = if config.cdn_subdomain {
            format!("a{}.", cdn_shard(public_id))
        } else {
            String::new()
        };
        format!("http://{}{}", subdomain, cname)
    } else {
        let host_prefix = if config.private_cdn {
            format!("{}-", cloud_name)
        } else {
            String::new()
        };
        format!("http://{}{}", host_prefix, SHARED_CDN)
    };

    if shared_domain {
        format!("{}/{}", prefix, cloud_name)
    } else {
        prefix
    }
}

/// 1-based CDN subdomain index derived from the public id
fn cdn_shard(public_id: &str) -> u32 {
    let mut crc = Crc::new();
    crc.update(public_id.as_bytes());
    crc.sum() % CDN_SUBDOMAIN_COUNT + 1
}

/// Escaped source with its format; also what URL signatures cover
fn finalize_source(public_id: &str, format: Option<&str>) -> String {
    let mut source = if is_absolute(public_id) {
        smart_escape(public_id)
    } else {
        escape_public_id(public_id)
    };
    if let Some(format) = format {
        source.push('.');
        source.push_str(format);
    }
    source
}

/// Characters `urlencoding` escapes but public ids keep literal
const UNESCAPED_MARKS: &[(&str, &str)] = &[
    ("%3A", ":"),
    ("%2F", "/"),
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode reserved characters, keeping `/`, `:` and `!'()*`
///
/// Already-encoded input is decoded first so it is not encoded twice.
fn escape_public_id(public_id: &str) -> String {
    let decoded = urlencoding::decode(public_id)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| public_id.to_string());
    UNESCAPED_MARKS
        .iter()
        .fold(urlencoding::encode(&decoded).into_owned(), |escaped, (code, mark)| {
            escaped.replace(code, mark)
        })
}

/// Escape everything but URL-safe characters, for remote (fetch) sources
fn smart_escape(source: &str) -> String {
    let mut escaped = String::with_capacity(source.len());
    for ch in source.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-' | '/' | ':') {
            escaped.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    escaped
}

fn is_absolute(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn starts_with_version(public_id: &str) -> bool {
    public_id
        .strip_prefix('v')
        .map(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
