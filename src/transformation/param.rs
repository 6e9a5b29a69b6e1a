//! Transformation parameter table and typed values
//!
//! Every option key the compiler understands is a `ParamKey` variant with
//! exactly one short code. Values with structure of their own (codecs,
//! offsets, colors, coordinates, layers) are parsed into typed values and
//! rendered back through `Display`, so equivalent inputs always encode to
//! the same token.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::options::{is_present, joined_string, scalar_string};

/// Recognized transformation option keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Angle,
    AspectRatio,
    AudioCodec,
    AudioFrequency,
    Background,
    BitRate,
    Border,
    Color,
    ColorSpace,
    Crop,
    DefaultImage,
    Delay,
    Density,
    Dpr,
    Duration,
    Effect,
    EndOffset,
    FetchFormat,
    Flags,
    Fps,
    Gravity,
    Height,
    KeyframeInterval,
    NamedTransformation,
    Opacity,
    Overlay,
    Page,
    Prefix,
    Quality,
    Radius,
    StartOffset,
    StreamingProfile,
    Underlay,
    VideoCodec,
    VideoSampling,
    Width,
    X,
    Y,
    Zoom,
}

impl ParamKey {
    /// Keys consumed directly from option maps
    ///
    /// `NamedTransformation` is absent: the `transformation` key is
    /// handled by the canonicalizer because it may also hold nested
    /// segments.
    pub const EXTRACTED: &'static [ParamKey] = &[
        ParamKey::Angle,
        ParamKey::AspectRatio,
        ParamKey::AudioCodec,
        ParamKey::AudioFrequency,
        ParamKey::Background,
        ParamKey::BitRate,
        ParamKey::Border,
        ParamKey::Color,
        ParamKey::ColorSpace,
        ParamKey::Crop,
        ParamKey::DefaultImage,
        ParamKey::Delay,
        ParamKey::Density,
        ParamKey::Dpr,
        ParamKey::Duration,
        ParamKey::Effect,
        ParamKey::EndOffset,
        ParamKey::FetchFormat,
        ParamKey::Flags,
        ParamKey::Fps,
        ParamKey::Gravity,
        ParamKey::Height,
        ParamKey::KeyframeInterval,
        ParamKey::Opacity,
        ParamKey::Overlay,
        ParamKey::Page,
        ParamKey::Prefix,
        ParamKey::Quality,
        ParamKey::Radius,
        ParamKey::StartOffset,
        ParamKey::StreamingProfile,
        ParamKey::Underlay,
        ParamKey::VideoCodec,
        ParamKey::VideoSampling,
        ParamKey::Width,
        ParamKey::X,
        ParamKey::Y,
        ParamKey::Zoom,
    ];

    /// Option name as supplied by callers
    pub fn key(&self) -> &'static str {
        match self {
            ParamKey::Angle => "angle",
            ParamKey::AspectRatio => "aspect_ratio",
            ParamKey::AudioCodec => "audio_codec",
            ParamKey::AudioFrequency => "audio_frequency",
            ParamKey::Background => "background",
            ParamKey::BitRate => "bit_rate",
            ParamKey::Border => "border",
            ParamKey::Color => "color",
            ParamKey::ColorSpace => "color_space",
            ParamKey::Crop => "crop",
            ParamKey::DefaultImage => "default_image",
            ParamKey::Delay => "delay",
            ParamKey::Density => "density",
            ParamKey::Dpr => "dpr",
            ParamKey::Duration => "duration",
            ParamKey::Effect => "effect",
            ParamKey::EndOffset => "end_offset",
            ParamKey::FetchFormat => "fetch_format",
            ParamKey::Flags => "flags",
            ParamKey::Fps => "fps",
            ParamKey::Gravity => "gravity",
            ParamKey::Height => "height",
            ParamKey::KeyframeInterval => "keyframe_interval",
            ParamKey::NamedTransformation => "transformation",
            ParamKey::Opacity => "opacity",
            ParamKey::Overlay => "overlay",
            ParamKey::Page => "page",
            ParamKey::Prefix => "prefix",
            ParamKey::Quality => "quality",
            ParamKey::Radius => "radius",
            ParamKey::StartOffset => "start_offset",
            ParamKey::StreamingProfile => "streaming_profile",
            ParamKey::Underlay => "underlay",
            ParamKey::VideoCodec => "video_codec",
            ParamKey::VideoSampling => "video_sampling",
            ParamKey::Width => "width",
            ParamKey::X => "x",
            ParamKey::Y => "y",
            ParamKey::Zoom => "zoom",
        }
    }

    /// Short code used in the URL mini-language
    pub fn code(&self) -> &'static str {
        match self {
            ParamKey::Angle => "a",
            ParamKey::AspectRatio => "ar",
            ParamKey::AudioCodec => "ac",
            ParamKey::AudioFrequency => "af",
            ParamKey::Background => "b",
            ParamKey::BitRate => "br",
            ParamKey::Border => "bo",
            ParamKey::Color => "co",
            ParamKey::ColorSpace => "cs",
            ParamKey::Crop => "c",
            ParamKey::DefaultImage => "d",
            ParamKey::Delay => "dl",
            ParamKey::Density => "dn",
            ParamKey::Dpr => "dpr",
            ParamKey::Duration => "du",
            ParamKey::Effect => "e",
            ParamKey::EndOffset => "eo",
            ParamKey::FetchFormat => "f",
            ParamKey::Flags => "fl",
            ParamKey::Fps => "fps",
            ParamKey::Gravity => "g",
            ParamKey::Height => "h",
            ParamKey::KeyframeInterval => "ki",
            ParamKey::NamedTransformation => "t",
            ParamKey::Opacity => "o",
            ParamKey::Overlay => "l",
            ParamKey::Page => "pg",
            ParamKey::Prefix => "p",
            ParamKey::Quality => "q",
            ParamKey::Radius => "r",
            ParamKey::StartOffset => "so",
            ParamKey::StreamingProfile => "sp",
            ParamKey::Underlay => "u",
            ParamKey::VideoCodec => "vc",
            ParamKey::VideoSampling => "vs",
            ParamKey::Width => "w",
            ParamKey::X => "x",
            ParamKey::Y => "y",
            ParamKey::Zoom => "z",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ParamKey::EXTRACTED
            .iter()
            .copied()
            .chain(std::iter::once(ParamKey::NamedTransformation))
            .find(|p| p.key() == key)
    }

    /// Encode a caller-supplied value into its wire form
    ///
    /// Returns `Ok(None)` for blank values.
    pub fn encode(&self, value: &Value) -> Result<Option<String>> {
        if !is_present(value) {
            return Ok(None);
        }
        let encoded = match self {
            ParamKey::VideoCodec | ParamKey::AudioCodec => {
                Some(Codec::from_value(self.key(), value)?.to_string())
            }
            ParamKey::BitRate | ParamKey::AudioFrequency | ParamKey::VideoSampling => {
                Some(scalar(self.key(), value)?)
            }
            ParamKey::StartOffset | ParamKey::EndOffset | ParamKey::Duration => {
                Some(Offset::from_value(self.key(), value)?.to_string())
            }
            ParamKey::Background | ParamKey::Color => {
                Some(Color::from(scalar(self.key(), value)?).to_string())
            }
            ParamKey::Border => Some(encode_border(value)?),
            ParamKey::Overlay | ParamKey::Underlay => {
                Some(Layer::from_value(self.key(), value)?.to_string())
            }
            ParamKey::Dpr => Some(encode_dpr(self.key(), value)?),
            ParamKey::Angle | ParamKey::Flags | ParamKey::NamedTransformation => {
                joined(self.key(), value, ".")?
            }
            ParamKey::Effect | ParamKey::Radius => joined(self.key(), value, ":")?,
            ParamKey::Fps => joined(self.key(), value, "-")?,
            ParamKey::AspectRatio
            | ParamKey::ColorSpace
            | ParamKey::Crop
            | ParamKey::DefaultImage
            | ParamKey::Delay
            | ParamKey::Density
            | ParamKey::FetchFormat
            | ParamKey::Gravity
            | ParamKey::Height
            | ParamKey::KeyframeInterval
            | ParamKey::Opacity
            | ParamKey::Page
            | ParamKey::Prefix
            | ParamKey::Quality
            | ParamKey::StreamingProfile
            | ParamKey::Width
            | ParamKey::X
            | ParamKey::Y
            | ParamKey::Zoom => Some(scalar(self.key(), value)?),
        };
        Ok(encoded)
    }
}

fn scalar(key: &str, value: &Value) -> Result<String> {
    scalar_string(value).ok_or_else(|| Error::validation(key, "expected a string or a number"))
}

fn joined(key: &str, value: &Value, sep: &str) -> Result<Option<String>> {
    match value {
        Value::Array(items) if items.iter().any(|v| v.is_array() || v.is_object()) => Err(
            Error::validation(key, "expected a scalar or a sequence of scalars"),
        ),
        Value::Object(_) => Err(Error::validation(
            key,
            "expected a scalar or a sequence of scalars",
        )),
        other => Ok(joined_string(other, sep)),
    }
}

fn encode_dpr(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(format!("{}.0", n)),
        other => scalar(key, other),
    }
}

fn encode_border(value: &Value) -> Result<String> {
    match value {
        Value::Object(map) => {
            let width = map
                .get("width")
                .and_then(scalar_string)
                .unwrap_or_else(|| "2".to_string());
            let color = map
                .get("color")
                .and_then(scalar_string)
                .unwrap_or_else(|| "black".to_string());
            Ok(format!("{}px_solid_{}", width, Color::from(color)))
        }
        other => scalar("border", other),
    }
}

/// Number pattern shared by offsets and offset ranges
fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]*\.[0-9]+|[0-9]+)([%pP])?$")
            .expect("Invalid offset regex - this is a compile-time bug")
    })
}

/// Codec triple: `codec[:profile[:level]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub codec: String,
    pub profile: Option<String>,
    pub level: Option<String>,
}

impl Codec {
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                let part = |name: &str| {
                    map.get(name)
                        .filter(|v| is_present(v))
                        .and_then(scalar_string)
                };
                let codec = part("codec")
                    .ok_or_else(|| Error::validation(key, "codec mapping requires 'codec'"))?;
                Ok(Codec {
                    codec,
                    profile: part("profile"),
                    level: part("level"),
                })
            }
            other => scalar(key, other)?.parse(),
        }
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':').map(str::trim);
        let codec = parts
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::validation("codec", "empty codec"))?
            .to_string();
        let non_empty = |p: Option<&str>| p.filter(|v| !v.is_empty()).map(str::to_string);
        Ok(Codec {
            codec,
            profile: non_empty(parts.next()),
            level: non_empty(parts.next()),
        })
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.codec)?;
        for part in [&self.profile, &self.level].into_iter().flatten() {
            write!(f, ":{}", part)?;
        }
        Ok(())
    }
}

/// Point in a media timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offset {
    /// Decimal seconds
    Seconds(String),
    /// Percent of the duration, written `35p` or `35%`
    Percent(String),
    /// Anything else (`auto`), passed through
    Keyword(String),
}

impl Offset {
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(Offset::Seconds(n.to_string())),
            Value::String(s) => s.parse(),
            _ => Err(Error::validation(key, "expected seconds or a percent string")),
        }
    }
}

impl FromStr for Offset {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match offset_pattern().captures(s) {
            Some(caps) => {
                let number = caps[1].to_string();
                if caps.get(2).is_some() {
                    Ok(Offset::Percent(number))
                } else {
                    Ok(Offset::Seconds(number))
                }
            }
            None => Ok(Offset::Keyword(s.to_string())),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Seconds(n) => f.write_str(n),
            Offset::Percent(n) => write!(f, "{}p", n),
            Offset::Keyword(k) => f.write_str(k),
        }
    }
}

/// The combined `offset` option: a start and an end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetRange {
    pub start: Offset,
    pub end: Offset,
}

impl OffsetRange {
    /// Accepts `"a..b"` or a two-element sequence
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s.parse(),
            Value::Array(items) if items.len() == 2 => Ok(OffsetRange {
                start: Offset::from_value("offset", &items[0])?,
                end: Offset::from_value("offset", &items[1])?,
            }),
            _ => Err(Error::validation(
                "offset",
                "expected a \"start..end\" string or a two-element sequence",
            )),
        }
    }
}

impl FromStr for OffsetRange {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::validation("offset", format!("invalid range: {}", s));
        let (start, end) = s.split_once("..").ok_or_else(invalid)?;
        if !offset_pattern().is_match(start.trim()) || !offset_pattern().is_match(end.trim()) {
            return Err(invalid());
        }
        Ok(OffsetRange {
            start: start.parse()?,
            end: end.parse()?,
        })
    }
}

/// Color value; `#RRGGBB` is re-encoded as `rgb:RRGGBB`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color(String);

impl From<String> for Color {
    fn from(value: String) -> Self {
        match value.strip_prefix('#') {
            Some(hex) => Color(format!("rgb:{}", hex)),
            None => Color(value),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Overlay or underlay source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    /// Pre-encoded layer string such as `text:hello`
    Raw(String),
    /// Another asset, addressed by public id
    Asset {
        resource_type: Option<String>,
        delivery_type: Option<String>,
        public_id: String,
    },
    /// Text rendered with a font
    Text {
        font_family: String,
        font_size: String,
        text: String,
    },
}

impl Layer {
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => return Ok(Layer::Raw(scalar(key, other)?)),
        };
        let field = |name: &str| map.get(name).filter(|v| is_present(v)).and_then(scalar_string);

        if let Some(text) = field("text") {
            let font_family = field("font_family")
                .ok_or_else(|| Error::validation(key, "text layer requires 'font_family'"))?;
            let font_size = field("font_size")
                .ok_or_else(|| Error::validation(key, "text layer requires 'font_size'"))?;
            return Ok(Layer::Text {
                font_family,
                font_size,
                text,
            });
        }

        let public_id = field("public_id")
            .ok_or_else(|| Error::validation(key, "layer requires 'public_id' or 'text'"))?;
        Ok(Layer::Asset {
            resource_type: field("resource_type"),
            delivery_type: field("type"),
            public_id,
        })
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Raw(raw) => f.write_str(raw),
            Layer::Text {
                font_family,
                font_size,
                text,
            } => {
                // commas and slashes would split the token
                let text = text.replace(',', "%2C").replace('/', "%2F");
                write!(f, "text:{}_{}:{}", font_family, font_size, text)
            }
            Layer::Asset {
                resource_type,
                delivery_type,
                public_id,
            } => {
                let resource_type = resource_type.as_deref().filter(|r| *r != "image");
                let delivery_type = delivery_type.as_deref().filter(|t| *t != "upload");
                if let Some(r) = resource_type {
                    write!(f, "{}:", r)?;
                }
                if let Some(t) = delivery_type {
                    write!(f, "{}:", t)?;
                }
                f.write_str(&public_id.replace('/', ":"))
            }
        }
    }
}

/// Face or custom coordinates: a sequence of `x,y,width,height` tuples
///
/// A single tuple is accepted as sugar for a one-element sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates(pub Vec<[i64; 4]>);

impl Coordinates {
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        let invalid = || Error::validation(key, "expected 4-tuples of integers");
        match value {
            Value::String(s) => s.parse().map_err(|_| invalid()),
            Value::Array(items) if items.iter().all(Value::is_array) => {
                let tuples = items
                    .iter()
                    .map(|item| tuple(item).ok_or_else(invalid))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Coordinates(tuples))
            }
            single @ Value::Array(_) => Ok(Coordinates(vec![tuple(single).ok_or_else(invalid)?])),
            _ => Err(invalid()),
        }
    }
}

fn tuple(value: &Value) -> Option<[i64; 4]> {
    let items = value.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let mut out = [0i64; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = match item {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
    }
    Some(out)
}

impl FromStr for Coordinates {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::validation("coordinates", format!("invalid coordinates: {}", s));
        let tuples = s
            .split('|')
            .map(|group| {
                let numbers = group
                    .split(',')
                    .map(|n| n.trim().parse::<i64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| invalid())?;
                <[i64; 4]>::try_from(numbers).map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Coordinates(tuples))
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self
            .0
            .iter()
            .map(|t| t.iter().map(i64::to_string).collect::<Vec<_>>().join(","))
            .collect();
        f.write_str(&groups.join("|"))
    }
}
