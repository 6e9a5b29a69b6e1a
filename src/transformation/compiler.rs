//! Transformation compiler
//!
//! Renders canonical parameters into the URL mini-language:
//! `code_value` tokens joined by `,` within a segment (ordered by code),
//! segments joined by `/` in caller order.

use std::fmt;

use super::canonicalize::canonicalize;
use super::param::ParamKey;
use crate::error::{Error, Result};
use crate::options::Options;

/// One encoded parameter: short code plus wire value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalParam {
    key: ParamKey,
    value: String,
}

impl CanonicalParam {
    pub fn new(key: ParamKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn key(&self) -> ParamKey {
        self.key
    }

    pub fn code(&self) -> &'static str {
        self.key.code()
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for CanonicalParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.code(), self.value)
    }
}

/// Parameters forming one `/`-delimited path component
///
/// Parameters are kept sorted by code, so insertion order never shows up
/// in the rendered token. A raw transformation, when set, is appended
/// after the sorted parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformationSegment {
    params: Vec<CanonicalParam>,
    raw: Option<String>,
}

impl TransformationSegment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter; a second value for the same code is rejected
    pub fn insert(&mut self, param: CanonicalParam) -> Result<()> {
        match self
            .params
            .binary_search_by(|p| p.code().cmp(param.code()))
        {
            Ok(pos) => Err(Error::validation(
                param.key().key(),
                format!(
                    "conflicting values '{}' and '{}' for '{}'",
                    self.params[pos].value(),
                    param.value(),
                    param.code()
                ),
            )),
            Err(pos) => {
                self.params.insert(pos, param);
                Ok(())
            }
        }
    }

    pub fn set_raw(&mut self, raw: impl Into<String>) {
        let raw = raw.into();
        self.raw = if raw.is_empty() { None } else { Some(raw) };
    }

    pub fn get(&self, key: ParamKey) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key() == key)
            .map(CanonicalParam::value)
    }

    pub fn contains(&self, key: ParamKey) -> bool {
        self.get(key).is_some()
    }

    pub fn params(&self) -> &[CanonicalParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.raw.is_none()
    }

    /// Width and height to report for markup, if they can be trusted
    ///
    /// Layers, rotation and fit/limit crops change the delivered size, so
    /// the side-channel is left empty for them even though `w_`/`h_` stay in
    /// the token.
    pub fn html_size(&self) -> HtmlSize {
        let layered = self.contains(ParamKey::Overlay) || self.contains(ParamKey::Underlay);
        let rotated = self.contains(ParamKey::Angle);
        let fitted = matches!(self.get(ParamKey::Crop), Some("fit") | Some("limit"));
        if layered || rotated || fitted {
            return HtmlSize::default();
        }

        let width = self
            .get(ParamKey::Width)
            .filter(|w| !w.starts_with("auto") && !is_fraction(w));
        let height = self.get(ParamKey::Height).filter(|h| !is_fraction(h));
        HtmlSize {
            width: width.map(str::to_string),
            height: height.map(str::to_string),
        }
    }
}

/// Relative sizes (`0.5`) scale the original and say nothing about pixels
fn is_fraction(value: &str) -> bool {
    value.parse::<f64>().map(|v| v < 1.0).unwrap_or(false)
}

impl fmt::Display for TransformationSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        if let Some(raw) = &self.raw {
            tokens.push(raw.clone());
        }
        f.write_str(&tokens.join(","))
    }
}

/// Ordered sequence of segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformationChain {
    segments: Vec<TransformationSegment>,
}

impl TransformationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract transformation options, returning the chain and the
    /// options that were not consumed
    ///
    /// Nested transformations come first, followed by the segment built
    /// from the top-level keys.
    pub fn from_options(options: Options) -> Result<(Self, Options)> {
        let canonical = canonicalize(options)?;
        let mut chain = Self {
            segments: canonical.base,
        };
        chain.push(canonical.segment);
        Ok((chain, canonical.leftover))
    }

    pub fn push(&mut self, segment: TransformationSegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[TransformationSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(TransformationSegment::is_empty)
    }

    /// Render the path and the HTML-size side-channel of the last segment
    pub fn compile(&self) -> CompiledTransformation {
        let path = self
            .segments
            .iter()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/");
        let html_size = self
            .segments
            .last()
            .map(TransformationSegment::html_size)
            .unwrap_or_default();

        tracing::debug!(transformation = %path, "Compiled transformation");
        CompiledTransformation { path, html_size }
    }
}

impl From<TransformationSegment> for TransformationChain {
    fn from(segment: TransformationSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl FromIterator<TransformationSegment> for TransformationChain {
    fn from_iter<I: IntoIterator<Item = TransformationSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

/// Width/height reported alongside a URL for `<img>` attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlSize {
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledTransformation {
    pub path: String,
    pub html_size: HtmlSize,
}

impl CompiledTransformation {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for CompiledTransformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Compile options into a transformation path in one step
///
/// ```
/// use cloudinary::options::from_value;
/// use cloudinary::transformation::generate_transformation_string;
/// use serde_json::json;
///
/// let options = from_value(json!({"width": 100, "crop": "fill", "public_id": "x"}));
/// let (compiled, leftover) = generate_transformation_string(options).unwrap();
/// assert_eq!(compiled.path, "c_fill,w_100");
/// assert!(leftover.contains_key("public_id"));
/// ```
pub fn generate_transformation_string(
    options: Options,
) -> Result<(CompiledTransformation, Options)> {
    let (chain, leftover) = TransformationChain::from_options(options)?;
    Ok((chain.compile(), leftover))
}
