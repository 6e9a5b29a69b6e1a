//! Parameter canonicalizer
//!
//! Pulls recognized keys out of caller options and encodes them. Sugar
//! keys (`size`, `offset`) are expanded before the per-key encoders run.

use serde_json::Value;

use super::compiler::{CanonicalParam, TransformationSegment};
use super::param::{OffsetRange, ParamKey};
use crate::error::{Error, Result};
use crate::options::{is_present, scalar_string, take, take_string, Options};

/// Result of canonicalizing one level of options
#[derive(Debug, Clone, Default)]
pub struct Canonicalized {
    /// Segments from nested `transformation` mappings, in caller order
    pub base: Vec<TransformationSegment>,
    /// Segment built from the top-level keys
    pub segment: TransformationSegment,
    /// Options no encoder consumed
    pub leftover: Options,
}

pub fn canonicalize(mut options: Options) -> Result<Canonicalized> {
    let mut segment = TransformationSegment::new();
    let mut base = Vec::new();

    expand_size(&mut options)?;

    if let Some(value) = take(&mut options, "offset") {
        let range = OffsetRange::from_value(&value)?;
        for key in [ParamKey::StartOffset, ParamKey::EndOffset] {
            if options.get(key.key()).map(is_present).unwrap_or(false) {
                return Err(Error::validation(
                    "offset",
                    format!("cannot be combined with '{}'", key.key()),
                ));
            }
        }
        segment.insert(CanonicalParam::new(
            ParamKey::StartOffset,
            range.start.to_string(),
        ))?;
        segment.insert(CanonicalParam::new(ParamKey::EndOffset, range.end.to_string()))?;
    }

    if let Some(value) = take(&mut options, ParamKey::NamedTransformation.key()) {
        match value {
            Value::Object(nested) => base.extend(nested_segments(nested)?),
            Value::Array(items) if items.iter().all(Value::is_object) => {
                for item in items {
                    if let Value::Object(nested) = item {
                        base.extend(nested_segments(nested)?);
                    }
                }
            }
            named => {
                if let Some(encoded) = ParamKey::NamedTransformation.encode(&named)? {
                    segment.insert(CanonicalParam::new(ParamKey::NamedTransformation, encoded))?;
                }
            }
        }
    }

    for key in ParamKey::EXTRACTED {
        if let Some(value) = options.remove(key.key()) {
            if let Some(encoded) = key.encode(&value)? {
                segment.insert(CanonicalParam::new(*key, encoded))?;
            }
        }
    }

    if let Some(raw) = take_string(&mut options, "raw_transformation") {
        segment.set_raw(raw);
    }

    Ok(Canonicalized {
        base,
        segment,
        leftover: options,
    })
}

/// A nested mapping yields its own base segments followed by itself
fn nested_segments(options: Options) -> Result<Vec<TransformationSegment>> {
    let canonical = canonicalize(options)?;
    if !canonical.leftover.is_empty() {
        let ignored: Vec<&str> = canonical.leftover.keys().map(String::as_str).collect();
        tracing::warn!(
            ignored = ?ignored,
            "Ignoring unrecognized keys in nested transformation"
        );
    }
    let mut segments = canonical.base;
    segments.push(canonical.segment);
    Ok(segments)
}

/// `size: "WxH"` becomes width and height
fn expand_size(options: &mut Options) -> Result<()> {
    let Some(value) = take(options, "size") else {
        return Ok(());
    };
    let size = scalar_string(&value)
        .ok_or_else(|| Error::validation("size", "expected a \"WIDTHxHEIGHT\" string"))?;
    let (width, height) = size
        .split_once('x')
        .filter(|(w, h)| !w.is_empty() && !h.is_empty())
        .ok_or_else(|| Error::validation("size", format!("expected WIDTHxHEIGHT, got '{}'", size)))?;

    for key in [ParamKey::Width, ParamKey::Height] {
        if options.get(key.key()).map(is_present).unwrap_or(false) {
            return Err(Error::validation(
                "size",
                format!("cannot be combined with '{}'", key.key()),
            ));
        }
    }
    options.insert("width".into(), Value::String(width.to_string()));
    options.insert("height".into(), Value::String(height.to_string()));
    Ok(())
}
