// Upload parameter builder
//
// Turns caller options into the wire fields of an upload or explicit
// call. Transformation keys left after the upload keys are taken are
// compiled into the `transformation` field.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::options::{scalar_string, take, take_string, truthy, Options};
use crate::signature::{ParamValue, RequestParams};
use crate::transformation::{generate_transformation_string, Coordinates};
use crate::url::DeliveryType;

/// Boolean options, sent as `1` or `0`
const FLAG_KEYS: &[&str] = &[
    "use_filename",
    "unique_filename",
    "overwrite",
    "invalidate",
    "backup",
    "faces",
    "colors",
    "image_metadata",
    "exif",
    "phash",
    "eager_async",
    "return_delete_token",
    "async",
    "quality_analysis",
    "discard_original_filename",
];

/// Options sent as they are
const STRING_KEYS: &[&str] = &[
    "public_id",
    "folder",
    "format",
    "callback",
    "notification_url",
    "eager_notification_url",
    "proxy",
    "moderation",
    "ocr",
    "raw_convert",
    "categorization",
    "detection",
    "background_removal",
    "auto_tagging",
    "upload_preset",
    "similarity_search",
];

/// Options sent as comma-joined lists
const LIST_KEYS: &[&str] = &["tags", "allowed_formats"];

/// Build request fields from options
///
/// Returns the fields and the options nothing consumed.
pub fn build_upload_params(mut options: Options) -> Result<(RequestParams, Options)> {
    let mut params = RequestParams::new();

    if let Some(delivery_type) = take_string(&mut options, "type") {
        let delivery_type: DeliveryType = delivery_type.parse()?;
        params.insert("type".into(), delivery_type.as_str().into());
    }

    for key in FLAG_KEYS {
        if let Some(value) = options.remove(*key).filter(|v| !v.is_null()) {
            let flag = if truthy(&value) { "1" } else { "0" };
            params.insert((*key).to_string(), flag.into());
        }
    }

    for key in STRING_KEYS {
        if let Some(value) = take_string(&mut options, key) {
            params.insert((*key).to_string(), value.into());
        }
    }

    for key in LIST_KEYS {
        if let Some(value) = take(&mut options, key) {
            params.insert((*key).to_string(), list(key, &value)?);
        }
    }

    if let Some(value) = take(&mut options, "context") {
        params.insert("context".into(), encode_context(&value)?.into());
    }

    for key in ["face_coordinates", "custom_coordinates"] {
        if let Some(value) = take(&mut options, key) {
            let coordinates = Coordinates::from_value(key, &value)?;
            params.insert(key.to_string(), coordinates.to_string().into());
        }
    }

    if let Some(value) = take(&mut options, "headers") {
        params.insert("headers".into(), encode_headers(&value)?.into());
    }

    if let Some(value) = take(&mut options, "eager") {
        params.insert("eager".into(), encode_eager(&value)?.into());
    }

    if let Some(value) = take(&mut options, "access_control") {
        params.insert("access_control".into(), encode_access_control(value)?.into());
    }

    if let Some(value) = take(&mut options, "responsive_breakpoints") {
        params.insert(
            "responsive_breakpoints".into(),
            encode_breakpoints(value)?.into(),
        );
    }

    let (transformation, leftover) = generate_transformation_string(options)?;
    if !transformation.is_empty() {
        params.insert("transformation".into(), transformation.path.into());
    }

    Ok((params, leftover))
}

fn list(key: &str, value: &Value) -> Result<ParamValue> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                scalar_string(item)
                    .ok_or_else(|| Error::validation(key, "expected a list of strings"))
            })
            .collect::<Result<Vec<_>>>()
            .map(ParamValue::Multi),
        other => scalar_string(other)
            .map(ParamValue::Single)
            .ok_or_else(|| Error::validation(key, "expected a string or a list of strings")),
    }
}

/// `key=value|key=value`, with `=` and `|` in values escaped
fn encode_context(value: &Value) -> Result<String> {
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .filter_map(|(k, v)| scalar_string(v).map(|v| (k, v)))
            .map(|(k, v)| format!("{}={}", k, v.replace('=', "\\=").replace('|', "\\|")))
            .collect::<Vec<_>>()
            .join("|")),
        other => scalar_string(other)
            .ok_or_else(|| Error::validation("context", "expected a mapping or a string")),
    }
}

/// Mapping or list of `Name: value` lines, newline-separated
fn encode_headers(value: &Value) -> Result<String> {
    let invalid = || Error::validation("headers", "expected a mapping or a list of strings");
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .filter_map(|(k, v)| scalar_string(v).map(|v| format!("{}: {}", k, v)))
            .collect::<Vec<_>>()
            .join("\n")),
        Value::Array(items) => items
            .iter()
            .map(|item| scalar_string(item).ok_or_else(invalid))
            .collect::<Result<Vec<_>>>()
            .map(|lines| lines.join("\n")),
        Value::String(s) => Ok(s.clone()),
        _ => Err(invalid()),
    }
}

/// Eager transformations: each compiled, optionally with `/format`,
/// joined by `|`
fn encode_eager(value: &Value) -> Result<String> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut encoded = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => encoded.push(s.clone()),
            Value::Object(map) => {
                let mut options = map.clone();
                let format = take_string(&mut options, "format");
                let (transformation, _) = generate_transformation_string(options)?;
                let mut entry = transformation.path;
                if let Some(format) = format {
                    entry.push('/');
                    entry.push_str(&format);
                }
                encoded.push(entry);
            }
            _ => {
                return Err(Error::validation(
                    "eager",
                    "expected transformation mappings or strings",
                ))
            }
        }
    }
    Ok(encoded.join("|"))
}

/// JSON array of access rules; dates become ISO-8601 with milliseconds
fn encode_access_control(value: Value) -> Result<String> {
    let rules = match value {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        Value::String(s) => return Ok(s),
        _ => {
            return Err(Error::validation(
                "access_control",
                "expected a mapping or a list of mappings",
            ))
        }
    };

    let rules = rules
        .into_iter()
        .map(|rule| match rule {
            Value::Object(mut map) => {
                for key in ["start", "end"] {
                    if let Some(Value::String(date)) = map.get(key) {
                        let normalized = normalize_date(date)?;
                        map.insert(key.to_string(), Value::String(normalized));
                    }
                }
                Ok(Value::Object(map))
            }
            _ => Err(Error::validation("access_control", "each rule must be a mapping")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&rules)?)
}

fn normalize_date(date: &str) -> Result<String> {
    DateTime::parse_from_rfc3339(date)
        .map(|d| {
            d.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .map_err(|_| Error::validation("access_control", format!("invalid date: {}", date)))
}

/// JSON array of breakpoint settings, nested transformations compiled
fn encode_breakpoints(value: Value) -> Result<String> {
    let entries = match value {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        Value::String(s) => return Ok(s),
        _ => {
            return Err(Error::validation(
                "responsive_breakpoints",
                "expected a mapping or a list of mappings",
            ))
        }
    };

    let entries = entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(mut map) => {
                match map.remove("transformation") {
                    Some(nested @ (Value::Object(_) | Value::Array(_))) => {
                        let mut options = Options::new();
                        options.insert("transformation".into(), nested);
                        let (compiled, _) = generate_transformation_string(options)?;
                        map.insert("transformation".into(), Value::String(compiled.path));
                    }
                    Some(other) => {
                        map.insert("transformation".into(), other);
                    }
                    None => {}
                }
                Ok(Value::Object(map))
            }
            _ => Err(Error::validation(
                "responsive_breakpoints",
                "each entry must be a mapping",
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&entries)?)
}
