//! MIME multipart user-data
//!
//! Machine images are often launched with a multipart document that mixes
//! cloud-init parts with scylla parts. Only `x-scylla/json` and
//! `x-scylla/yaml` parts carry configuration for this tool.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::collections::HashMap;
use tracing::debug;

use crate::ConfigureError;

/// MIME types holding scylla configuration
const SCYLLA_MIME_TYPES: &[&str] = &["x-scylla/json", "x-scylla/yaml"];

/// A single part from a MIME multipart message
#[derive(Debug, Clone)]
pub struct MimePart {
    /// MIME type without parameters, lowercased
    pub mime_type: String,
    /// Decoded content of this part
    pub content: String,
}

/// Whether the top-level headers declare a multipart message
pub fn is_multipart(data: &str) -> bool {
    for line in data.lines() {
        if line.trim().is_empty() {
            break;
        }
        let lower = line.to_lowercase();
        if lower.starts_with("content-type:") && lower.contains("multipart/") {
            return true;
        }
    }
    false
}

/// Payload of the last scylla part, if any
///
/// When several scylla parts exist the last one wins; they are not merged.
pub fn scylla_payload(data: &str) -> Result<Option<String>, ConfigureError> {
    let payload = parse_multipart(data)?
        .into_iter()
        .filter(|part| SCYLLA_MIME_TYPES.contains(&part.mime_type.as_str()))
        .map(|part| part.content)
        .last();

    if payload.is_none() {
        debug!("Multipart user-data has no x-scylla part");
    }
    Ok(payload)
}

/// Parse a MIME multipart message into parts
pub fn parse_multipart(data: &str) -> Result<Vec<MimePart>, ConfigureError> {
    let boundary = find_boundary(data)?;
    debug!("Found MIME boundary: {}", boundary);

    let delimiter = format!("--{}", boundary);
    let mut parts = Vec::new();

    for (i, section) in data.split(&delimiter).enumerate() {
        // Skip preamble (first section) and epilogue (after --)
        if i == 0 || section.starts_with("--") || section.trim().is_empty() {
            continue;
        }

        if let Some(part) = parse_part(section.trim_start_matches(['\r', '\n']))? {
            parts.push(part);
        }
    }

    debug!("Parsed {} MIME parts", parts.len());
    Ok(parts)
}

/// Find the boundary string in the top-level headers
fn find_boundary(data: &str) -> Result<String, ConfigureError> {
    for line in data.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.to_ascii_lowercase().contains("boundary=") {
            if let Some(boundary) = extract_param(line, "boundary=") {
                return Ok(boundary);
            }
        }
    }

    Err(ConfigureError::InvalidData(
        "No MIME boundary found".to_string(),
    ))
}

/// Extract a header parameter value, quoted or not
///
/// Only ASCII is case folded so offsets found in the folded line stay valid
/// in `line`.
fn extract_param(line: &str, name: &str) -> Option<String> {
    let idx = line.to_ascii_lowercase().find(name)?;
    let after = line.get(idx + name.len()..)?;

    let value = if let Some(quoted) = after.strip_prefix('"') {
        &quoted[..quoted.find('"')?]
    } else {
        let end = after
            .find(|c: char| c == ';' || c.is_whitespace())
            .unwrap_or(after.len());
        &after[..end]
    };

    (!value.is_empty()).then(|| value.to_string())
}

/// Parse a single MIME part
fn parse_part(data: &str) -> Result<Option<MimePart>, ConfigureError> {
    if data.trim().is_empty() {
        return Ok(None);
    }

    // Header/body separator is the first empty line
    let (headers_str, body) = if let Some(idx) = data.find("\r\n\r\n") {
        (&data[..idx], &data[idx + 4..])
    } else if let Some(idx) = data.find("\n\n") {
        (&data[..idx], &data[idx + 2..])
    } else {
        ("", data)
    };

    let mut headers = HashMap::new();
    let mut current: Option<(String, String)> = None;

    for line in headers_str.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, ref mut value)) = current {
                value.push(' ');
                value.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            if let Some((n, v)) = current.take() {
                headers.insert(n, v);
            }
            current = Some((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }
    if let Some((n, v)) = current {
        headers.insert(n, v);
    }

    let mime_type = headers
        .get("content-type")
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .unwrap_or_else(|| "text/plain".to_string());

    let content = match headers
        .get("content-transfer-encoding")
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("base64") => {
            let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
            let decoded = BASE64.decode(cleaned)?;
            String::from_utf8(decoded).map_err(|e| {
                ConfigureError::InvalidData(format!("MIME part is not UTF-8: {}", e))
            })?
        }
        _ => body.trim_end_matches(['\r', '\n']).to_string(),
    };

    Ok(Some(MimePart { mime_type, content }))
}
