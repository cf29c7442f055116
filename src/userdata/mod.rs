//! User-data parsing
//!
//! User-data is a JSON object (or a YAML mapping, or a multipart message
//! carrying one) holding `scylla.yaml` overrides and a handful of
//! provisioning directives. Parsing fails open: anything that cannot be
//! decoded yields an empty override set so the node still comes up.

pub mod mime;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::io::Read;
use tracing::{debug, warn};

use crate::ConfigureError;

/// Overrides and directives supplied through user-data
///
/// Absent keys stay `None` and fall back to the default table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOverrides {
    /// Partial scylla.yaml document, highest precedence
    pub scylla_yaml: Mapping,
    /// Extra scylla startup arguments (not applied)
    pub scylla_startup_args: Option<Value>,
    pub developer_mode: Option<bool>,
    /// Base64 encoded shell script run after configuration
    pub post_configuration_script: Option<String>,
    /// Seconds the post-configuration script may run
    pub post_configuration_script_timeout: Option<u64>,
    pub start_scylla_on_first_boot: Option<bool>,
    /// Device type handed to the device creation program
    pub data_device: Option<String>,
    /// Base64 encoded shell script run once scylla has started
    pub post_start_script: Option<String>,
}

impl UserOverrides {
    /// Build from a parsed user-data mapping
    ///
    /// A key holding a value of the wrong type is ignored with a warning.
    pub fn from_mapping(doc: &Mapping) -> Self {
        for key in doc.keys() {
            if let Some(name) = key.as_str().filter(|name| !KNOWN_KEYS.contains(name)) {
                debug!("Ignoring unknown user-data key '{}'", name);
            }
        }

        Self {
            scylla_yaml: field(doc, "scylla_yaml").unwrap_or_default(),
            scylla_startup_args: field(doc, "scylla_startup_args"),
            developer_mode: field(doc, "developer_mode"),
            post_configuration_script: field(doc, "post_configuration_script"),
            post_configuration_script_timeout: field(doc, "post_configuration_script_timeout"),
            start_scylla_on_first_boot: field(doc, "start_scylla_on_first_boot"),
            data_device: field(doc, "data_device"),
            post_start_script: field(doc, "post_start_script"),
        }
    }

    /// Whether non-empty startup arguments were requested
    pub fn requests_startup_args(&self) -> bool {
        match &self.scylla_startup_args {
            None | Some(Value::Null) => false,
            Some(Value::Sequence(args)) => !args.is_empty(),
            Some(Value::String(args)) => !args.trim().is_empty(),
            Some(Value::Mapping(args)) => !args.is_empty(),
            Some(Value::Bool(flag)) => *flag,
            Some(_) => true,
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "scylla_yaml",
    "scylla_startup_args",
    "developer_mode",
    "post_configuration_script",
    "post_configuration_script_timeout",
    "start_scylla_on_first_boot",
    "data_device",
    "post_start_script",
];

fn field<T: DeserializeOwned>(doc: &Mapping, key: &str) -> Option<T> {
    let value = doc.get(key)?;
    if value.is_null() {
        return None;
    }

    match serde_yaml::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring user-data key '{}': {}", key, e);
            None
        }
    }
}

/// Parse raw user-data into overrides
///
/// Never fails: empty input gives an empty override set, and undecodable
/// input is logged and treated the same way.
pub fn parse_user_data(raw: &[u8]) -> UserOverrides {
    match decode_document(raw) {
        Ok(Some(doc)) => {
            let overrides = UserOverrides::from_mapping(&doc);
            debug!("Parsed user-data: {:?}", overrides);
            overrides
        }
        Ok(None) => {
            debug!("No user-data supplied");
            UserOverrides::default()
        }
        Err(e) => {
            warn!("Error parsing user-data: {}. Will use defaults!", e);
            UserOverrides::default()
        }
    }
}

/// Decode raw user-data into a mapping, `None` when there is nothing to apply
fn decode_document(raw: &[u8]) -> Result<Option<Mapping>, ConfigureError> {
    let data = decompress_if_needed(raw)?;
    let text = String::from_utf8(data)
        .map_err(|e| ConfigureError::InvalidData(format!("user-data is not UTF-8: {}", e)))?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let payload = if mime::is_multipart(text) {
        match mime::scylla_payload(text)? {
            Some(payload) => payload,
            None => return Ok(None),
        }
    } else {
        text.to_string()
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    let value: Value = match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(json) => serde_yaml::to_value(json)?,
        Err(json_error) => {
            debug!("user-data is not JSON ({}), trying YAML", json_error);
            serde_yaml::from_str(payload).map_err(|_| json_error)?
        }
    };

    match value {
        Value::Mapping(doc) => Ok(Some(doc)),
        Value::Null => Ok(None),
        _ => Err(ConfigureError::InvalidData(
            "user-data is not a mapping".to_string(),
        )),
    }
}

/// Decompress gzip data if needed
fn decompress_if_needed(data: &[u8]) -> Result<Vec<u8>, ConfigureError> {
    // Check for gzip magic bytes
    if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
        debug!("Decompressing gzip user-data");
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).map_err(|e| {
            ConfigureError::InvalidData(format!("Gzip decompression failed: {}", e))
        })?;
        Ok(decompressed)
    } else {
        Ok(data.to_vec())
    }
}
