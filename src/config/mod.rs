//! scylla.yaml handling
//!
//! Reading the pre-existing document, reconciling it with defaults,
//! instance facts and user-data, and putting the result in place.

pub mod defaults;
pub mod merge;

use serde_yaml::{Mapping, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::ConfigureError;

pub use defaults::DefaultTable;
pub use merge::reconcile;

/// In-memory scylla.yaml, an ordered mapping of top-level keys
pub type ConfigDocument = Mapping;

/// Read the configuration document at `path`
///
/// A missing or empty file gives an empty document. A file that does not
/// hold a mapping is logged and replaced by an empty document; it is still
/// preserved as the example copy when the new document is written.
pub async fn load_document(path: impl AsRef<Path>) -> Result<ConfigDocument, ConfigureError> {
    let path = path.as_ref();

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} does not exist, starting from an empty document", path.display());
            return Ok(Mapping::new());
        }
        Err(e) => return Err(e.into()),
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(document)) => Ok(document),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => {
            warn!("{} does not hold a mapping, ignoring its content", path.display());
            Ok(Mapping::new())
        }
        Err(e) => {
            warn!("Failed to parse {}: {}, ignoring its content", path.display(), e);
            Ok(Mapping::new())
        }
    }
}

/// Put `document` in place at `path`
///
/// A pre-existing file is first renamed to `example_path`. If that rename
/// fails nothing is written.
pub async fn write_document(
    path: impl AsRef<Path>,
    example_path: impl AsRef<Path>,
    document: &ConfigDocument,
) -> Result<(), ConfigureError> {
    let path = path.as_ref();
    let example_path = example_path.as_ref();

    let content = serde_yaml::to_string(document)?;

    if fs::try_exists(path)
        .await
        .map_err(|e| ConfigureError::precondition(path, e))?
    {
        debug!("Moving {} to {}", path.display(), example_path.display());
        fs::rename(path, example_path)
            .await
            .map_err(|e| ConfigureError::precondition(path, e))?;
    }

    info!("Saving {}", path.display());
    fs::write(path, content)
        .await
        .map_err(|e| ConfigureError::precondition(path, e))?;

    Ok(())
}
