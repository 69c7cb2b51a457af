//! Persistence for trained parameter bundles.

use std::{fs, io::ErrorKind, path::Path};

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::error::{ExtractError, Result};

/// Serialize `value` and write it through [`write_bytes_atomic`].
pub fn write_json_atomic<T: Serialize>(kind: &'static str, path: &Path, value: &T) -> Result<()> {
    let payload = serde_json::to_vec(value).map_err(|e| ExtractError::ArtifactCorrupt {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_bytes_atomic(kind, path, &payload)
}

/// Write `payload` next to `path` and rename it into place, so readers
/// only ever observe a complete previous or complete new artifact.
pub fn write_bytes_atomic(kind: &'static str, path: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);
    fs::write(tmp, payload).map_err(|e| ExtractError::io(tmp, e))?;
    fs::rename(tmp, path).map_err(|e| ExtractError::io(path, e))?;
    info!(kind, path = %path.display(), "persisted artifact");
    Ok(())
}

/// Read raw artifact bytes, separating "absent" from "unreadable".
pub fn read_bytes(kind: &'static str, path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ExtractError::ArtifactMissing {
            kind,
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ExtractError::io(path, e)),
    }
}

/// Read and deserialize a JSON artifact.
pub fn read_json<T: DeserializeOwned>(kind: &'static str, path: &Path) -> Result<T> {
    let bytes = read_bytes(kind, path)?;
    serde_json::from_slice(&bytes).map_err(|e| ExtractError::ArtifactCorrupt {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
