//! Credential file persistence
//!
//! The token manager reports every credential change through a synchronous
//! listener, so this store uses blocking `std::fs`. Writes use an atomic
//! temp-file + rename to prevent corruption on crash.

use std::path::{Path, PathBuf};

use keeper_auth::Credentials;
use tracing::debug;

/// JSON file holding one credential record.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored record. A missing file is `None`, not an error.
    pub fn load(&self) -> common::Result<Option<Credentials>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credentials = serde_json::from_str(&contents)?;
        debug!(path = %self.path.display(), "loaded stored credentials");
        Ok(Some(credentials))
    }

    /// Replace the stored record.
    ///
    /// File permissions are set to 0600 (owner read/write only) since the
    /// record carries the client secret and both tokens.
    pub fn save(&self, credentials: &Credentials) -> common::Result<()> {
        let json = serde_json::to_string_pretty(credentials)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp_path = dir.join(format!(".keeper-credentials.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, json.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), "persisted credentials");
        Ok(())
    }
}
