//! # Profile Store
//!
//! Loads and saves the persisted mapping as JSON.
//!
//! Loading is best-effort: a missing, unreadable, malformed or out-of-range
//! file yields the default (empty) profile, never a partial one. Saving is
//! atomic: the profile is written to a temporary file next to the target and
//! renamed over it, so a crash mid-save leaves the previous file intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::mapping::profile::Profile;

/// Location of the persisted mapping.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the profile, falling back to defaults on any failure.
    pub fn load(&self) -> Profile {
        match self.try_load() {
            Ok(Some(profile)) => {
                info!(
                    "Loaded mapping from {} ({} control(s), {} action(s))",
                    self.path.display(),
                    profile.controls.len(),
                    profile.actions.len()
                );
                profile
            }
            Ok(None) => {
                debug!("No mapping at {}, using defaults", self.path.display());
                Profile::default()
            }
            Err(e) => {
                warn!("Ignoring mapping at {}: {}", self.path.display(), e);
                Profile::default()
            }
        }
    }

    /// Strict variant of [`load`](Self::load): `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// - `Io`: the file exists but cannot be read
    /// - `Mapping`: the JSON is malformed or a value is out of range
    pub fn try_load(&self) -> Result<Option<Profile>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let profile: Profile = serde_json::from_str(&contents)?;
        profile.validate()?;
        Ok(Some(profile))
    }

    /// Writes the profile atomically.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the temporary file cannot be written or renamed, or
    /// `Mapping` if encoding fails. The previous file is untouched on error.
    pub fn save(&self, profile: &Profile) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(profile)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Saved mapping to {}", self.path.display());
        Ok(())
    }
}
