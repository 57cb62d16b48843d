//! Filesystem storage adapter.
//!
//! Implements both [`ConfigPort`] and [`ProfileStore`] over plain JSON
//! files under one root directory:
//!
//! ```text
//! <root>/settings.json      controller configuration
//! <root>/prog/<name>.json   firing profiles
//! ```
//!
//! On ESP-IDF the root is a SPIFFS partition mounted into the VFS by
//! [`FsStore::mount`]; on the host it is any directory.
//!
//! # Validation
//!
//! - Config is range-checked before it is written; invalid ranges never
//!   reach flash.
//! - Profile names are single path components: empty names and names
//!   containing `/`, `\` or `..` are rejected.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::app::ports::{ConfigError, ConfigPort, ProfileError, ProfileStore};
use crate::config::ControllerConfig;
use crate::control::profile::Profile;

const SETTINGS_FILE: &str = "settings.json";
const PROFILE_DIR: &str = "prog";
const PROFILE_EXT: &str = ".json";

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("FsStore: root {}", root.display());
        Self { root }
    }

    /// Mount the default SPIFFS partition at `base_path` and open a store
    /// rooted there.  Formats the partition if it cannot be mounted.
    #[cfg(target_os = "espidf")]
    pub fn mount(base_path: &'static core::ffi::CStr) -> Result<Self, ConfigError> {
        use esp_idf_svc::sys::*;

        let conf = esp_vfs_spiffs_conf_t {
            base_path: base_path.as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 4,
            format_if_mount_failed: true,
        };
        // SAFETY: called once from main() before any file access; `conf`
        // and `base_path` outlive the call (the VFS copies the strings).
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK {
            warn!("FsStore: SPIFFS mount failed ({})", ret);
            return Err(ConfigError::IoError);
        }
        let root = base_path.to_str().map_err(|_| ConfigError::IoError)?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    fn profile_dir(&self) -> PathBuf {
        self.root.join(PROFILE_DIR)
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf, ProfileError> {
        let file = profile_file_name(name)?;
        Ok(self.profile_dir().join(file))
    }
}

/// Stored file name for a profile: `name` with `.json` appended if missing.
pub fn profile_file_name(name: &str) -> Result<String, ProfileError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(ProfileError::InvalidName);
    }
    if name.ends_with(PROFILE_EXT) {
        Ok(name.to_owned())
    } else {
        Ok(format!("{name}{PROFILE_EXT}"))
    }
}

fn profile_io(e: &std::io::Error) -> ProfileError {
    if e.kind() == ErrorKind::NotFound {
        ProfileError::NotFound
    } else {
        debug!("FsStore: {}", e);
        ProfileError::IoError
    }
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for FsStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let bytes = match fs::read(self.settings_path()) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ConfigError::NotFound),
            Err(e) => {
                warn!("FsStore: reading {}: {}", SETTINGS_FILE, e);
                return Err(ConfigError::IoError);
            }
        };
        let config: ControllerConfig = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("FsStore: {} is corrupted: {}", SETTINGS_FILE, e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        Ok(config)
    }

    fn save(&mut self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = serde_json::to_vec_pretty(config).map_err(|_| ConfigError::Corrupted)?;
        fs::create_dir_all(&self.root).map_err(|_| ConfigError::IoError)?;
        fs::write(self.settings_path(), bytes).map_err(|e| {
            warn!("FsStore: writing {}: {}", SETTINGS_FILE, e);
            ConfigError::IoError
        })?;
        info!("FsStore: configuration saved");
        Ok(())
    }
}

// ── ProfileStore ──────────────────────────────────────────────

impl ProfileStore for FsStore {
    fn load(&self, name: &str) -> Result<Profile, ProfileError> {
        let path = self.profile_path(name)?;
        let bytes = fs::read(&path).map_err(|e| profile_io(&e))?;
        Profile::from_json(&bytes)
    }

    fn save(&mut self, name: &str, profile: &Profile) -> Result<(), ProfileError> {
        let path = self.profile_path(name)?;
        let bytes = profile.to_json()?;
        fs::create_dir_all(self.profile_dir()).map_err(|e| profile_io(&e))?;
        fs::write(&path, bytes).map_err(|e| profile_io(&e))?;
        info!("FsStore: profile '{}' saved", name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, ProfileError> {
        let entries = match fs::read_dir(self.profile_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(profile_io(&e)),
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let file = entry.file_name().into_string().ok()?;
                file.strip_suffix(PROFILE_EXT).map(str::to_owned)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn delete(&mut self, name: &str) -> Result<(), ProfileError> {
        let path = self.profile_path(name)?;
        fs::remove_file(&path).map_err(|e| profile_io(&e))?;
        info!("FsStore: profile '{}' deleted", name);
        Ok(())
    }
}
