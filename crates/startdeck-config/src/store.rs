//! Per-user configuration persistence.
//!
//! One JSON document per user, `config_<user>.json` under the data
//! directory. Saves go through a temp file in the same directory followed
//! by a rename, so readers never observe a half-written document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{CONFIG_VERSION, UserConfig};

/// Loads and saves one user's configuration document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    data_dir: PathBuf,
    user: String,
}

impl ConfigStore {
    /// Creates a store for `user` rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user name is empty or would escape the data
    /// directory when used as a file name.
    pub fn new(data_dir: impl Into<PathBuf>, user: impl Into<String>) -> ConfigResult<Self> {
        let user = user.into();
        if user.is_empty()
            || !user
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            || user.contains("..")
        {
            return Err(ConfigError::InvalidUser(user));
        }
        Ok(Self {
            data_dir: data_dir.into(),
            user,
        })
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("config_{}.json", self.user))
    }

    /// The user this store belongs to.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Loads the user's configuration, falling back to the defaults when no
    /// file exists yet.
    pub fn load(&self) -> ConfigResult<UserConfig> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(user = %self.user, "no config file yet, using defaults");
                return Ok(UserConfig::default_config(&self.user));
            }
            Err(err) => return Err(err.into()),
        };

        let mut config: UserConfig = serde_json::from_str(&raw)?;
        if config.user.is_empty() {
            config.user = self.user.clone();
        }
        debug!(user = %self.user, path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Validates and persists the whole document, replacing the previous one
    /// atomically.
    pub fn save(&self, config: &UserConfig) -> ConfigResult<()> {
        config.validate()?;

        let mut stamped = config.clone();
        stamped.version = CONFIG_VERSION;

        fs::create_dir_all(&self.data_dir)?;
        let path = self.path();
        write_atomically(&self.data_dir, &path, &stamped)?;

        info!(user = %self.user, path = %path.display(), "saved config");
        Ok(())
    }
}

/// Serializes into a temp file in `dir`, then renames over `path`.
fn write_atomically(dir: &Path, path: &Path, config: &UserConfig) -> ConfigResult<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, config)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)?;
    Ok(())
}
