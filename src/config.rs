//! Where the database lives.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the database location.
pub const DATABASE_ENV: &str = "TUDO_DB";

const DATA_DIR: &str = ".tudo";
const DATABASE_FILE: &str = "tudo.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the home directory; set TUDO_DB or pass --db")]
    NoHomeDirectory,

    #[error("failed to create database directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
}

impl Config {
    /// Resolves the database path: `explicit` first, then `TUDO_DB`, then
    /// `~/.tudo/tudo.db`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(explicit, std::env::var_os(DATABASE_ENV), dirs::home_dir())
    }

    fn from_sources(
        explicit: Option<&Path>,
        env: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let database_path = match (explicit, env) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(value)) if !value.is_empty() => PathBuf::from(value),
            _ => home
                .ok_or(ConfigError::NoHomeDirectory)?
                .join(DATA_DIR)
                .join(DATABASE_FILE),
        };
        Ok(Self { database_path })
    }

    /// Creates the parent directory of the database file, mode 0755 on unix.
    pub fn ensure_database_directory(&self) -> Result<(), ConfigError> {
        let Some(parent) = self.database_path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder
            .create(parent)
            .map_err(|source| ConfigError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })
    }
}
