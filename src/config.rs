//! Configuration manager for the directory.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_DATABASE_PATH: &str = "electorate.db.json";

/// Deployment environment of the embedding application.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    #[serde(default)]
    pub name: String,
    /// Path of the JSON database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Deployment environment. Anything but `production` turns the
    /// `debugging` flag on in user data handed to clients.
    #[serde(default)]
    pub environment: Environment,
    #[serde(skip)]
    path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: String::default(),
            database: default_database_path(),
            environment: Environment::default(),
            path: PathBuf::default(),
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Self {
        let file_path = if self.path.is_file() {
            self.path.as_path()
        } else {
            Path::new(DEFAULT_CONFIG_PATH)
        };

        match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        }
    }

    /// Whether clients should be told to go into debugging mode.
    pub fn debugging(&self) -> bool {
        self.environment != Environment::Production
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self::default()
    }
}
