use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PATH: &str = "settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    /// OAuth client secret downloaded from the Google console.
    pub credentials_path: String,
    pub user_id: String,
    pub sync: SyncSettings,
    pub remote: RemoteSettings,
    pub keyring: KeyringSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Gmail caps batchDelete / batchModify at 1000 ids per call.
    pub max_batch_size: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringSettings {
    pub service: String,
    pub token_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:gsweep.db?mode=rwc".to_string(),
            credentials_path: "credentials.json".to_string(),
            user_id: "me".to_string(),
            sync: SyncSettings::default(),
            remote: RemoteSettings::default(),
            keyring: KeyringSettings::default(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 32_000,
        }
    }
}

impl Default for KeyringSettings {
    fn default() -> Self {
        Self {
            service: "gsweep".to_string(),
            token_key: "gmail_token".to_string(),
        }
    }
}

impl RemoteSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Config {
    /// Reads the settings file, or returns defaults when there is none.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.user_id, "me");
        assert_eq!(config.remote.max_batch_size, 1000);
        assert_eq!(config.sync.page_size, 100);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_url = \"sqlite:other.db\"\n[remote]\nmax_retries = 1"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database_url, "sqlite:other.db");
        assert_eq!(config.remote.max_retries, 1);
        assert_eq!(config.remote.max_batch_size, 1000);
        assert_eq!(config.keyring.service, "gsweep");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sync = 3").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
