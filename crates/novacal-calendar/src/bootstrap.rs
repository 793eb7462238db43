//! Credential bootstrap
//!
//! Materialises the OAuth client secrets and the authorized-user token from
//! the secret store onto disk so the calendar client can read them. Existing
//! files are never overwritten.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use novacal_core::{CalendarSettings, SecretsConfig};

use crate::error::{CalendarError, Result};

pub const CREDENTIALS_SECRET: &str = "google_calendar_credentials";
pub const TOKEN_SECRET: &str = "google_calendar_token";

const CREDENTIALS_ENV: &str = "GOOGLE_CALENDAR_CREDENTIALS";
const TOKEN_ENV: &str = "GOOGLE_CALENDAR_TOKEN";

/// File-backed secrets, read from the `[files]` table
#[derive(Debug, Default, Deserialize)]
pub struct SecretStore {
    #[serde(default)]
    files: HashMap<String, String>,
}

impl SecretStore {
    /// Load the store; a missing file is an empty store
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No secret store at {}", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            CalendarError::InvalidInput(format!(
                "secret store '{}' is not valid TOML: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Written,
    AlreadyPresent,
    NoSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    pub credentials: BootstrapOutcome,
    pub token: BootstrapOutcome,
}

/// Bootstrap from the configured secret store and the process environment
pub fn bootstrap_credentials(
    settings: &CalendarSettings,
    secrets: &SecretsConfig,
) -> Result<BootstrapReport> {
    let store = SecretStore::load(&secrets.path)?;
    bootstrap_with(settings, &store, |name| std::env::var(name).ok())
}

/// Bootstrap from `store`, with `env` taking precedence
pub fn bootstrap_with(
    settings: &CalendarSettings,
    store: &SecretStore,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BootstrapReport> {
    let secret = |env_name: &str, secret_name: &str| {
        env(env_name)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| store.get(secret_name).map(str::to_string))
    };

    let credentials = materialize(
        &settings.credentials_path,
        secret(CREDENTIALS_ENV, CREDENTIALS_SECRET),
    )?;
    let token = materialize(&settings.token_path, secret(TOKEN_ENV, TOKEN_SECRET))?;

    Ok(BootstrapReport { credentials, token })
}

fn materialize(path: &str, contents: Option<String>) -> Result<BootstrapOutcome> {
    let path = Path::new(path);
    if path.exists() {
        return Ok(BootstrapOutcome::AlreadyPresent);
    }
    let Some(contents) = contents else {
        return Ok(BootstrapOutcome::NoSecret);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(contents.as_bytes())?;

    info!("Wrote {} from secret store", path.display());
    Ok(BootstrapOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &tempfile::TempDir) -> CalendarSettings {
        CalendarSettings {
            credentials_path: dir.path().join("credentials.json").display().to_string(),
            token_path: dir.path().join("token.json").display().to_string(),
            ..CalendarSettings::default()
        }
    }

    fn store(toml_str: &str) -> SecretStore {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_writes_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);
        let store = store(
            r#"
            [files]
            google_calendar_credentials = '{"installed": {}}'
            google_calendar_token = '{"token": "t"}'
            "#,
        );

        let report = bootstrap_with(&settings, &store, |_| None).unwrap();
        assert_eq!(report.credentials, BootstrapOutcome::Written);
        assert_eq!(report.token, BootstrapOutcome::Written);
        assert_eq!(
            std::fs::read_to_string(&settings.token_path).unwrap(),
            r#"{"token": "t"}"#
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&settings.token_path)
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);
        std::fs::write(&settings.token_path, "original").unwrap();
        let store = store("[files]\ngoogle_calendar_token = 'replacement'\n");

        let report = bootstrap_with(&settings, &store, |_| None).unwrap();
        assert_eq!(report.token, BootstrapOutcome::AlreadyPresent);
        assert_eq!(report.credentials, BootstrapOutcome::NoSecret);
        assert_eq!(
            std::fs::read_to_string(&settings.token_path).unwrap(),
            "original"
        );
    }

    #[test]
    fn test_env_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);
        let store = store("[files]\ngoogle_calendar_token = 'from-store'\n");

        bootstrap_with(&settings, &store, |name| {
            (name == TOKEN_ENV).then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&settings.token_path).unwrap(),
            "from-env"
        );
    }

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::load(dir.path().join("secrets.toml")).unwrap();
        assert!(store.get(TOKEN_SECRET).is_none());
    }

    #[test]
    fn test_malformed_store_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "[files\n").unwrap();
        assert!(matches!(
            SecretStore::load(&path),
            Err(CalendarError::InvalidInput(_))
        ));
    }
}
