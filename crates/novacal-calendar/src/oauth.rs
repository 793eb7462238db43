//! OAuth access for the Google Calendar API
//!
//! Reads the authorized-user token file (`token.json`), refreshes the access
//! token through the token endpoint when it has expired and writes the new
//! token back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CalendarError, Result};

/// Read/write access to calendars and events
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Contents of an authorized-user token file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorizedUser {
    /// Whether the access token must be refreshed before use at `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.token.as_deref().is_none_or(str::is_empty) {
            return true;
        }
        match self.expiry.as_deref().map(DateTime::parse_from_rfc3339) {
            Some(Ok(expiry)) => {
                now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expiry.with_timezone(&Utc)
            }
            Some(Err(_)) => true,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// The token file on disk
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the token file
    pub fn load(&self) -> Result<AuthorizedUser> {
        if !self.path.exists() {
            return Err(CalendarError::Auth(format!(
                "token file '{}' not found",
                self.path.display()
            )));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents).map_err(|e| {
            CalendarError::Auth(format!(
                "token file '{}' is not a valid authorized-user token: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Write the token file, owner-only on unix before any content lands
    pub fn save(&self, user: &AuthorizedUser) -> Result<()> {
        let contents = serde_json::to_string_pretty(user)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // mode() only applies to newly created files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// A valid access token, refreshing and saving it if it has expired
    pub async fn access_token(&self, http: &Client) -> Result<String> {
        let mut user = self.load()?;

        if !user.needs_refresh(Utc::now()) {
            if let Some(token) = user.token {
                return Ok(token);
            }
        }

        debug!("Access token expired, refreshing via {}", user.token_uri);
        let token = refresh(http, &mut user).await?;
        self.save(&user)?;
        info!("Refreshed Google Calendar access token");
        Ok(token)
    }
}

async fn refresh(http: &Client, user: &mut AuthorizedUser) -> Result<String> {
    let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
        user.refresh_token.clone(),
        user.client_id.clone(),
        user.client_secret.clone(),
    ) else {
        return Err(CalendarError::Auth(
            "token expired and cannot be refreshed: refresh_token, client_id and client_secret are required"
                .to_string(),
        ));
    };

    let response = http
        .post(&user.token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!("Token refresh failed: {} - {}", status, body);
        let message = match serde_json::from_str::<RefreshError>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => format!("token refresh failed with status {}", status.as_u16()),
        };
        return Err(CalendarError::Auth(message));
    }

    let refreshed: RefreshResponse = serde_json::from_str(&body)?;
    let now = Utc::now();

    user.token = Some(refreshed.access_token.clone());
    user.expiry = refreshed
        .expires_in
        .map(|secs| (now + Duration::seconds(secs)).to_rfc3339_opts(SecondsFormat::Micros, true));
    if let Some(rotated) = refreshed.refresh_token {
        user.refresh_token = Some(rotated);
    }

    Ok(refreshed.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_token(dir: &tempfile::TempDir, value: Value) -> TokenStore {
        let path = dir.path().join("token.json");
        std::fs::write(&path, value.to_string()).unwrap();
        TokenStore::new(path)
    }

    #[test]
    fn test_missing_file_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, CalendarError::Auth(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc::now();
        let user = |token: Option<&str>, expiry: Option<String>| AuthorizedUser {
            token: token.map(str::to_string),
            refresh_token: None,
            token_uri: default_token_uri(),
            client_id: None,
            client_secret: None,
            scopes: vec![CALENDAR_SCOPE.to_string()],
            expiry,
            extra: Map::new(),
        };

        let later = (now + Duration::hours(1)).to_rfc3339();
        let earlier = (now - Duration::minutes(1)).to_rfc3339();

        assert!(!user(Some("t"), Some(later)).needs_refresh(now));
        assert!(user(Some("t"), Some(earlier)).needs_refresh(now));
        assert!(user(None, None).needs_refresh(now));
        assert!(!user(Some("t"), None).needs_refresh(now));
    }

    #[tokio::test]
    async fn test_valid_token_is_used_without_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let expiry = (Utc::now() + Duration::hours(1)).to_rfc3339();
        let store = write_token(&dir, json!({"token": "live", "expiry": expiry}));

        let token = store.access_token(&Client::new()).await.unwrap();
        assert_eq!(token, "live");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = write_token(
            &dir,
            json!({
                "token": "stale",
                "refresh_token": "r1",
                "token_uri": format!("{}/token", server.uri()),
                "client_id": "cid",
                "client_secret": "secret",
                "scopes": [CALENDAR_SCOPE],
                "expiry": "2020-01-01T00:00:00Z",
                "universe_domain": "googleapis.com"
            }),
        );

        let token = store.access_token(&Client::new()).await.unwrap();
        assert_eq!(token, "fresh");

        let saved = store.load().unwrap();
        assert_eq!(saved.token.as_deref(), Some("fresh"));
        assert_eq!(saved.refresh_token.as_deref(), Some("r1"));
        assert!(!saved.needs_refresh(Utc::now()));
        assert_eq!(saved.extra["universe_domain"], "googleapis.com");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_save_creates_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("fresh.json"));
        let user: AuthorizedUser = serde_json::from_value(json!({"token": "t"})).unwrap();

        store.save(&user).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap().token.as_deref(), Some("t"));

        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&user).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = write_token(
            &dir,
            json!({
                "refresh_token": "r1",
                "token_uri": format!("{}/token", server.uri()),
                "client_id": "cid",
                "client_secret": "secret"
            }),
        );

        let err = store.access_token(&Client::new()).await.unwrap_err();
        assert!(matches!(err, CalendarError::Auth(_)));
        assert!(err.to_string().contains("invalid_grant"));
    }
}
