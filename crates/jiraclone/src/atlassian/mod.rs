use std::path::{Path, PathBuf};

use crate::prelude::*;

pub mod jira;

/// Jira configuration from environment variables
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

impl JiraConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| eyre!("{name} environment variable not set"))
        };

        Ok(Self {
            base_url: var("JIRA_BASE_URL")?.trim_end_matches('/').to_string(),
            email: var("JIRA_EMAIL")?,
            api_token: var("JIRA_API_TOKEN")?,
        })
    }

    fn basic_auth(&self) -> Result<reqwest::header::HeaderValue> {
        use base64::Engine;

        let auth_string = format!("{}:{}", self.email, self.api_token);
        let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);

        reqwest::header::HeaderValue::from_str(&format!("Basic {auth_encoded}"))
            .map_err(|e| eyre!("Invalid header value: {}", e))
    }
}

/// Load a `.env` file into the process environment.
///
/// An explicit `path` must exist. Without one, `.env` in the current directory
/// (or a parent) is loaded when present. Variables already set are not overridden.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::EnvFileNotFound(path.to_path_buf()).into());
            }
            dotenvy::from_path(path)
                .map_err(|e| eyre!("Failed to load {}: {e}", path.display()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(eyre!("Failed to load .env: {e}")),
        },
    }
}

/// The one `.env` file to load: `--env`, then a settings file's `env`.
///
/// `None` means the default `.env` lookup of [`load_env_file`].
pub fn resolve_env_file(cli: Option<&Path>, settings: Option<&str>) -> Option<PathBuf> {
    cli.map(Path::to_path_buf)
        .or_else(|| settings.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
}

/// Create an authenticated HTTP client with Basic Auth headers
pub fn create_authenticated_client(config: &JiraConfig) -> Result<reqwest::Client> {
    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, config.basic_auth()?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

/// Client for multipart uploads: no JSON Content-Type, and the XSRF bypass header Jira requires.
pub fn create_upload_client(config: &JiraConfig) -> Result<reqwest::Client> {
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, config.basic_auth()?);
    headers.insert(
        HeaderName::from_static("x-atlassian-token"),
        HeaderValue::from_static("no-check"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| eyre!("Failed to build upload client: {e}"))
}

/// Both HTTP clients plus the base URL every Jira call is made against.
#[derive(Debug, Clone)]
pub struct JiraSession {
    pub client: reqwest::Client,
    pub upload_client: reqwest::Client,
    pub base_url: String,
}

impl JiraSession {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        Ok(Self {
            client: create_authenticated_client(config)?,
            upload_client: create_upload_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&JiraConfig::from_env()?)
    }

    /// `{base_url}/rest/api/3/{path}`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/3/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Check that an HTTP response was successful, returning a descriptive error otherwise.
pub async fn check_response(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(eyre!("{context} [{status}]: {body}"))
}
