//! Configuration management for the admin CLI.

use anyhow::{Context, Result};
use radmin::AdminClient;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST API base URL.
    pub api_url: Option<String>,
    /// Realtime socket URL.
    pub socket_url: Option<String>,
    /// Authentication credentials.
    pub auth: Option<AuthConfig>,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token.
    pub token: String,
    /// Admin account ID.
    pub admin_id: String,
    /// Admin username, for display.
    #[serde(default)]
    pub username: String,
}

/// Endpoint overrides from the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub api_url: Option<String>,
    pub socket_url: Option<String>,
}

/// Get the configuration file path.
pub fn config_path() -> Result<PathBuf> {
    let exe_path = env::current_exe().context("Could not determine executable path")?;
    let exe_dir = exe_path
        .parent()
        .context("Could not determine executable directory")?;

    Ok(exe_dir.join("radmin.toml"))
}

/// Load configuration from file.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path).context("Failed to read config file")?;

    toml::from_str(&content).context("Failed to parse config file")
}

/// Save configuration to file.
pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path()?;
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&path, content).context("Failed to write config file")?;

    Ok(())
}

/// Forget stored credentials. Endpoint settings are kept.
pub fn clear_auth() -> Result<()> {
    let mut config = load_config()?;
    if config.auth.take().is_some() {
        save_config(&config)?;
        tracing::info!("stored credentials cleared");
    }
    Ok(())
}

fn builder(config: &Config, endpoints: &Endpoints) -> radmin::AdminClientBuilder {
    let mut builder = AdminClient::builder();

    if let Some(url) = endpoints.api_url.as_ref().or(config.api_url.as_ref()) {
        builder = builder.base_url(url);
    }
    if let Some(url) = endpoints.socket_url.as_ref().or(config.socket_url.as_ref()) {
        builder = builder.socket_url(url);
    }

    builder
}

/// Build an admin client without credentials (for login).
pub fn build_client(endpoints: &Endpoints) -> Result<AdminClient> {
    let config = load_config()?;

    builder(&config, endpoints)
        .build()
        .context("Failed to build admin client")
}

/// Build an admin client that requires authentication.
pub fn build_authed_client(endpoints: &Endpoints) -> Result<AdminClient> {
    let config = load_config()?;

    let auth = config
        .auth
        .as_ref()
        .context("Authentication required. Run 'radmin auth login' first.")?;

    builder(&config, endpoints)
        .auth(&auth.token, auth.admin_id.as_str())
        .build()
        .context("Failed to build admin client")
}

/// Whether an error chain carries a rejected-credentials error from the backend.
pub fn is_auth_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<radmin::Error>())
        .any(|e| e.is_auth_error())
}

/// Drop stored credentials after the backend rejected them.
///
/// Returns whether `err` was such a rejection. A failure to clear is logged
/// so that the caller still reports the original error.
pub fn forget_rejected_auth(err: &anyhow::Error, clear: impl FnOnce() -> Result<()>) -> bool {
    if !is_auth_failure(err) {
        return false;
    }
    if let Err(e) = clear() {
        tracing::warn!("could not clear stored credentials: {:#}", e);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_roundtrip_shape() {
        let config: Config = toml::from_str(
            r#"
            api_url = "https://admin.example.com/api"

            [auth]
            token = "abc"
            admin_id = "1"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url.as_deref(), Some("https://admin.example.com/api"));
        assert_eq!(config.socket_url, None);
        let auth = config.auth.unwrap();
        assert_eq!(auth.admin_id, "1");
        assert_eq!(auth.username, "");
    }

    #[test]
    fn test_auth_failure_detection() {
        let err = anyhow::Error::new(radmin::Error::api(401, "jwt expired")).context("listing users");
        assert!(is_auth_failure(&err));

        let err = anyhow::Error::new(radmin::Error::api(500, "boom"));
        assert!(!is_auth_failure(&err));
        assert!(!is_auth_failure(&anyhow::anyhow!("plain")));
    }

    #[test]
    fn test_forget_rejected_auth_survives_clear_failure() {
        let rejected = anyhow::Error::new(radmin::Error::api(403, "forbidden"));
        let mut cleared = false;
        let expired = forget_rejected_auth(&rejected, || {
            cleared = true;
            anyhow::bail!("read-only file system")
        });
        assert!(expired);
        assert!(cleared);
        assert!(is_auth_failure(&rejected));

        let other = anyhow::Error::new(radmin::Error::api(500, "boom"));
        assert!(!forget_rejected_auth(&other, || panic!("must not clear")));
    }
}
