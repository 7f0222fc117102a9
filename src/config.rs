use anyhow::{Context, Result};
use restkit::{AuthScheme, GatewayConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_URL: &str = "http://localhost:8000";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("netbox-seed"))
}

/// Get the default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub netbox: NetboxSettings,
}

/// Connection settings for the NetBox API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetboxSettings {
    /// Base URL, without `/api`
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    /// Per-request timeout; the transport default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for NetboxSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            verify_tls: true,
            auth_scheme: AuthScheme::default(),
            timeout_secs: None,
        }
    }
}

/// Values given on the command line or in the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub verify_tls: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Load settings from a specific file
    ///
    /// A missing file yields default settings.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid config format: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a specific file
    ///
    /// The file may hold the API token, so it is made owner-only on Unix.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
        }

        log::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Store a token in the config file at `path`, keeping other settings
    pub fn set_token(path: &Path, url: &str, token: &str) -> Result<()> {
        let mut settings = Self::load_from(path)?;
        settings.netbox.url = url.to_string();
        settings.netbox.token = Some(token.to_string());
        settings.save_to(path)
    }

    /// Apply command-line and environment values on top of the file
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.url {
            self.netbox.url.clone_from(url);
        }
        if let Some(token) = &overrides.token {
            self.netbox.token = Some(token.clone());
        }
        if let Some(verify_tls) = overrides.verify_tls {
            self.netbox.verify_tls = verify_tls;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.netbox.timeout_secs = Some(timeout);
        }
    }

    /// Build the gateway configuration, checking URL and token
    pub fn gateway_config(&self, retries: u32) -> Result<GatewayConfig> {
        let netbox = &self.netbox;
        let url = netbox.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("NetBox URL must start with http:// or https://, got '{}'", url);
        }

        let token = netbox
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .context(
                "No API token configured \
                 (set NETBOX_TOKEN, pass --token, or run 'netbox-seed token --save')",
            )?;

        let mut config = GatewayConfig::new(url, token);
        config.auth_scheme = netbox.auth_scheme;
        config.verify_tls = netbox.verify_tls;
        config.timeout = netbox.timeout_secs.map(Duration::from_secs);
        if retries > 1 {
            config.retry = RetryConfig::new(retries, Duration::from_secs(1), 2.0);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings.netbox.url, "http://localhost:8000");
        assert!(settings.netbox.verify_tls);
        assert!(settings.netbox.token.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[netbox]\ntoken = \"abc\"\nauth_scheme = \"Bearer\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.netbox.url, "http://localhost:8000");
        assert_eq!(settings.netbox.token.as_deref(), Some("abc"));
        assert_eq!(settings.netbox.auth_scheme, AuthScheme::Bearer);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[netbox\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings::default();
        settings.apply(&Overrides {
            url: Some("https://netbox.example".into()),
            token: Some("t".into()),
            verify_tls: Some(false),
            timeout_secs: Some(5),
        });

        assert_eq!(settings.netbox.url, "https://netbox.example");
        assert!(!settings.netbox.verify_tls);

        let config = settings.gateway_config(3).unwrap();
        assert_eq!(config.token, "t");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_gateway_config_requires_token_and_scheme() {
        let mut settings = Settings::default();
        assert!(settings.gateway_config(1).is_err());

        settings.netbox.token = Some("  ".into());
        assert!(settings.gateway_config(1).is_err());

        settings.netbox.token = Some("abc".into());
        settings.netbox.url = "localhost:8000".into();
        assert!(settings.gateway_config(1).is_err());

        settings.netbox.url = "http://localhost:8000".into();
        let config = settings.gateway_config(1).unwrap();
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_set_token_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[netbox]\nverify_tls = false\ntimeout_secs = 10\n").unwrap();

        Settings::set_token(&path, "http://nb:8000", "secret").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.netbox.token.as_deref(), Some("secret"));
        assert_eq!(settings.netbox.url, "http://nb:8000");
        assert!(!settings.netbox.verify_tls);
        assert_eq!(settings.netbox.timeout_secs, Some(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        Settings::set_token(&path, "http://nb:8000", "secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
