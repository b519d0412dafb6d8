//! Configuration types and loading
//!
//! The file path comes from `--config`, then CONFIG_PATH, then `keeper.toml`.
//! Every setting is read from that file, falling back to the Keeper defaults.
//! The client secret is the exception: it comes from KEEPER_CLIENT_SECRET or
//! client_secret_file, never from the TOML itself.

use std::path::{Path, PathBuf};

use common::Secret;
use keeper_auth::{
    Credentials, DEFAULT_API_SITE, DEFAULT_AUTH_PATH, DEFAULT_AUTH_SITE, DEFAULT_TOKEN_PATH,
};
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub keeper: KeeperConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// OAuth client and endpoint settings
#[derive(Debug, Deserialize)]
pub struct KeeperConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to KEEPER_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_auth_site")]
    pub auth_site: String,
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_api_site")]
    pub api_site: String,
    /// Where the notification listener persists the credential record
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_auth_site() -> String {
    DEFAULT_AUTH_SITE.to_string()
}

fn default_auth_path() -> String {
    DEFAULT_AUTH_PATH.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_api_site() -> String {
    DEFAULT_API_SITE.to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("keeper-credentials.json")
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. KEEPER_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.keeper.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        for (name, site) in [
            ("auth_site", &config.keeper.auth_site),
            ("api_site", &config.keeper.api_site),
        ] {
            if !site.starts_with("http://") && !site.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {site}"
                )));
            }
        }

        for (name, route) in [
            ("auth_path", &config.keeper.auth_path),
            ("token_path", &config.keeper.token_path),
        ] {
            if !route.starts_with('/') {
                return Err(common::Error::Config(format!(
                    "{name} must start with /, got: {route}"
                )));
            }
        }

        if config.http.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("KEEPER_CLIENT_SECRET") {
            config.keeper.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.keeper.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.keeper.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("keeper.toml")
    }

    /// Credential record to start from.
    ///
    /// Tokens come from the stored record when there is one; endpoints and
    /// client identity always come from this config. The configured secret
    /// wins over a stored one, and one of the two must exist.
    pub fn credentials(&self, stored: Option<Credentials>) -> common::Result<Credentials> {
        let secret = match (&self.keeper.client_secret, &stored) {
            (Some(secret), _) => secret.clone(),
            (None, Some(stored)) if !stored.client_secret.is_empty() => {
                stored.client_secret.clone()
            }
            _ => {
                return Err(common::Error::Config(
                    "client secret missing: set KEEPER_CLIENT_SECRET or client_secret_file".into(),
                ));
            }
        };

        let mut credentials = match stored {
            Some(stored) if stored.client_id == self.keeper.client_id => stored,
            _ => Credentials::new(self.keeper.client_id.clone(), secret.clone()),
        };
        credentials.client_secret = secret;
        credentials.auth_site = self.keeper.auth_site.clone();
        credentials.auth_path = self.keeper.auth_path.clone();
        credentials.token_path = self.keeper.token_path.clone();
        credentials.api_site = self.keeper.api_site.clone();
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn minimal_toml() -> &'static str {
        r#"
[keeper]
client_id = "node-red"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("keeper.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());
        unsafe { remove_env("KEEPER_CLIENT_SECRET") };

        let config = Config::load(&path).unwrap();
        assert_eq!(config.keeper.client_id, "node-red");
        assert_eq!(config.keeper.auth_site, DEFAULT_AUTH_SITE);
        assert_eq!(config.keeper.token_path, DEFAULT_TOKEN_PATH);
        assert_eq!(config.keeper.api_site, DEFAULT_API_SITE);
        assert_eq!(
            config.keeper.credentials_path,
            PathBuf::from("keeper-credentials.json")
        );
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.keeper.client_secret.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/keeper.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_client_secret_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        unsafe { set_env("KEEPER_CLIENT_SECRET", "env-secret") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.keeper.client_secret.as_ref().unwrap().expose(),
            "env-secret"
        );
        unsafe { remove_env("KEEPER_CLIENT_SECRET") };
    }

    #[test]
    fn test_client_secret_from_file_is_trimmed() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "file-secret\n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                r#"
[keeper]
client_id = "node-red"
client_secret_file = "{}"
"#,
                secret_path.display()
            ),
        );

        unsafe { remove_env("KEEPER_CLIENT_SECRET") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.keeper.client_secret.as_ref().unwrap().expose(),
            "file-secret"
        );
    }

    #[test]
    fn test_client_secret_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[keeper]
client_id = "node-red"
client_secret_file = "/nonexistent/secret"
"#,
        );

        unsafe { set_env("KEEPER_CLIENT_SECRET", "env-wins") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.keeper.client_secret.as_ref().unwrap().expose(),
            "env-wins",
            "KEEPER_CLIENT_SECRET must take precedence over client_secret_file"
        );
        unsafe { remove_env("KEEPER_CLIENT_SECRET") };
    }

    #[test]
    fn test_missing_secret_file_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[keeper]
client_id = "node-red"
client_secret_file = "/nonexistent/secret"
"#,
        );

        unsafe { remove_env("KEEPER_CLIENT_SECRET") };
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_invalid_sites_and_paths_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = write_config(
            &dir,
            r#"
[keeper]
client_id = "node-red"
api_site = "api.nunux.org/keeper"
"#,
        );
        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("api_site must start with http"),
            "error message should explain the issue, got: {err}"
        );

        let path = write_config(
            &dir,
            r#"
[keeper]
client_id = "node-red"
token_path = "token"
"#,
        );
        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("token_path must start with /"), "got: {err}");
    }

    #[test]
    fn test_empty_client_id_and_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = write_config(&dir, "[keeper]\nclient_id = \"  \"\n");
        assert!(Config::load(&path).is_err(), "blank client_id must be rejected");

        let path = write_config(
            &dir,
            "[keeper]\nclient_id = \"c\"\n\n[http]\ntimeout_secs = 0\n",
        );
        assert!(Config::load(&path).is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn test_resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/keeper.toml") };
        assert_eq!(
            Config::resolve_path(Some("/cli/keeper.toml")),
            PathBuf::from("/cli/keeper.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("/env/keeper.toml")
        );
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("keeper.toml"));
    }

    fn config_with_secret(secret: Option<&str>) -> Config {
        let mut config: Config = toml::from_str(
            r#"
[keeper]
client_id = "node-red"
api_site = "https://keeper.example/api"
"#,
        )
        .unwrap();
        config.keeper.client_secret = secret.map(Secret::from);
        config
    }

    #[test]
    fn test_credentials_keep_stored_tokens_but_take_config_endpoints() {
        let config = config_with_secret(Some("s"));
        let mut stored = Credentials::new("node-red", "old-secret");
        stored.api_site = "http://stale.example".into();
        stored.access_token = Some("AT".into());
        stored.refresh_token = Some("RT".into());
        stored.expire_time = Some(42);

        let creds = config.credentials(Some(stored)).unwrap();
        assert_eq!(creds.access_token(), Some("AT"));
        assert_eq!(creds.refresh_token(), Some("RT"));
        assert_eq!(creds.expire_time, Some(42));
        assert_eq!(creds.api_site, "https://keeper.example/api");
        assert_eq!(creds.client_secret.expose(), "s");
    }

    #[test]
    fn test_credentials_for_another_client_are_discarded() {
        let config = config_with_secret(Some("s"));
        let mut stored = Credentials::new("other-client", "x");
        stored.access_token = Some("AT".into());

        let creds = config.credentials(Some(stored)).unwrap();
        assert_eq!(creds.client_id, "node-red");
        assert!(creds.access_token().is_none());
    }

    #[test]
    fn test_credentials_fall_back_to_stored_secret() {
        let config = config_with_secret(None);
        let creds = config
            .credentials(Some(Credentials::new("node-red", "stored-secret")))
            .unwrap();
        assert_eq!(creds.client_secret.expose(), "stored-secret");

        assert!(config.credentials(None).is_err());
    }
}
