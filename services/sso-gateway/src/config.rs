//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The SSO secret key is loaded from the SSO_SECRET_KEY env var or
//! secret_key_file, never stored in the TOML directly.

use common::Secret;
use eve_sso::{SsoEnvironment, SsoSettings};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub sso: SsoConfig,
    pub server: ServerConfig,
}

/// Application registration and environment selection
#[derive(Debug, Deserialize)]
pub struct SsoConfig {
    /// Unknown names fail deserialization, so a bad environment never
    /// survives config load.
    pub environment: SsoEnvironment,
    pub client_id: String,
    pub callback_url: String,
    /// Scopes requested on /login
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(skip)]
    pub secret_key: Option<Secret<String>>,
    /// Path to a file containing the secret key (alternative to SSO_SECRET_KEY)
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,
}

/// HTTP listener and outbound transport settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Per-request timeout for calls to the SSO and ESI hosts
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Requests served concurrently; excess requests queue
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Logins started but not yet completed; /login answers 503 beyond this
    #[serde(default = "default_max_pending_logins")]
    pub max_pending_logins: usize,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

fn default_max_pending_logins() -> usize {
    1024
}

impl SsoConfig {
    pub fn settings(&self) -> SsoSettings {
        SsoSettings {
            client_id: self.client_id.clone(),
            secret_key: self.secret_key.clone(),
            callback_url: self.callback_url.clone(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret key resolution order:
    /// 1. SSO_SECRET_KEY env var
    /// 2. secret_key_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.sso.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if !config.sso.callback_url.starts_with("http://")
            && !config.sso.callback_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "callback_url must start with http:// or https://, got: {}",
                config.sso.callback_url
            )));
        }

        if config.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.server.max_pending_logins == 0 {
            return Err(common::Error::Config(
                "max_pending_logins must be greater than 0".into(),
            ));
        }

        // Env var takes precedence over file
        if let Ok(key) = std::env::var("SSO_SECRET_KEY") {
            config.sso.secret_key = Some(Secret::new(key));
        } else if let Some(ref key_file) = config.sso.secret_key_file {
            let key = std::fs::read_to_string(key_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read secret_key_file {}: {e}",
                    key_file.display()
                ))
            })?;
            let key = key.trim().to_owned();
            if !key.is_empty() {
                config.sso.secret_key = Some(Secret::new(key));
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
        PathBuf::from("sso-gateway.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[sso]
environment = "tranquility"
client_id = "3rd-party-app"
callback_url = "http://localhost:8080/callback"
scopes = ["esi-skills.read_skills.v1", "esi-wallet.read_character_wallet.v1"]

[server]
listen_addr = "127.0.0.1:8080"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());
        unsafe { remove_env("SSO_SECRET_KEY") };

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sso.environment, SsoEnvironment::Tranquility);
        assert_eq!(config.sso.client_id, "3rd-party-app");
        assert_eq!(config.sso.scopes.len(), 2);
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.max_pending_logins, 1024);
        assert!(config.sso.secret_key.is_none());
    }

    #[test]
    fn load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn unknown_environment_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace("\"tranquility\"", "\"duality\""),
        );

        let result = Config::load(&path);
        assert!(
            matches!(result, Err(common::Error::Toml(_))),
            "unknown environment must fail at load"
        );
    }

    #[test]
    fn alternate_environments_parse() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace("\"tranquility\"", "\"serenity\""),
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.sso.environment, SsoEnvironment::Serenity);
    }

    #[test]
    fn empty_client_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace("\"3rd-party-app\"", "\"\""),
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("client_id"), "got: {err}");
    }

    #[test]
    fn callback_without_scheme_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace("http://localhost:8080/callback", "localhost/callback"),
        );

        let err = Config::load(&path).unwrap_err();
        assert!(
            err.to_string().contains("callback_url must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &format!("{}timeout_secs = 0\n", valid_toml()));

        let result = Config::load(&path);
        assert!(result.is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn server_limits_custom() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!("{}max_connections = 8\nmax_pending_logins = 16\n", valid_toml()),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.max_connections, 8);
        assert_eq!(config.server.max_pending_logins, 16);
    }

    #[test]
    fn zero_server_limits_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for field in ["max_connections", "max_pending_logins"] {
            let path = write_config(&dir, &format!("{}{field} = 0\n", valid_toml()));
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains(field), "got: {err}");
        }
    }

    #[test]
    fn secret_key_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("SSO_SECRET_KEY", "env-secret") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("SSO_SECRET_KEY") };

        assert_eq!(config.sso.secret_key.as_ref().unwrap().expose(), "env-secret");
        assert!(config.sso.settings().secret_key.is_some());
    }

    #[test]
    fn secret_key_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("secret_key");
        std::fs::write(&key_path, "file-secret\n").unwrap();
        let toml_content = valid_toml().replace(
            "scopes =",
            &format!("secret_key_file = \"{}\"\nscopes =", key_path.display()),
        );
        let path = write_config(&dir, &toml_content);

        unsafe { remove_env("SSO_SECRET_KEY") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.sso.secret_key.as_ref().unwrap().expose(), "file-secret");
    }

    #[test]
    fn secret_key_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let toml_content = valid_toml().replace(
            "scopes =",
            "secret_key_file = \"/nonexistent/secret_key\"\nscopes =",
        );
        let path = write_config(&dir, &toml_content);

        unsafe { set_env("SSO_SECRET_KEY", "env-wins") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("SSO_SECRET_KEY") };

        assert_eq!(config.sso.secret_key.as_ref().unwrap().expose(), "env-wins");
    }

    #[test]
    fn missing_secret_key_file_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let toml_content = valid_toml().replace(
            "scopes =",
            "secret_key_file = \"/nonexistent/secret_key\"\nscopes =",
        );
        let path = write_config(&dir, &toml_content);

        unsafe { remove_env("SSO_SECRET_KEY") };
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        assert_eq!(
            Config::resolve_path(Some("/cli/wins.toml")),
            PathBuf::from("/cli/wins.toml")
        );
        assert_eq!(Config::resolve_path(None), PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("sso-gateway.toml"));
    }
}
