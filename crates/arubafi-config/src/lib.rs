//! Shared configuration for the arubafi CLI and other consumers.
//!
//! TOML profiles (one per backend instance), secret resolution
//! (env + keyring + plaintext), and translation to
//! `arubafi_api::ConnectionConfig`. Secrets that cannot be found stay
//! unset so the credential resolver can prompt for them later.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use arubafi_api::{Backend, ConnectionConfig, TlsVerify};

/// Keyring service under which secrets are stored.
pub const KEYRING_SERVICE: &str = "arubafi";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    arubafi_api::config::DEFAULT_TIMEOUT.as_secs()
}

/// One backend instance.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// "mobility", "airwave" or "central".
    pub backend: String,

    /// FQDN or IP, optionally with scheme and port.
    pub host: String,

    pub port: Option<u16>,

    pub username: Option<String>,

    /// Plaintext password. Prefer the keyring or `password_env`.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Pre-issued Central API token (plaintext).
    pub api_token: Option<String>,

    /// Environment variable holding the Central API token.
    pub api_token_env: Option<String>,

    /// OAuth client for the Central password grant.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// API version prefix override (Mobility Master).
    pub api_version: Option<String>,

    /// Default config scope (Mobility Master), e.g. "/md/campus".
    pub scope: Option<String>,

    pub proxy: Option<String>,

    /// Custom CA bundle (PEM).
    pub ca_cert: Option<PathBuf>,

    /// Override `defaults.insecure`.
    pub insecure: Option<bool>,

    /// Override `defaults.timeout`.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "arubafi", "arubafi").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("arubafi");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path`, layered over defaults and under
/// `ARUBAFI_`-prefixed environment variables (`__` separates keys, as in
/// `ARUBAFI_PROFILES__LAB__HOST`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ARUBAFI_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Write the config to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Look a secret up through the chain: named env var, then the system
/// keyring entry `<profile>/<kind>`, then the plaintext config value.
pub fn resolve_secret(
    profile_name: &str,
    kind: &str,
    env_name: Option<&str>,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    // 1. Env var
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            debug!(profile = profile_name, kind, "secret taken from environment");
            return Some(SecretString::from(val));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{kind}")) {
        if let Ok(secret) = entry.get_password() {
            debug!(profile = profile_name, kind, "secret taken from keyring");
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    plaintext.map(|value| SecretString::from(value.to_owned()))
}

/// Store a secret in the system keyring under `<profile>/<kind>`.
pub fn store_secret(profile_name: &str, kind: &str, secret: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{kind}"))
        .and_then(|entry| entry.set_password(secret))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Name of the profile to use: the explicit one, else `default_profile`.
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownProfile {
            profile: name.into(),
        })
    }

    /// Backend and connection settings for the named profile, with
    /// `defaults` applied.
    pub fn connection(&self, name: &str) -> Result<(Backend, ConnectionConfig), ConfigError> {
        profile_to_connection(self.profile(name)?, name, &self.defaults)
    }
}

/// Build a `ConnectionConfig` from a profile. Secrets are resolved
/// through [`resolve_secret`]; anything missing stays `None`.
pub fn profile_to_connection(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<(Backend, ConnectionConfig), ConfigError> {
    let backend: Backend = profile.backend.parse().map_err(|_| ConfigError::Validation {
        field: "backend".into(),
        reason: format!(
            "expected 'mobility', 'airwave', or 'central', got '{}'",
            profile.backend
        ),
    })?;

    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerify::Disabled
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerify::CustomCa(ca_path.clone())
    } else {
        TlsVerify::Enabled
    };

    let password = resolve_secret(
        profile_name,
        "password",
        profile.password_env.as_deref(),
        profile.password.as_deref(),
    );
    let api_token = if backend == Backend::Central {
        resolve_secret(
            profile_name,
            "api-token",
            profile.api_token_env.as_deref(),
            profile.api_token.as_deref(),
        )
    } else {
        None
    };
    let client_secret = profile
        .client_secret
        .as_deref()
        .map(|secret| SecretString::from(secret.to_owned()));

    let config = ConnectionConfig {
        host: Some(profile.host.clone()),
        username: profile.username.clone(),
        password,
        port: profile.port,
        proxy: profile.proxy.clone(),
        api_version: profile.api_version.clone(),
        default_scope: profile.scope.clone(),
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        api_token,
        client_id: profile.client_id.clone(),
        client_secret,
    };
    Ok((backend, config))
}
