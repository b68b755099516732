//! CLI configuration: thin wrapper around `arubafi_config` that applies
//! `GlobalOpts` flag overrides (--host, --username, --insecure, ...).

use std::time::Duration;

use secrecy::SecretString;

use arubafi_api::{Backend, ConnectionConfig, TlsVerify};
use arubafi_config::{Config, config_path, load_config, profile_to_connection};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Connection settings for `backend`: the active profile if one exists,
/// else flags alone, with flags taking priority over profile values.
pub fn connection_for(backend: Backend, global: &GlobalOpts) -> Result<ConnectionConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = cfg.profile_name(global.profile.as_deref()).to_owned();

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => {
            let (configured, conn) = profile_to_connection(profile, &profile_name, &cfg.defaults)?;
            if configured != backend {
                return Err(CliError::BackendMismatch {
                    profile: profile_name,
                    configured: configured.product_name().into(),
                    requested: backend.product_name().into(),
                });
            }
            conn
        }
        None if global.profile.is_some() => return Err(profile_not_found(&cfg, &profile_name)),
        None => ConnectionConfig {
            timeout: Duration::from_secs(cfg.defaults.timeout),
            tls: if cfg.defaults.insecure {
                TlsVerify::Disabled
            } else {
                TlsVerify::Enabled
            },
            ..ConnectionConfig::default()
        },
    };

    Ok(apply_overrides(base, global))
}

/// Layer CLI flags over a profile-derived config.
pub fn apply_overrides(mut conn: ConnectionConfig, global: &GlobalOpts) -> ConnectionConfig {
    if let Some(ref host) = global.host {
        conn.host = Some(host.clone());
    }
    if let Some(ref username) = global.username {
        conn.username = Some(username.clone());
    }
    if let Some(ref password) = global.password {
        conn.password = Some(SecretString::from(password.clone()));
    }
    if let Some(ref proxy) = global.proxy {
        conn = conn.with_proxy(proxy.clone());
    }
    if let Some(ref token) = global.api_token {
        conn.api_token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        conn.tls = TlsVerify::Disabled;
    }
    if let Some(secs) = global.timeout {
        conn.timeout = Duration::from_secs(secs);
    }
    conn
}

pub fn profile_not_found(cfg: &Config, name: &str) -> CliError {
    let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    available.sort_unstable();
    CliError::ProfileNotFound {
        name: name.into(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
        path: config_path().display().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use secrecy::ExposeSecret;

    use crate::cli::Cli;

    #[test]
    fn flags_override_profile_values() {
        let cli = Cli::try_parse_from([
            "arubafi",
            "--host",
            "mm2.example.net",
            "--username",
            "ops",
            "--password",
            "pw",
            "--insecure",
            "--timeout",
            "45",
            "--proxy",
            "http://proxy.example.net:3128",
            "mm",
            "write-mem",
        ])
        .unwrap();

        let base = ConnectionConfig::new("mm1.example.net");
        let conn = apply_overrides(base, &cli.global);
        assert_eq!(conn.host.as_deref(), Some("mm2.example.net"));
        assert_eq!(conn.username.as_deref(), Some("ops"));
        assert_eq!(conn.password.unwrap().expose_secret(), "pw");
        assert_eq!(conn.tls, TlsVerify::Disabled);
        assert_eq!(conn.timeout, Duration::from_secs(45));
        assert_eq!(conn.proxy.as_deref(), Some("http://proxy.example.net:3128"));
    }

    #[test]
    fn unset_flags_keep_profile_values() {
        let cli = Cli::try_parse_from(["arubafi", "central", "get", "monitoring/v2/aps"]).unwrap();
        let base = ConnectionConfig::new("central.example.net").with_timeout(Duration::from_secs(60));
        let conn = apply_overrides(base, &cli.global);
        assert_eq!(conn.host.as_deref(), Some("central.example.net"));
        assert_eq!(conn.timeout, Duration::from_secs(60));
    }
}
