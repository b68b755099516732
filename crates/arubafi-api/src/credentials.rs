// Credential resolution.
//
// Fills in whatever the caller left out of a ConnectionConfig (host,
// username, password) by asking a Prompter. The library never talks to a
// terminal itself; the CLI supplies an interactive prompter, everything
// else gets `NonInteractive`.

use secrecy::SecretString;
use tracing::debug;

use crate::auth::Backend;
use crate::config::ConnectionConfig;
use crate::error::Error;

/// Source of missing connection attributes.
pub trait Prompter: Send + Sync {
    /// Ask for a line of text.
    fn input(&self, prompt: &str) -> Result<String, Error>;

    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, Error>;

    /// Ask for a secret without echoing it.
    fn password(&self, prompt: &str) -> Result<SecretString, Error>;
}

/// A prompter that refuses every question.
///
/// Use it for unattended runs: a missing attribute becomes a
/// configuration error instead of a hang on stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl NonInteractive {
    fn refuse(prompt: &str) -> Error {
        Error::Configuration {
            message: format!("{prompt} (no interactive prompt available)"),
        }
    }
}

impl Prompter for NonInteractive {
    fn input(&self, prompt: &str) -> Result<String, Error> {
        Err(Self::refuse(prompt))
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, Error> {
        Err(Self::refuse(prompt))
    }

    fn password(&self, prompt: &str) -> Result<SecretString, Error> {
        Err(Self::refuse(prompt))
    }
}

/// Fill every missing required attribute of `config` through `prompter`.
///
/// Attributes already set are never asked for again. For Central a
/// pre-issued API token makes username and password optional.
pub fn resolve(
    backend: Backend,
    mut config: ConnectionConfig,
    prompter: &dyn Prompter,
) -> Result<ConnectionConfig, Error> {
    let product = backend.product_name();

    if config.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
        let host = prompter.input(&format!("{product} URL or IP required"))?;
        config.host = Some(non_empty(host, "host")?);
    }

    if backend == Backend::Central && config.api_token.is_some() {
        debug!(host = ?config.host, "using pre-issued API token");
        return Ok(config);
    }

    let username = match config.username.take().filter(|u| !u.trim().is_empty()) {
        Some(username) => username,
        None => {
            let offered = system_username()
                .map(|user| {
                    prompter
                        .confirm(&format!("{product} username required. Use `{user}`?"), true)
                        .map(|accepted| accepted.then_some(user))
                })
                .transpose()?
                .flatten();
            match offered {
                Some(user) => user,
                None => non_empty(prompter.input(&format!("{product} username"))?, "username")?,
            }
        }
    };

    if config.password.is_none() {
        config.password = Some(prompter.password(&format!("{product} password for `{username}` required"))?);
    }

    debug!(host = ?config.host, %username, "connection attributes resolved");
    config.username = Some(username);
    Ok(config)
}

fn non_empty(value: String, what: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Configuration {
            message: format!("{what} must not be empty"),
        });
    }
    Ok(trimmed.to_owned())
}

/// The login name of the current OS user, if the environment has one.
fn system_username() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use secrecy::ExposeSecret;

    use super::*;

    /// Answers prompts from a script and records what was asked.
    #[derive(Default)]
    struct Scripted {
        inputs: Mutex<VecDeque<String>>,
        confirm: bool,
        asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(inputs: &[&str], confirm: bool) -> Self {
            Self {
                inputs: Mutex::new(inputs.iter().map(|s| (*s).to_owned()).collect()),
                confirm,
                asked: Mutex::default(),
            }
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }

        fn next(&self, prompt: &str) -> String {
            self.asked.lock().unwrap().push(prompt.to_owned());
            self.inputs.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    impl Prompter for Scripted {
        fn input(&self, prompt: &str) -> Result<String, Error> {
            Ok(self.next(prompt))
        }

        fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, Error> {
            self.asked.lock().unwrap().push(prompt.to_owned());
            Ok(self.confirm)
        }

        fn password(&self, prompt: &str) -> Result<SecretString, Error> {
            Ok(SecretString::from(self.next(prompt)))
        }
    }

    #[test]
    fn complete_config_asks_nothing() {
        let config = ConnectionConfig::new("mm.example.net")
            .with_credentials("admin", SecretString::from("pw"));
        let prompter = Scripted::default();
        let resolved = resolve(Backend::Mobility, config, &prompter).unwrap();
        assert!(prompter.asked().is_empty());
        assert_eq!(resolved.username.as_deref(), Some("admin"));
    }

    #[test]
    fn missing_fields_are_prompted_in_order() {
        let mut config = ConnectionConfig::default();
        config.username = Some("netops".into());
        let prompter = Scripted::new(&["  amp.example.net ", "hunter2"], false);
        let resolved = resolve(Backend::AirWave, config, &prompter).unwrap();

        assert_eq!(resolved.host.as_deref(), Some("amp.example.net"));
        assert_eq!(resolved.password.unwrap().expose_secret(), "hunter2");
        let asked = prompter.asked();
        assert_eq!(asked.len(), 2);
        assert!(asked[0].contains("AirWave URL or IP"));
        assert!(asked[1].contains("`netops`"));
    }

    #[test]
    fn declined_system_user_falls_back_to_input() {
        let config = ConnectionConfig::new("mm.example.net");
        // With no USER in the environment the confirm step is skipped and
        // the first scripted input is the username either way.
        let prompter = Scripted::new(&["operator", "pw"], false);
        let resolved = resolve(Backend::Mobility, config, &prompter).unwrap();
        assert_eq!(resolved.username.as_deref(), Some("operator"));
    }

    #[test]
    fn central_token_skips_credentials() {
        let config = ConnectionConfig::new("apigw.central.example.net")
            .with_api_token(SecretString::from("tok"));
        let resolved = resolve(Backend::Central, config, &NonInteractive).unwrap();
        assert!(resolved.username.is_none());
    }

    #[test]
    fn non_interactive_fails_with_configuration_error() {
        let err = resolve(Backend::Mobility, ConnectionConfig::default(), &NonInteractive).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn empty_answer_is_rejected() {
        let prompter = Scripted::new(&["   "], false);
        let err = resolve(Backend::Mobility, ConnectionConfig::default(), &prompter).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
