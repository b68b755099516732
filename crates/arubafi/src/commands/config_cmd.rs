//! Config subcommand handlers.

use std::io::{self, IsTerminal, Write};

use dialoguer::{Input, Select};

use arubafi_api::Backend;
use arubafi_config::{self as config_store, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::profile_not_found;
use crate::error::CliError;

const BACKENDS: [Backend; 3] = [Backend::Mobility, Backend::AirWave, Backend::Central];

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn require_terminal(command: &str) -> Result<(), CliError> {
    if io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "interactive".into(),
            reason: format!("`config {command}` needs a terminal"),
        })
    }
}

fn read_secret(label: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

/// Ask where a secret goes. Returns the plaintext to write into the
/// profile, or `None` once it is in the keyring.
fn store_choice(profile_name: &str, kind: &str, secret: String) -> Result<Option<String>, CliError> {
    let choices = &["Store in system keyring (recommended)", "Save to config file (plaintext)"];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {kind}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config_store::store_secret(profile_name, kind, &secret)?;
        eprintln!("   ✓ {kind} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),
        ConfigCommand::SetPassword { api_token } => set_password(global, api_token),
        ConfigCommand::Profiles => {
            let cfg = config_store::load_config()?;
            let mut stdout = io::stdout().lock();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: arubafi config init");
            }
            let default = cfg.profile_name(None);
            let mut names: Vec<_> = cfg.profiles.iter().collect();
            names.sort_unstable_by(|a, b| a.0.cmp(b.0));
            for (name, profile) in names {
                let marker = if name == default { " *" } else { "" };
                writeln!(stdout, "{name}\t{}\t{}{marker}", profile.backend, profile.host)?;
            }
            Ok(())
        }
        ConfigCommand::Path => {
            writeln!(io::stdout().lock(), "{}", config_store::config_path().display())?;
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    require_terminal("init")?;
    let mut cfg = config_store::load_config()?;
    let path = config_store::config_path();
    eprintln!("arubafi configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let labels: Vec<&str> = BACKENDS.iter().map(|b| b.product_name()).collect();
    let backend = BACKENDS[Select::new()
        .with_prompt("Backend")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(prompt_err)?];

    let host: String = Input::new()
        .with_prompt(format!("{} host", backend.product_name()))
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        backend: backend.to_string(),
        host,
        ..Profile::default()
    };

    let use_token = backend == Backend::Central
        && Select::new()
            .with_prompt("Authentication method")
            .items(&["Pre-issued API token", "Username/Password"])
            .default(0)
            .interact()
            .map_err(prompt_err)?
            == 0;

    if use_token {
        let token = read_secret("API token")?;
        profile.api_token = store_choice(&profile_name, "api-token", token)?;
    } else {
        let username: String = Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?;
        profile.username = Some(username);
        let password = read_secret("Password")?;
        profile.password = store_choice(&profile_name, "password", password)?;
    }

    if backend == Backend::Mobility {
        let scope: String = Input::new()
            .with_prompt("Default config path")
            .default("/md".into())
            .interact_text()
            .map_err(prompt_err)?;
        profile.scope = Some(scope);
    }

    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.profiles.len() == 1 {
        cfg.default_profile = Some(profile_name.clone());
    }
    config_store::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Profile: {profile_name}");
    Ok(())
}

fn set_password(global: &GlobalOpts, api_token: bool) -> Result<(), CliError> {
    let cfg: Config = config_store::load_config()?;
    let profile_name = cfg.profile_name(global.profile.as_deref()).to_owned();
    if !cfg.profiles.contains_key(&profile_name) {
        return Err(profile_not_found(&cfg, &profile_name));
    }
    require_terminal("set-password")?;

    let (kind, label) = if api_token {
        ("api-token", "API token")
    } else {
        ("password", "Password")
    };
    let secret = read_secret(label)?;
    config_store::store_secret(&profile_name, kind, &secret)?;

    eprintln!("✓ {label} stored in system keyring for profile '{profile_name}'");
    Ok(())
}
