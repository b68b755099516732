//! Clap derive structures for the `arubafi` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use arubafi_api::{FilterOp, TableName};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// arubafi -- query Aruba Mobility Master, AirWave, and Central
#[derive(Debug, Parser)]
#[command(
    name = "arubafi",
    version,
    about = "Query Aruba network management APIs from the command line",
    long_about = "Talks to Aruba Mobility Master (AOS 8), AirWave, and Central.\n\n\
        Connection settings come from a profile in the config file, from\n\
        flags, or are prompted for when running in a terminal.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "ARUBAFI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Host name or IP (overrides profile)
    #[arg(long, short = 'H', env = "ARUBAFI_HOST", global = true)]
    pub host: Option<String>,

    /// Username (overrides profile)
    #[arg(long, short = 'u', env = "ARUBAFI_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password
    #[arg(long, env = "ARUBAFI_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Central API token
    #[arg(long, env = "ARUBAFI_API_TOKEN", global = true, hide_env_values = true)]
    pub api_token: Option<String>,

    /// HTTP(S) proxy URL (overrides profile)
    #[arg(long, env = "ARUBAFI_PROXY", global = true)]
    pub proxy: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "ARUBAFI_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "ARUBAFI_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Single-line JSON output
    #[arg(long, global = true)]
    pub compact: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mobility Master configuration API
    #[command(alias = "mobility")]
    Mm(MmArgs),

    /// AirWave inventory and client lookups
    #[command(alias = "amp")]
    Airwave(AirwaveArgs),

    /// Aruba Central REST API
    Central(CentralArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),
}

// ── Mobility Master ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MmArgs {
    #[command(subcommand)]
    pub command: MmCommand,
}

#[derive(Debug, Subcommand)]
pub enum MmCommand {
    /// Read a configuration object (e.g. ap_group, ssid_prof)
    Get(MmGetArgs),

    /// Send a configuration object
    Post(MmPostArgs),

    /// Persist pending configuration
    #[command(name = "write-mem")]
    WriteMem {
        /// Config path to write (default: the profile's scope)
        #[arg(long)]
        config_path: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct MmGetArgs {
    /// Object name or full endpoint path
    pub object: String,

    /// Match objects by profile name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Operator for --name
    #[arg(long, value_enum, requires = "name")]
    pub op: Option<FilterOpArg>,

    /// Raw filter expression (overrides --name)
    #[arg(long)]
    pub filter: Option<String>,

    /// Config path, e.g. /md/campus
    #[arg(long)]
    pub config_path: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub offset: Option<u32>,

    /// Sort expression, e.g. "+profile-name"
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Debug, Args)]
pub struct MmPostArgs {
    /// Object name or full endpoint path
    pub object: String,

    /// JSON payload
    #[arg(long, short = 'd', conflicts_with = "from_file")]
    pub data: Option<String>,

    /// Read the JSON payload from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,

    /// Config path, e.g. /md/campus
    #[arg(long)]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FilterOpArg {
    Eq,
    Neq,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl From<FilterOpArg> for FilterOp {
    fn from(op: FilterOpArg) -> Self {
        match op {
            FilterOpArg::Eq => FilterOp::Eq,
            FilterOpArg::Neq => FilterOp::Neq,
            FilterOpArg::In => FilterOp::In,
            FilterOpArg::Nin => FilterOp::Nin,
            FilterOpArg::Gt => FilterOp::Gt,
            FilterOpArg::Gte => FilterOp::Gte,
            FilterOpArg::Lt => FilterOp::Lt,
            FilterOpArg::Lte => FilterOp::Lte,
        }
    }
}

// ── AirWave ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AirwaveArgs {
    #[command(subcommand)]
    pub command: AirwaveCommand,
}

#[derive(Debug, Subcommand)]
pub enum AirwaveCommand {
    /// Print one inventory table
    Table {
        #[arg(value_enum)]
        name: TableArg,
    },

    /// Print the inventory XML as returned by AirWave
    Raw,

    /// Find the AP a client is associated with
    Client {
        /// Client MAC address
        mac: String,

        /// Print the record of the AP's controller instead
        #[arg(long)]
        controller: bool,
    },

    /// Print the inventory record of a controller
    Controller {
        /// Controller id
        id: String,
    },

    /// Controller FQDN to the names of its APs
    ControllerAps,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TableArg {
    Controllers,
    NoPtrControllers,
    IapVirtualControllers,
    ControllerAps,
    ApControllers,
    ControllerlessAps,
    AllItems,
}

impl From<TableArg> for TableName {
    fn from(table: TableArg) -> Self {
        match table {
            TableArg::Controllers => TableName::Controllers,
            TableArg::NoPtrControllers => TableName::NoPtrControllers,
            TableArg::IapVirtualControllers => TableName::IapVirtualControllers,
            TableArg::ControllerAps => TableName::ControllerAps,
            TableArg::ApControllers => TableName::ApControllers,
            TableArg::ControllerlessAps => TableName::ControllerlessAps,
            TableArg::AllItems => TableName::AllItems,
        }
    }
}

// ── Central ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CentralArgs {
    #[command(subcommand)]
    pub command: CentralCommand,
}

#[derive(Debug, Subcommand)]
pub enum CentralCommand {
    /// GET an API path, e.g. monitoring/v2/aps
    Get {
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "param", short = 'q', value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile interactively
    Init,

    /// Store a profile's password (or Central API token) in the system keyring
    #[command(name = "set-password")]
    SetPassword {
        /// Store the Central API token instead of the password
        #[arg(long)]
        api_token: bool,
    },

    /// List configured profiles
    Profiles,

    /// Print the config file path
    Path,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn key_value_parsing() {
        assert_eq!(parse_key_value("group=campus").unwrap(), ("group".into(), "campus".into()));
        assert_eq!(parse_key_value("q=a=b").unwrap(), ("q".into(), "a=b".into()));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn parses_mm_get() {
        let cli = Cli::try_parse_from([
            "arubafi", "mm", "get", "ap_group", "--name", "default", "--config-path", "/md/campus",
        ])
        .unwrap();
        match cli.command {
            Command::Mm(MmArgs {
                command: MmCommand::Get(args),
            }) => {
                assert_eq!(args.object, "ap_group");
                assert_eq!(args.name.as_deref(), Some("default"));
                assert_eq!(args.config_path.as_deref(), Some("/md/campus"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_airwave_client_controller() {
        let cli = Cli::try_parse_from(["arubafi", "airwave", "client", "aa:bb:cc:dd:ee:ff", "--controller"]).unwrap();
        match cli.command {
            Command::Airwave(AirwaveArgs {
                command: AirwaveCommand::Client { mac, controller },
            }) => {
                assert_eq!(mac, "aa:bb:cc:dd:ee:ff");
                assert!(controller);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
