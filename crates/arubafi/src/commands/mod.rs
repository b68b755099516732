//! Command dispatch: backend commands build the client, establish the
//! session, and hand off to the per-backend handler; `config` works on the
//! profile file alone.

pub mod airwave;
pub mod central;
pub mod config_cmd;
pub mod mm;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Mm(args) => mm::handle(args, global).await,
        Command::Airwave(args) => airwave::handle(args, global).await,
        Command::Central(args) => central::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
    }
}
