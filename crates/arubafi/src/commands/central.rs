//! Central command handlers.

use arubafi_api::{Backend, CentralClient};

use crate::cli::{CentralArgs, CentralCommand, GlobalOpts};
use crate::error::CliError;
use crate::{config, output, prompt};

pub async fn handle(args: CentralArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut client = CentralClient::new(config::connection_for(Backend::Central, global)?)?;
    client.comms(prompt::for_stdin().as_ref()).await?;

    match args.command {
        CentralCommand::Get { path, params } => {
            let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let document = client.get(&path, &params).await?;
            output::print_json(&document.data, global.compact)
        }
    }
}
