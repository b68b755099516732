//! AirWave command handlers.

use std::io::{self, Write};

use arubafi_api::{AirWave, Backend};

use crate::cli::{AirwaveArgs, AirwaveCommand, GlobalOpts};
use crate::error::CliError;
use crate::{config, output, prompt};

pub async fn handle(args: AirwaveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut client = AirWave::new(config::connection_for(Backend::AirWave, global)?)?;
    client.comms(prompt::for_stdin().as_ref()).await?;

    let result = run(&client, args.command, global).await;
    client.close().await;
    result
}

async fn run(client: &AirWave, command: AirwaveCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        AirwaveCommand::Table { name } => {
            let table = client.get_table(name.into()).await?;
            output::print_json(&*table, global.compact)
        }
        AirwaveCommand::Raw => {
            let raw = client.raw_inventory().await?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{raw}")?;
            Ok(())
        }
        AirwaveCommand::Client { mac, controller: false } => match client.client_ap_info(&mac).await? {
            Some(info) => output::print_json(&info, global.compact),
            None => Err(CliError::Internal(format!(
                "client {mac} is not associated with any AP"
            ))),
        },
        AirwaveCommand::Client { mac, controller: true } => match client.client_controller_info(&mac).await? {
            Some(record) => output::print_json(&record, global.compact),
            None => Err(CliError::Internal(format!(
                "no controller found for client {mac}"
            ))),
        },
        AirwaveCommand::Controller { id } => match client.controller_info(&id).await? {
            Some(record) => output::print_json(&record, global.compact),
            None => Err(CliError::Internal(format!("controller {id} is not in the inventory"))),
        },
        AirwaveCommand::ControllerAps => output::print_json(&client.controllers_aps().await?, global.compact),
    }
}
