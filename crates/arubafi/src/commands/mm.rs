//! Mobility Master command handlers.

use tracing::warn;

use arubafi_api::{Backend, MmClient, ObjectQuery};

use crate::cli::{GlobalOpts, MmArgs, MmCommand, MmGetArgs, MmPostArgs};
use crate::error::CliError;
use crate::{config, output, prompt};

use super::util;

pub async fn handle(args: MmArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut client = MmClient::new(config::connection_for(Backend::Mobility, global)?)?;
    client.comms(prompt::for_stdin().as_ref()).await?;

    let result = run(&client, args.command, global).await;

    // Release the UID even when the call failed.
    if let Err(e) = client.logout().await {
        warn!(error = %e, "logout failed");
    }
    result
}

async fn run(client: &MmClient, command: MmCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let document = match command {
        MmCommand::Get(get) => {
            let endpoint = util::object_endpoint(&get.object);
            client.object(&endpoint, None, get_query(get)).await?
        }
        MmCommand::Post(post) => post_object(client, post).await?,
        MmCommand::WriteMem { config_path } => client.write_memory(config_path.as_deref()).await?,
    };
    output::print_json(&document.data, global.compact)
}

fn get_query(args: MmGetArgs) -> ObjectQuery {
    ObjectQuery {
        config_path: args.config_path,
        profile_name: args.name,
        filter_op: args.op.map(Into::into),
        filter: args.filter,
        limit: args.limit,
        offset: args.offset,
        sort: args.sort,
        ..ObjectQuery::default()
    }
}

async fn post_object(client: &MmClient, args: MmPostArgs) -> Result<arubafi_api::ResponseDocument, CliError> {
    let payload = match (&args.data, &args.from_file) {
        (Some(raw), _) => util::parse_json(raw, "data")?,
        (None, Some(path)) => util::read_json_file(path)?,
        (None, None) => {
            return Err(CliError::Validation {
                field: "data".into(),
                reason: "a payload is required (--data or --from-file)".into(),
            });
        }
    };
    let query = ObjectQuery {
        config_path: args.config_path,
        ..ObjectQuery::default()
    };
    Ok(client
        .object(&util::object_endpoint(&args.object), Some(payload), query)
        .await?)
}
