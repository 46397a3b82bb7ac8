use std::path::Path;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use entity_client::config::loader::file_to_config;
use entity_client::entities::client::EntityClient;
use entity_client::entities::routes::Query;
use entity_client::observability::metrics::get_metrics;
use entity_client::utils::logging::{self, LogLevel};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "entity-client.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List rows of an entity
    List {
        entity: String,
        /// filter as key=value, repeatable
        #[arg(short, long, value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
    /// Fetch one row
    Get { entity: String, row: String },
    /// Show the property schema of an entity
    Properties { entity: String },
    /// Translate an enum value to its label
    EnumLabel { entity: String, property: String, value: String },
    /// Print the client metrics, optionally after listing an entity
    Metrics {
        #[arg(short, long)]
        entity: Option<String>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let client_config = file_to_config(Path::new(&args.config)).await?;
    logging::init_logging(&logging::resolve(Some(&client_config), args.log_level));

    // -------------------------------
    // 2. Build client and credentials
    // -------------------------------

    let client = EntityClient::from_config(&client_config)?;
    client.initialize().await?;
    info!(tenant_id = client.tenant_id(), "client ready");

    // -------------------------------
    // 3. Run command
    // -------------------------------

    let output = match args.command {
        Command::List { entity, query } => {
            let query: Query = query.into_iter().collect();
            let query = (!query.is_empty()).then_some(query);
            client.list(&entity, query.as_ref()).await?
        }
        Command::Get { entity, row } => client.get(&entity, &row).await?,
        Command::Properties { entity } => {
            serde_json::to_value(client.get_entity_properties(&entity).await?)?
        }
        Command::EnumLabel { entity, property, value } => {
            client.get_enum_label_from_str(&entity, &property, &value).await
        }
        Command::Metrics { entity } => {
            if let Some(entity) = entity {
                let listed = client.list(&entity, None).await;
                info!(entity, ok = listed.is_ok(), "list finished");
            }
            Value::String(get_metrics().await.gather()?)
        }
    };

    match output {
        Value::String(text) => println!("{}", text),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}
