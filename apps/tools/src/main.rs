use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::domain::CitizenRecord;
use storage::{CitizenStore, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/citizens.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a citizen given as a JSON object.
    Add { json: String },
    List,
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Add { json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("citizen must be valid JSON")?;
            let record = CitizenRecord::try_from(value).map_err(anyhow::Error::msg)?;
            let citizen = storage.save(record).await?;
            println!("created citizen_id={}", citizen.citizen_id.0);
        }
        Command::List => {
            for citizen in storage.list_all().await? {
                println!(
                    "{}\t{}\t{}",
                    citizen.citizen_id.0,
                    citizen.created_at.to_rfc3339(),
                    serde_json::to_string(&citizen.record)?
                );
            }
        }
        Command::Count => {
            println!("{}", storage.citizen_count().await?);
        }
    }

    Ok(())
}
