use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use desk_core::{spawn_serial_feed, Core, SerialSettings, WindowSpecs};
use storage::Storage;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{load_settings, Settings};
use console::ConsoleHost;

#[derive(Parser, Debug)]
#[command(name = "citizen-desk", about = "Citizen registry desktop shell")]
struct Args {
    /// Path to a TOML settings file (defaults to ./citizen_desk.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    serial_path: Option<String>,
    #[arg(long)]
    baud_rate: Option<u32>,
    /// Run without opening the serial port.
    #[arg(long)]
    no_serial: bool,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.database_url {
            settings.database_url = v;
        }
        if let Some(v) = self.serial_path {
            settings.serial_path = v;
        }
        if let Some(v) = self.baud_rate {
            settings.serial_baud_rate = v;
        }
        if self.no_serial {
            settings.serial_enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref());
    args.apply(&mut settings);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let storage = Storage::new(&settings.database_url).await.map_err(|err| {
        error!(database_url = %settings.database_url, "failed to open citizen database: {err:#}");
        err
    })?;
    storage.health_check().await?;
    info!(database_url = %settings.database_url, "citizen database ready");

    let (core_handle, intake) = desk_core::channel();
    let host = Arc::new(ConsoleHost::new(core_handle.clone()));
    let core = Core::new(
        core_handle.clone(),
        intake,
        host.clone(),
        Arc::new(storage),
        WindowSpecs::default(),
    );

    if settings.serial_enabled {
        spawn_serial_feed(
            SerialSettings {
                path: settings.serial_path.clone(),
                baud_rate: settings.serial_baud_rate,
            },
            core_handle.clone(),
        )
        .context("failed to start serial feed thread")?;
    } else {
        info!("serial feed disabled");
    }

    console::spawn_stdin_reader(host, core_handle).context("failed to start console input")?;

    core.run().await.context("failed to open main window")?;
    Ok(())
}
