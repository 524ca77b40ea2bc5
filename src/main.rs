mod api;
mod queue;
#[cfg(test)]
mod testutil;

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use zapcast_core::config;
use zapcast_core::logbuf::LogBuffer;
use zapcast_core::traits::SessionClient;
use zapcast_wa::WaSession;

use crate::queue::CampaignQueue;

#[derive(Parser)]
#[command(
    name = "zapcast",
    version,
    about = "Zapcast: WhatsApp REST bridge for direct sends and bulk campaigns"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge: WhatsApp session, campaign worker, and HTTP API.
    Start,
    /// Show the effective configuration and pairing state.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let logs = LogBuffer::new(cfg.bridge.log_capacity);

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| {
                            tracing_subscriber::EnvFilter::new(&cfg.bridge.log_level)
                        }),
                )
                .with(tracing_subscriber::fmt::layer())
                .with(logs.layer())
                .init();

            let data_dir = config::shellexpand(&cfg.bridge.data_dir);
            std::fs::create_dir_all(&data_dir)?;

            let session = Arc::new(WaSession::new(cfg.whatsapp.clone(), &data_dir));
            tokio::spawn(Arc::clone(&session).run_supervised());

            let session: Arc<dyn SessionClient> = session;
            let queue = CampaignQueue::new(session.clone(), cfg.campaign.clone());

            println!("Zapcast: Starting bridge...");
            api::serve(cfg.api, cfg.campaign, session, queue, logs).await?;
        }
        Commands::Status => {
            let data_dir = config::shellexpand(&cfg.bridge.data_dir);
            let session_db = Path::new(&data_dir).join("wa_session").join("session.db");

            println!("Zapcast: Status\n");
            println!("Config: {}", cli.config);
            println!("  data dir:     {data_dir}");
            println!("  api:          http://{}:{}", cfg.api.host, cfg.api.port);
            println!("  device name:  {}", cfg.whatsapp.device_name);
            println!("  country code: {}", cfg.campaign.country_code);
            println!(
                "  pause:        {}-{} ms between sends",
                cfg.campaign.pause_min_ms, cfg.campaign.pause_max_ms
            );
            println!(
                "  session:      {}",
                if session_db.exists() {
                    "paired"
                } else {
                    "not paired (start the bridge and scan the QR from /api/status)"
                }
            );
        }
    }

    Ok(())
}
