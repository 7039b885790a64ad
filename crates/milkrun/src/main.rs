use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use milkrun::config::{Settings, DEFAULT_LISTEN_ADDR, WEBHOOK_PATH};
use milkrun::report;
use milkrun::sender;
use milkrun::server::{self, AppState};
use milkrun_core::{EventStore, MemoryEventStore, PgEventStore};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Webhook event ingestion into an analytical events table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ensure the events table exists and start the webhook listener
    Serve(ServeArgs),
    /// Create the events table if it is absent
    InitDb(InitDbArgs),
    /// Print the columns of the events table
    DescribeSchema,
    /// Post sample payloads from a JSON file to a running listener
    SendPayloads(SendPayloadsArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to listen on (overrides MILKRUN_LISTEN_ADDR)
    #[arg(long)]
    listen: Option<String>,
    /// Keep events in process memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

#[derive(Args, Debug, Default)]
struct InitDbArgs {
    /// Drop the events table, and every stored event, before recreating it
    #[arg(long)]
    drop_existing: bool,
}

#[derive(Args, Debug)]
struct SendPayloadsArgs {
    /// JSON file holding an array of webhook payloads
    #[arg(long, default_value = "./files/payloads.json")]
    file: PathBuf,
    /// Listener URL to post to
    #[arg(long)]
    url: Option<String>,
    /// Pause between deliveries in milliseconds
    #[arg(long, default_value_t = 5000)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Serve(args) => handle_serve(&settings, args).await,
        Command::InitDb(args) => handle_init_db(&settings, args).await,
        Command::DescribeSchema => handle_describe_schema(&settings).await,
        Command::SendPayloads(args) => handle_send_payloads(args).await,
    }
}

async fn connect_store(settings: &Settings) -> Result<PgEventStore> {
    let store = PgEventStore::connect(
        settings.require_database_url()?,
        settings.max_connections,
        settings.table.clone(),
    )
    .await?;
    Ok(store)
}

async fn handle_serve(settings: &Settings, args: ServeArgs) -> Result<()> {
    let listen_addr = match args.listen {
        Some(raw) => raw
            .parse::<SocketAddr>()
            .with_context(|| format!("--listen must be a socket address, got `{raw}`"))?,
        None => settings.listen_addr,
    };

    let pg = if args.in_memory {
        None
    } else {
        Some(connect_store(settings).await?)
    };
    let store: Arc<dyn EventStore> = match &pg {
        Some(pg) => Arc::new(pg.clone()),
        None => {
            warn!("using the in-memory store; events are lost when the process exits");
            Arc::new(MemoryEventStore::new())
        }
    };

    store.ensure_schema().await?;
    report::log_columns(settings.table.as_str(), &store.describe_schema().await);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    server::serve(listener, AppState::new(store)).await?;

    if let Some(pg) = pg {
        pg.close().await;
    }
    Ok(())
}

async fn handle_init_db(settings: &Settings, args: InitDbArgs) -> Result<()> {
    let store = connect_store(settings).await?;

    if args.drop_existing {
        store.recreate_schema().await?;
    } else {
        store.ensure_schema().await?;
    }

    let columns = store.describe_schema().await;
    report::log_columns(settings.table.as_str(), &columns);
    println!("{}", report::render_columns(&columns));
    info!(table = %settings.table, "database initialized");

    store.close().await;
    Ok(())
}

async fn handle_describe_schema(settings: &Settings) -> Result<()> {
    let store = connect_store(settings).await?;
    let columns = store.describe_schema().await;

    if columns.is_empty() {
        println!("Table '{}' has no columns to report.", settings.table);
    } else {
        println!("{}", report::render_columns(&columns));
    }

    store.close().await;
    Ok(())
}

async fn handle_send_payloads(args: SendPayloadsArgs) -> Result<()> {
    let url = args
        .url
        .unwrap_or_else(|| format!("http://{DEFAULT_LISTEN_ADDR}{WEBHOOK_PATH}"));

    let payloads = sender::load_payloads(&args.file);
    if payloads.is_empty() {
        println!("No events to process. Stopping.");
        return Ok(());
    }

    let summary =
        sender::send_payloads(&url, &payloads, Duration::from_millis(args.delay_ms)).await?;
    println!(
        "Sent {} payloads: {} accepted, {} rejected.",
        payloads.len(),
        summary.accepted,
        summary.rejected
    );
    Ok(())
}
