mod refresh_loop;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use parking_lot::Mutex;
use rpg_control::Session;
use rpg_world::{load_content, now_ms, read_vault, JsonFileStore};
use tokio::sync::{broadcast, mpsc};

use crate::refresh_loop::run_refresh_loop;
use crate::routes::make_router_with_cors;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "rpg_daemon", about = "Vault RPG HTTP daemon")]
struct Args {
    #[arg(long, default_value = ".")]
    vault: PathBuf,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Save file. Defaults to `<vault>/.rpg/save.json`.
    #[arg(long)]
    save: Option<PathBuf>,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let cors_origin: HeaderValue = args
        .cors_origin
        .parse()
        .with_context(|| format!("invalid --cors-origin '{}'", args.cors_origin))?;

    let content = load_content(&args.content_dir)?;
    let files = read_vault(&args.vault)
        .with_context(|| format!("reading vault {}", args.vault.display()))?;
    let save_path = args
        .save
        .unwrap_or_else(|| args.vault.join(".rpg").join("save.json"));
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(
        vault = %args.vault.display(),
        save = %save_path.display(),
        notes = files.len(),
        seed,
        "opening session"
    );

    let session = Session::open(content, JsonFileStore::new(save_path), files, seed, now_ms());
    for notice in session.notices() {
        tracing::warn!(kind = ?notice.kind, "{}", notice.message);
    }

    let session = Arc::new(Mutex::new(session));
    let vault = Arc::new(args.vault);
    let (event_tx, _) = broadcast::channel(256);
    let (refresh_tx, refresh_rx) = mpsc::channel(1);

    tokio::spawn(run_refresh_loop(
        Arc::clone(&session),
        Arc::clone(&vault),
        event_tx.clone(),
        refresh_rx,
    ));

    let app_state = AppState {
        session,
        event_tx,
        refresh_tx,
        vault,
    };
    let app = make_router_with_cors(app_state, cors_origin);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
