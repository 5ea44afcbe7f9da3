/*****************************************************************************************
 *
 *  clubdesk – Lab key, component ledger, presence and schedule service
 *  -------------------------------------------------------------------
 *
 *  In-memory store with JSON snapshot persistence, served over axum.
 *
 *****************************************************************************************/

use std::error::Error;
use std::path::PathBuf;

use axum::serve;
use tokio::net::TcpListener;
use tokio::task;
use tracing_subscriber::FmtSubscriber;

use clubdesk::config::AppConfig;
use clubdesk::persistence::{autosave_loop, load_snapshot, save_snapshot};
use clubdesk::services::{key_service, user_service};
use clubdesk::state::{new_store, AppState, ClubStore};

/// config.json next to the executable, then one level up, then the
/// working directory.
fn locate_config() -> Result<PathBuf, Box<dyn Error>> {
    let exe_path = std::env::current_exe()?;
    let exe_dir = exe_path
        .parent()
        .ok_or("Cannot get executable directory")?;

    let candidates = [
        exe_dir.join("config.json"),
        exe_dir.join("..").join("config.json"),
        PathBuf::from("config.json"),
    ];

    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| {
            let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            format!(
                "config.json not found in:\n  {}\nCopy config.json to one of these paths.",
                tried.join("\n  ")
            )
            .into()
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    //
    // ────────────────────────────────────────────────────────
    //  Load configuration
    // ────────────────────────────────────────────────────────
    //
    let config_path = locate_config()?;
    let cfg = AppConfig::load_from_file(&config_path)?;

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging
    // ────────────────────────────────────────────────────────
    //
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cfg.log_filter())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Starting clubdesk");
    tracing::info!("Loaded config.json from {}", config_path.display());

    //
    // ────────────────────────────────────────────────────────
    //  Create store, load snapshot, make sure an admin exists
    // ────────────────────────────────────────────────────────
    //
    let store = new_store();
    load_snapshot(&cfg.snapshot_path, &store).await;

    if let Some(admin) = user_service::bootstrap_admin(&store, &cfg.admin_username, &cfg.admin_password)? {
        tracing::warn!(
            "No administrator found, created '{}' from config.json; change its password",
            admin.username
        );
    }

    //
    // ────────────────────────────────────────────────────────
    //  Start autosave loop
    // ────────────────────────────────────────────────────────
    //
    {
        let store_clone = store.clone();
        let path = cfg.snapshot_path.clone();
        let interval = cfg.snapshot_interval;

        task::spawn(async move {
            autosave_loop(path, store_clone, interval).await;
        });
    }

    //
    // ────────────────────────────────────────────────────────
    //  Start key expiry sweep (optional)
    // ────────────────────────────────────────────────────────
    //
    if let Some(max_hold) = cfg.key_max_hold_seconds {
        let every = cfg.sweep_interval.unwrap_or(60);
        let store_clone = store.clone();
        tracing::info!(
            "Starting key sweep: max hold={}s, interval={}s",
            max_hold,
            every
        );

        task::spawn(async move {
            key_service::expiry_loop(store_clone, max_hold, every).await;
        });
    }

    //
    // ────────────────────────────────────────────────────────
    //  Build Axum app and start listening
    // ────────────────────────────────────────────────────────
    //
    let state = AppState::new(store.clone(), cfg.token_ttl_seconds);
    let app = clubdesk::build_app(state, cfg.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    serve(listener, app)
        .with_graceful_shutdown(shutdown(store.clone(), cfg.snapshot_path.clone()))
        .await?;

    Ok(())
}

//
// ─────────────────────────────────────────────────────────────
//  Graceful shutdown handler
// ─────────────────────────────────────────────────────────────
//
async fn shutdown(store: ClubStore, path: String) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }

    tracing::warn!("CTRL+C received, saving snapshot");
    save_snapshot(&path, &store).await;
    tracing::info!("Snapshot saved. Goodbye.");
}
