// src/main.rs

//! # Livepoll Main Entry Point
//!
//! Loads configuration, initializes logging, binds the listener, opens the
//! default document in a browser, and serves until Ctrl-C.

use anyhow::Result;
use livepoll::config::AppConfig;
use livepoll::error::ServeError;
use livepoll::fs::LocalFs;
use livepoll::web::{self, AppState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the Livepoll application.
///
/// Runs on a single-threaded runtime: requests are handled one at a time and
/// nothing runs in the background between polls.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let app_config = match AppConfig::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing subscriber for logging with environment filter and max level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app_config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(std::io::stderr) // Log to stderr
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default tracing subscriber failed");

    tracing::debug!("Livepoll starting with configuration: {:?}", app_config);

    if !app_config.root.is_dir() {
        eprintln!(
            "Serving root {} is not a directory.",
            app_config.root.display()
        );
        std::process::exit(1);
    }

    let listener = match web::bind(&app_config).await {
        Ok(listener) => listener,
        Err(ServeError::PortInUse { port, .. }) => {
            eprintln!(
                "Port {} is already in use. Try a different port or stop other servers.",
                port
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error starting server: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Live-reload server running at http://{}",
        app_config.listen_addr()
    );
    println!("Serving files from: {}", app_config.root.display());
    println!(
        "Watching for changes in .{} files...",
        app_config.watch_extension
    );
    println!("Press Ctrl+C to stop the server");

    if app_config.open_browser {
        open_browser(&app_config.index_url());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = Arc::new(AppState::new(Arc::clone(&app_config), Arc::new(LocalFs)));
    let server = tokio::spawn(async move {
        if let Err(e) = web::serve(listener, state, shutdown_rx).await {
            tracing::error!("Web server exited with error: {}", e);
        }
    });

    // Wait for Ctrl-C signal to initiate shutdown.
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Ctrl-C received, initiating shutdown...");
        }
        Err(err) => {
            tracing::error!("Failed to listen for Ctrl-C signal: {}", err);
        }
    }

    if shutdown_tx.send(true).is_err() {
        tracing::error!("Failed to send shutdown signal");
    }
    if let Err(e) = server.await {
        tracing::error!("Server task panicked: {}", e);
    }

    println!("\nServer stopped");
    Ok(())
}

/// Opens `url` in the default browser. Failure is logged and otherwise ignored.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => tracing::info!("Opened browser at {}", url),
        Err(e) => tracing::warn!("Could not open browser automatically: {}", e),
    }
}
