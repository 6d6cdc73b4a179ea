mod api;
mod app;
mod config;
mod feed;
mod model;
mod notifications;
mod storage;
mod theme;
mod timing;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::ApiClient;
use app::App;
use config::AppConfig;
use feed::FeedHandle;
use storage::LocalStore;

#[derive(Parser, Debug)]
#[command(name = "sentinel-dash")]
#[command(version)]
#[command(about = "Terminal dashboard for the Sentinel multi-chain trading agent")]
struct Args {
    /// Dashboard WebSocket endpoint (overrides the config file)
    #[arg(long)]
    ws_url: Option<String>,

    /// REST API base URL (overrides the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Run against built-in sample data without connecting
    #[arg(long)]
    offline: bool,

    /// Output server health and a dashboard summary as JSON
    #[arg(short, long)]
    status: bool,

    /// Use this config file instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.status)?;

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load()?,
    };
    if let Some(url) = args.ws_url {
        config.ws_url = url;
    }
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }

    // Handle CLI-only commands
    if args.status {
        return print_status(&config).await;
    }

    run_tui(config, args.offline).await
}

/// The TUI owns the terminal, so logs go to a file unless we are scripting
fn init_logging(to_stderr: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());

    if to_stderr {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
        return Ok(());
    }

    let log_dir = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sentinel-dash");
    std::fs::create_dir_all(&log_dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("sentinel-dash.log"))?;

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

async fn print_status(config: &AppConfig) -> Result<()> {
    let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;

    let output = match api.health().await {
        Ok(health) => {
            let mut output = serde_json::json!({
                "connected": true,
                "status": health.status,
                "version": health.version,
                "clients": health.clients,
                "chains": health.chains,
            });
            match api.dashboard().await {
                Ok(data) => {
                    output["portfolio"] = serde_json::json!({
                        "totalValue": data.portfolio.total_value,
                        "totalChange": data.portfolio.total_change,
                    });
                    output["activeStrategies"] =
                        serde_json::json!(data.strategies.iter().filter(|s| s.is_active()).count());
                    output["pendingTransactions"] = serde_json::json!(data
                        .transactions
                        .iter()
                        .filter(|t| t.status == model::TxStatus::Pending)
                        .count());
                    output["lastUpdated"] = serde_json::json!(data.last_updated);
                }
                Err(e) => output["error"] = serde_json::json!(e.to_string()),
            }
            output
        }
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            serde_json::json!({
                "connected": false,
                "error": e.to_string(),
            })
        }
    };

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn run_tui(config: AppConfig, offline: bool) -> Result<()> {
    ui::set_theme(theme::Theme::from_overrides(&config.theme));

    let store = match config.store_path.clone().or_else(LocalStore::default_path) {
        Some(path) => LocalStore::open(path),
        None => LocalStore::in_memory(),
    };

    // Create app state
    let mut app = if offline {
        tracing::info!("Starting in offline mode");
        App::new(config, &store, Some(model::mock::dashboard()))
    } else {
        tracing::info!("Connecting to {}", config.ws_url);
        let (feed, events) = FeedHandle::spawn(config.ws_url.clone(), config.reconnect_delay());
        let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;
        App::new(config, &store, None).with_feed(feed, events).with_api(api)
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.shutdown().await;
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.accepts_quit() => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key) {
                                tracing::error!("Key handling failed: {}", e);
                                app.set_status(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Drain feed/API events and run timers
        app.tick();
    }
}
