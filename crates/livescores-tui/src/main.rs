// Team live scores entry point.
//
// Startup sequence (`run`, the default command):
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the settings store
// 4. Load display settings and the persisted category
// 5. Build the HTTP client and standings cache
// 6. Create mpsc channels
// 7. Create the refresher and app state
// 8. Spawn app logic task
// 9. Run the TUI until the user quits
// 10. Cleanup on exit

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};

use livescores_core::cache::StandingsCache;
use livescores_core::client::StandingsClient;
use livescores_core::config::{self, Config};
use livescores_core::refresh::Refresher;
use livescores_core::settings::SettingsRepository;
use livescores_core::store::SqliteStore;
use livescores_core::transport::ReqwestTransport;
use livescores_tui::{app, settings_cli, tui};

#[derive(Parser)]
#[command(name = "livescores")]
#[command(about = "Live team standings for the current race", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the live standings dashboard (default)
    Run(RunArgs),
    /// Inspect or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Also mirror the standings to this HTML file on every update
    #[arg(long, value_name = "PATH")]
    html_out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every setting
    Show,
    /// Validate and save one setting, e.g. `set fontScale 1.5`
    Set { field: String, value: String },
    /// Check the stored access password against the API
    Test,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Live scores starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: api={}, refresh every {}s",
        config.api.base_url, config.api.refresh_interval_secs
    );

    // 3. Open the settings store
    let store = SqliteStore::open(&config.db_path).context("failed to open settings database")?;
    info!("Settings database opened at {}", config.db_path);
    let settings = SettingsRepository::new(Arc::new(store));

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run_dashboard(config, settings, args).await,
        Command::Settings { action } => run_settings(config, settings, action).await,
    }
}

async fn run_dashboard(
    config: Config,
    settings: SettingsRepository,
    args: RunArgs,
) -> anyhow::Result<()> {
    // 4. Load display settings and the persisted category
    let display = settings.load().context("failed to load settings")?;
    let filter = settings
        .selected_category()
        .context("failed to load selected category")?;
    info!("Starting on category: {}", filter.display_name());

    // 5. Build the HTTP client and standings cache
    let client = build_client(&config)?;
    let cache = Arc::new(StandingsCache::new(filter));

    // 6. Create mpsc channels
    let (refresh_tx, refresh_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 7. Create the refresher and app state
    let refresher = Arc::new(Refresher::new(client, cache, settings.clone(), refresh_tx));
    if let Some(path) = &args.html_out {
        info!("Mirroring standings to {}", path.display());
    }
    let app_state = app::AppState::new(
        refresher,
        settings,
        display,
        config.api.refresh_interval(),
        args.html_out,
    );

    // 8. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(refresh_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 9. Run the TUI event loop (blocking until user quits)
    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms);
    if let Err(e) = tui::run(ui_rx, cmd_tx, tick_rate).await {
        error!("TUI error: {}", e);
    }

    // 10. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Live scores shut down cleanly");
    Ok(())
}

async fn run_settings(
    config: Config,
    settings: SettingsRepository,
    action: SettingsAction,
) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match action {
        SettingsAction::Show => settings_cli::show(&settings, &mut out),
        SettingsAction::Set { field, value } => {
            settings_cli::set(&settings, &field, &value, &mut out)
        }
        SettingsAction::Test => {
            let client = build_client(&config)?;
            if !settings_cli::test(&settings, &client, &mut out).await? {
                anyhow::bail!("connection test failed");
            }
            Ok(())
        }
    }
}

fn build_client(config: &Config) -> anyhow::Result<StandingsClient> {
    let transport = ReqwestTransport::new(config.api.request_timeout())
        .context("failed to build HTTP client")?;
    Ok(StandingsClient::new(
        Arc::new(transport),
        config.api.base_url.clone(),
    ))
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("livescores.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("livescores=info,livescores_core=info,livescores_tui=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
