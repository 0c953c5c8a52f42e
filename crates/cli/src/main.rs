mod app;
mod auth_commands;
mod browser;
mod config_commands;
mod player_commands;
mod render;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "nowplay", about = "nowplay — Spotify now-playing viewer and remote")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/nowplay/).
    #[arg(long, global = true, env = "NOWPLAY_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,

    /// Print the authorization URL instead of opening a browser.
    #[arg(long, global = true, default_value_t = false)]
    no_browser: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize with Spotify.
    Login {
        /// Start a new authorization even if a token is stored.
        #[arg(long)]
        force: bool,
    },
    /// Forget the stored verifier and tokens.
    Logout,
    /// Show stored credentials and configuration state.
    Status,
    /// Show the Spotify profile of the authorized user.
    Profile,
    /// Show what is playing right now.
    Now,
    /// Follow playback until interrupted.
    Watch,
    /// Pause playback.
    Pause,
    /// Resume playback.
    Play,
    /// Skip to the next track.
    Next,
    /// Go back to the previous track.
    Previous,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "nowplay starting");

    if let Some(ref dir) = cli.config_dir {
        nowplay_config::set_config_dir(dir.clone());
    }

    match cli.command {
        Commands::Config { action } => config_commands::handle_config(action),
        command => {
            let config = nowplay_config::discover_and_load();
            let app = app::App::new(config, cli.no_browser)?;
            run(&app, command).await
        },
    }
}

async fn run(app: &app::App, command: Commands) -> anyhow::Result<()> {
    use nowplay_player::PlayerCommand;

    match command {
        Commands::Login { force } => auth_commands::login(app, force).await,
        Commands::Logout => auth_commands::logout(app),
        Commands::Status => auth_commands::status(app),
        Commands::Profile => player_commands::profile(app).await,
        Commands::Now => player_commands::now(app).await,
        Commands::Watch => player_commands::watch(app).await,
        Commands::Pause => player_commands::command(app, PlayerCommand::Pause).await,
        Commands::Play => player_commands::command(app, PlayerCommand::Play).await,
        Commands::Next => player_commands::command(app, PlayerCommand::Next).await,
        Commands::Previous => player_commands::command(app, PlayerCommand::Previous).await,
        Commands::Config { action } => config_commands::handle_config(action),
    }
}
