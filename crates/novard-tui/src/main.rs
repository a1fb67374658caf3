use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use novard_core::{Backend, BackendClient, Config, SessionStore};
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "novard")]
#[command(version, about = "Terminal client for the Novard career assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend URL, overriding the config file
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the doubts and chat UI (default)
    Run,
    /// Sign in and remember the account for later runs
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "NOVARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored account and profile
    Logout,
    /// Show the signed-in account
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()
        .context("Failed to load config")?
        .with_overrides(cli.base_url, None);
    let log_path = logging::init(&config.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), log = %log_path.display(), "novard starting");

    let mut store = SessionStore::open_default()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config, store).await,
        Commands::Login { email, password } => login(&config, &mut store, &email, &password).await,
        Commands::Logout => {
            store.sign_out()?;
            info!("signed out");
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => {
            let identity = store.identity()?;
            println!("{} (user {})", identity.email, identity.user_id);
            println!("backend: {}", config.base_url);
            println!("session: {}", store.path().display());
            Ok(())
        }
    }
}

async fn login(config: &Config, store: &mut SessionStore, email: &str, password: &str) -> Result<()> {
    let backend = BackendClient::new(&config.base_url, config.request_timeout())?;
    let identity = backend
        .login(email.trim(), password)
        .await
        .with_context(|| format!("Login to {} failed", backend.base_url()))?;
    store.sign_in(&identity)?;

    info!(user_id = identity.user_id, "signed in");
    println!("Logged in as {} (user {}).", identity.email, identity.user_id);
    Ok(())
}

/// Refuses to draw anything without a stored login.
async fn run(config: &Config, store: SessionStore) -> Result<()> {
    let identity = store.identity()?;
    let mut app = App::new(config, store, identity)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = event_loop(&mut terminal, &mut app).await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // Paint the loading state first, then do the work
        if app.is_busy() {
            app.run_pending().await;
            continue;
        }

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}
