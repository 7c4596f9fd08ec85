use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

mod app;
mod client;
mod config;
mod handler;
mod logging;
mod session;
mod state;
mod tui;
mod ui;

use app::App;
use client::ChatClient;
use config::{Config, Overrides, Settings, BASE_URL_ENV};

const TICK_RATE: Duration = Duration::from_millis(120);

#[derive(Parser)]
#[command(name = "railchat")]
#[command(about = "Terminal chat client for the railway knowledge assistant")]
struct Cli {
    /// Base URL of the chat service (the client posts to <BASE>/api/chat)
    #[arg(long, value_name = "BASE")]
    base_url: Option<String>,
    /// Header title
    #[arg(long)]
    title: Option<String>,
    /// Request timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Where to write diagnostic logs
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Save the chat service base URL to the config file
    SetUrl {
        /// Base URL, e.g. http://localhost:5000
        url: String,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            title: self.title.clone(),
            timeout_secs: self.timeout,
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    if let Some(Commands::Config { action }) = cli.command {
        return run_config(action, overrides);
    }

    let config = Config::load()?;
    let settings = Settings::resolve(config, overrides, std::env::var(BASE_URL_ENV).ok());

    // The terminal is still ours here, so this is the only place to warn
    if let Err(err) = logging::init(&settings.log_file) {
        eprintln!(
            "warning: cannot write log file {}: {}; continuing without logs",
            settings.log_file.display(),
            err
        );
    }
    info!(
        "railchat {} starting, chat endpoint base {}",
        env!("CARGO_PKG_VERSION"),
        settings.base_url
    );

    let client = ChatClient::new(&settings.base_url, settings.timeout())?;
    let mut app = App::new(settings.title.clone(), client);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if app.session.is_pending() {
        info!("exiting with a request still in flight, its reply is discarded");
    }
    info!("railchat exiting after {} turns", app.session.conversation().len());

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_reply().await;
    }

    Ok(())
}

fn run_config(action: ConfigAction, overrides: Overrides) -> Result<()> {
    let path = Config::get_config_path()?;

    match action {
        ConfigAction::Show => {
            let config = Config::load_from(&path)?;
            let settings = Settings::resolve(config, overrides, std::env::var(BASE_URL_ENV).ok());
            println!("{}", serde_json::to_string_pretty(&settings)?);
            println!("config file: {}", path.display());
        }
        ConfigAction::SetUrl { url } => {
            Config::save_base_url(&path, &url)?;
            println!("Saved base URL to {}", path.display());
        }
    }
    Ok(())
}
