mod app;
mod event;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use crossterm::{
    event::DisableMouseCapture,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use doodle_common::config::{
    BackendKind, FallbackPolicy, StoreConfig, Timing, DEFAULT_MAX_ROUNDS, DEFAULT_STORE_ADDR,
};
use doodle_common::profile::Identity;
use doodle_common::store::RoomRepository;

/// Doodle Client - multiplayer drawing and guessing in the terminal
#[derive(Parser, Debug)]
#[command(name = "doodle-client", version, about)]
struct Args {
    /// Room store address
    #[arg(short = 's', long, default_value = DEFAULT_STORE_ADDR)]
    store: String,

    /// Keep rooms in this process only (no store server)
    #[arg(long)]
    local: bool,

    /// What to do when the store server is unreachable: local or strict
    #[arg(long, default_value_t = FallbackPolicy::Local)]
    fallback: FallbackPolicy,

    /// JSON file backing the local store
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Display name
    #[arg(short, long)]
    name: Option<String>,

    /// Account id; a mock account is generated when omitted
    #[arg(long)]
    uid: Option<String>,

    #[arg(long)]
    email: Option<String>,

    /// Avatar image URL
    #[arg(long)]
    avatar: Option<String>,

    /// Rounds per game for rooms created by this client
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,
}

impl Args {
    fn identity(&self) -> Identity {
        let name = self.name.clone().unwrap_or_else(|| "Player".to_string());
        let mut identity = match &self.uid {
            Some(uid) => Identity::new(uid.clone(), name),
            None => Identity::mock(name),
        };
        identity.email = self.email.clone().unwrap_or_default();
        identity.avatar_url = self.avatar.clone();
        identity
    }

    fn store_config(&self) -> StoreConfig {
        let backend = if self.local {
            BackendKind::Local
        } else {
            BackendKind::Remote {
                addr: self.store.clone(),
            }
        };
        StoreConfig {
            backend,
            fallback: self.fallback,
            data_file: self.data_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doodle_client=info,doodle_common=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let identity = args.identity();
    if identity.is_mock() {
        tracing::info!("No account given; playing as {}", identity.uid);
    }
    let repo = RoomRepository::open(&args.store_config()).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app::run(
        &mut terminal,
        repo,
        identity,
        Timing::default(),
        args.max_rounds.max(1),
    )
    .await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}
