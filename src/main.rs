use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use retype::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    library, logging,
    runtime::{AppEvent, ChannelEventSource, Runner},
    store::{KvStore, MemoryStore, SqliteStore},
    TICK_RATE_MS,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

/// retype your own texts, page by page
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Import a text file and retype it page by page. Progress is saved after every keystroke, so you can leave and pick up where you stopped."
)]
pub struct Cli {
    /// text file to import (keyed by its file name) and start typing
    file: Option<PathBuf>,

    /// number of characters per page
    #[clap(short = 'n', long, value_parser = parse_page_size)]
    page_size: Option<usize>,

    /// database file holding saved texts and progress
    #[clap(long)]
    db: Option<PathBuf>,

    /// keep texts and progress in memory only
    #[clap(long, conflicts_with = "db")]
    ephemeral: bool,

    /// hide the page illustration link
    #[clap(long)]
    no_illustration: bool,

    /// base URL the encoded illustration prompt is appended to
    #[clap(long)]
    illustration_url: Option<String>,

    /// config file to use instead of the default location
    #[clap(long)]
    config: Option<PathBuf>,

    /// print saved texts and exit
    #[clap(short = 'l', long)]
    list: bool,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("page size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

impl Cli {
    /// Overlay command line flags on the stored config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(url) = &self.illustration_url {
            config.illustration_base_url = url.clone();
        }
        if self.no_illustration {
            config.show_illustration = false;
        }
        config.sanitized()
    }

    fn config_store(&self) -> FileConfigStore {
        self.config
            .as_ref()
            .map(FileConfigStore::with_path)
            .unwrap_or_default()
    }

    fn open_store(&self) -> retype::Result<Box<dyn KvStore>> {
        if self.ephemeral {
            return Ok(Box::new(MemoryStore::new()));
        }
        let path = self
            .db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("retype.db"));
        tracing::debug!(path = %path.display(), "opening store");
        Ok(Box::new(SqliteStore::open(path)?))
    }
}

fn print_library(store: &dyn KvStore, page_size: usize) -> retype::Result<()> {
    let entries = library::entries(store, page_size)?;
    if entries.is_empty() {
        println!("no saved texts");
    }
    for entry in entries {
        let updated = entry
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}\t{}\t{}", entry.name, entry.progress_label(), updated);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(log_path) = AppDirs::log_path() {
        logging::init(&log_path);
    }

    let config_store = cli.config_store();
    let config = cli.apply(config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
    }

    let mut store = cli.open_store()?;

    if cli.list {
        if let Some(file) = &cli.file {
            library::import_file(&mut *store, file)?;
        }
        print_library(&*store, config.page_size)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(store, config);
    if let Some(file) = &cli.file {
        app.import_file(file)?;
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        ChannelEventSource::terminal(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => {
                if app.on_tick() {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            AppEvent::Key(key) => {
                app.on_key(key);
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            AppEvent::Closed => {
                tracing::warn!("input closed, saving and exiting");
                app.quit();
            }
        }
    }

    tracing::info!("bye");
    Ok(())
}
