use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::File, io, process::ExitCode, sync::Mutex};
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

mod api;
mod app;
mod config;
mod controller;
mod error;
mod events;
mod form;
mod types;
mod ui;
mod view;

use app::{AppEvent, AppState};
use config::AppConfig;
use controller::{Controller, SubmissionOutcome};
use form::FormValues;
use types::ProtocolMode;

/// Submit a music video request and follow it until it finishes.
#[derive(Debug, Parser)]
#[command(name = "tunereel", version)]
struct Cli {
    /// Base URL of the creation server
    #[arg(long)]
    server_url: Option<String>,

    /// How the server reports results: streaming or synchronous
    #[arg(long, value_parser = parse_mode)]
    mode: Option<ProtocolMode>,

    /// Submit once from the flags below and print the result instead of opening the form
    #[arg(long)]
    headless: bool,

    #[arg(long, default_value = "")]
    mood: String,

    #[arg(long, default_value = "")]
    age: String,

    #[arg(long, default_value = "")]
    pricing: String,

    /// Track length in seconds
    #[arg(long, default_value = "")]
    length: String,

    #[arg(long, default_value = "")]
    artist: String,

    #[arg(long, default_value = "")]
    vision: String,
}

impl Cli {
    fn form_values(&self) -> FormValues {
        FormValues {
            mood: self.mood.clone(),
            age: self.age.clone(),
            pricing: self.pricing.clone(),
            length: self.length.clone(),
            artist: self.artist.clone(),
            vision: self.vision.clone(),
        }
    }
}

fn parse_mode(value: &str) -> Result<ProtocolMode, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_tracing(cli.headless)?;
    info!("starting tunereel");

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.server_url.clone() {
        config.set_server_url(url);
    }
    if let Some(mode) = cli.mode {
        config.set_mode(mode);
    }

    let client = api::Client::new(config.server_url(), config.request_timeout())?;
    let server_url = client.base_url().to_string();
    info!("using {} protocol against {server_url}", config.mode());

    if cli.headless {
        return run_headless(client, &config, cli.form_values()).await;
    }

    let (event_tx, mut event_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();

    let controller =
        Controller::new(client, config.mode(), config.button_label(), event_tx.clone());
    controller.spawn(command_rx);

    let mut app_state = AppState::new(&config, server_url.clone(), cli.form_values());
    app_state.handle_event(AppEvent::Info(format!(
        "Connected to {server_url} ({} mode)",
        config.mode()
    )));

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let ui_result = ui::run(&mut terminal, &mut app_state, &mut event_rx, command_tx);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    ui_result.map(|_| ExitCode::SUCCESS)
}

async fn run_headless(
    client: api::Client,
    config: &AppConfig,
    values: FormValues,
) -> Result<ExitCode> {
    let (lines, code) = submit_headless(client, config, values).await;
    for line in lines {
        println!("{line}");
    }
    Ok(code)
}

/// Runs one submission to completion and returns the result region as the
/// lines headless mode prints, along with the process exit status.
async fn submit_headless(
    client: api::Client,
    config: &AppConfig,
    values: FormValues,
) -> (Vec<String>, ExitCode) {
    let (event_tx, mut event_rx) = unbounded_channel();
    let controller = Controller::new(client, config.mode(), config.button_label(), event_tx);

    let outcome = controller.submit(values).await;
    event_rx.close();
    while let Ok(event) = event_rx.try_recv() {
        match event {
            AppEvent::StreamOpened { task_id } => info!("listened on event stream for {task_id}"),
            AppEvent::StreamClosed { task_id } => info!("event stream for {task_id} closed"),
            _ => {}
        }
    }

    let view = controller.view().await;
    let mut lines: Vec<String> = view.result.title().map(str::to_string).into_iter().collect();
    lines.extend(view.result.body_lines().into_iter().map(|line| format!("  {line}")));

    let code = match outcome {
        SubmissionOutcome::Succeeded => ExitCode::SUCCESS,
        SubmissionOutcome::Failed | SubmissionOutcome::Ignored => ExitCode::FAILURE,
    };
    (lines, code)
}

fn setup_tracing(headless: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact();

    let result = if headless {
        builder.with_writer(io::stderr).try_init()
    } else {
        let path = AppConfig::log_file_path()?;
        let file = File::create(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
    };

    result.map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
        anyhow!("failed to initialise tracing: {err}")
    })
}
