mod app;
mod cli;
mod input;
mod ui;

use anyhow::{Context, Result, bail};
use app::{App, AppCommand};
use clap::Parser;
use cli::{CliArgs, CliCommand, ONE_SHOT_WIDTH, positions_to_range};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use lucid::config::LucidConfig;
use lucid::listing::Engine;
use lucid::model::Displayable;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::File;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info_span, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, &args.log_file)?;

    let mut config =
        LucidConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(timeout_secs) = args.timeout_secs {
        config.fetch_timeout_secs = timeout_secs;
    }
    if let Some(source) = &config.source {
        debug!(path = %source.display(), "loaded configuration");
    }

    let query = args
        .query
        .clone()
        .or_else(|| config.query.clone())
        .unwrap_or_default();
    let mut engine = Engine::from_config(&config, info_span!("engine"));

    match args.command {
        Some(CliCommand::List { width }) => list(&mut engine, width, &query).await,
        Some(CliCommand::Inspect { position }) => inspect(&mut engine, position, &query).await,
        Some(CliCommand::Delete { start, end }) => delete(&mut engine, start, end, &query).await,
        None => {
            let mut app = App::new(query);
            run(&mut app, &mut engine).await
        }
    }
}

fn init_tracing(level_filter: &str, log_file: &Path) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;
    let file = File::create(log_file)
        .with_context(|| format!("failed to create log file {}", log_file.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(Arc::new(file))
        .try_init();

    Ok(())
}

async fn populate(engine: &mut Engine, width: usize, query: &str) -> Result<Vec<String>> {
    let rows = engine
        .populate(width, query)
        .await
        .with_context(|| format!("invalid query '{query}'"))?;
    for failure in engine.failures() {
        eprintln!("warning: {} failed: {}", failure.backend, failure.error);
    }
    Ok(rows)
}

async fn list(engine: &mut Engine, width: usize, query: &str) -> Result<()> {
    let rows = populate(engine, width, query).await?;
    if rows.is_empty() {
        eprintln!("no resources match '{query}'");
    }
    for (index, row) in rows.iter().enumerate() {
        println!("{:>4} {row}", index + 1);
    }
    Ok(())
}

async fn inspect(engine: &mut Engine, position: usize, query: &str) -> Result<()> {
    let (index, _) = positions_to_range(position, None)?;
    populate(engine, ONE_SHOT_WIDTH, query).await?;
    let metadata = engine
        .get_metadata(index)
        .with_context(|| format!("cannot inspect row {position}"))?;
    println!("{metadata}");
    Ok(())
}

async fn delete(engine: &mut Engine, start: usize, end: Option<usize>, query: &str) -> Result<()> {
    let (first, last) = positions_to_range(start, end)?;
    populate(engine, ONE_SHOT_WIDTH, query).await?;
    let report = engine
        .delete(first, last)
        .await
        .with_context(|| format!("cannot delete row {start}"))?;

    for removal in &report.removed {
        println!(
            "removed {:>4} {} {}",
            removal.index + 1,
            removal.backend,
            removal.name
        );
    }
    for failure in &report.failed {
        println!(
            "failed  {:>4} {} {}: {}",
            failure.index + 1,
            failure.backend,
            failure.name,
            failure.error
        );
    }

    if !report.failed.is_empty() {
        bail!(
            "{} of {} removals failed",
            report.failed.len(),
            report.failed.len() + report.removed.len()
        );
    }
    Ok(())
}

async fn run(app: &mut App, engine: &mut Engine) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, engine).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn draw(terminal: &mut TuiTerminal, app: &mut App) -> Result<()> {
    terminal
        .draw(|frame| ui::render(frame, app))
        .context("failed to render terminal frame")?;
    Ok(())
}

async fn run_loop(terminal: &mut TuiTerminal, app: &mut App, engine: &mut Engine) -> Result<()> {
    app.set_status("Listing resources…");
    draw(terminal, app)?;
    refresh(app, engine).await;

    let mut reader = EventStream::new();
    loop {
        draw(terminal, app)?;

        if !app.running() {
            break;
        }

        match reader.next().await {
            Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                if let Some(action) = input::map_key(app.mode(), key) {
                    debug!("action={action:?}");
                    let command = app.apply_action(action);
                    if command != AppCommand::None {
                        draw(terminal, app)?;
                    }
                    execute_app_command(app, engine, command).await;
                }
            }
            Some(Ok(Event::Resize(_, _))) => {
                draw(terminal, app)?;
                app.set_rows(engine.render(app.list_width()));
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => {
                app.set_status(format!("terminal event error: {error}"));
            }
            None => {
                app.set_status("terminal event stream closed");
                break;
            }
        }
    }

    Ok(())
}

async fn execute_app_command(app: &mut App, engine: &mut Engine, command: AppCommand) {
    match command {
        AppCommand::None => {}
        AppCommand::Refresh => refresh(app, engine).await,
        AppCommand::Delete { start, end } => match engine.delete(start, end).await {
            Ok(report) => {
                refresh(app, engine).await;
                let removed = report.removed.len();
                match report.failed.first() {
                    None => app.set_status(format!("Removed {removed} item(s)")),
                    Some(first) => app.set_status(format!(
                        "Removed {removed}, {} failed ({} {}: {}), details in log",
                        report.failed.len(),
                        first.backend,
                        first.name,
                        first.error
                    )),
                }
            }
            Err(error) => {
                app.set_status(format!("Delete rejected: {error}"));
            }
        },
        AppCommand::Inspect { index } => match engine.get(index) {
            Ok(item) => {
                let title = format!(
                    "{} {} {}",
                    item.backend_name(),
                    item.resource_type(),
                    item.displayed_name()
                );
                app.open_overlay(title, item.metadata_json());
                app.set_status(format!("Inspecting row {}", index + 1));
            }
            Err(error) => {
                app.set_status(format!("Cannot inspect: {error}"));
            }
        },
    }
}

async fn refresh(app: &mut App, engine: &mut Engine) {
    let width = app.list_width();
    let query = app.query().to_string();
    match engine.populate(width, &query).await {
        Ok(rows) => {
            let failing = engine
                .failures()
                .iter()
                .map(|failure| failure.backend.clone())
                .collect();
            app.set_listing(rows, failing);
        }
        Err(error) => {
            warn!(%error, "query rejected");
            app.set_status(format!("Invalid query: {error}"));
        }
    }
}
