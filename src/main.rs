use ghmon::app::{AppConfig, AppState, Run};
use ghmon::cli::{self, Cli, RunCommand};
use ghmon::commands;
use ghmon::config::{self, Source, SourceSelection};
use ghmon::controller;
use ghmon::events::{AppEvent, EventHandler};
use ghmon::gh::executor::{self, GhClient};
use ghmon::notify;
use ghmon::output::Report;
use ghmon::traits::RemoteClient;
use ghmon::tui;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit code for anything that prevented a run from being resolved.
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }

    if let Err(e) = executor::check_gh_available().await {
        eprintln!("Error: {e}");
        std::process::exit(EXIT_FATAL);
    }

    let client: Arc<dyn RemoteClient> = Arc::new(GhClient::new());

    let sources = match resolve_sources(&args, client.as_ref()).await {
        Ok(sources) => sources,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_FATAL);
        }
    };
    tracing::info!(
        sources = ?sources.iter().map(Source::slug).collect::<Vec<_>>(),
        "resolved sources"
    );

    if let Some(command) = &args.command {
        let code = match run_subcommand(command, &sources[0], client.as_ref()).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {e}");
                EXIT_FATAL
            }
        };
        std::process::exit(code);
    }

    if args.is_one_shot() {
        let code = match Report::fetch(client.as_ref(), &sources[0]).await {
            Ok(report) => {
                if args.json {
                    println!("{}", report.to_json()?);
                } else {
                    print!("{}", report.to_plain());
                }
                report.exit_code()
            }
            Err(e) => {
                eprintln!("Error: {e}");
                eprintln!("Hint: {}", e.hint());
                EXIT_FATAL
            }
        };
        std::process::exit(code);
    }

    if let Some(hook) = &args.hook {
        if let Err(e) = notify::validate_hook(hook) {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_FATAL);
        }
    }

    let title = if sources.len() > 1 {
        format!("watching {} repositories", sources.len())
    } else {
        format!("watching {}", sources[0].slug())
    };

    let config = AppConfig {
        poll_interval: Duration::from_secs(args.poll),
        watch: args.watch,
        notify: args.notify,
        hook: args.hook.clone(),
        output_dir: PathBuf::from("."),
        ..AppConfig::new(sources)
    };
    let mut state = AppState::new(config);

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetTitle(title))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut state, client).await;

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;

    result?;
    std::process::exit(state.exit_code);
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    client: Arc<dyn RemoteClient>,
) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));
    let tx = events.sender();

    let size = terminal.size()?;
    controller::update(state, AppEvent::Resize { height: size.height });

    for command in controller::init(state) {
        commands::spawn(command, Arc::clone(&client), tx.clone());
    }

    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        let Some(event) = events.next().await else {
            tracing::warn!("event channel closed");
            break;
        };
        for command in controller::update(state, event) {
            tracing::debug!(command = command.label(), "dispatching");
            commands::spawn(command, Arc::clone(&client), tx.clone());
        }
        if state.should_quit {
            break;
        }
    }

    events.stop();
    Ok(())
}

/// Merges `--repos`, the config file and `--repo`, then fills in the branch.
async fn resolve_sources(args: &Cli, client: &dyn RemoteClient) -> Result<Vec<Source>> {
    let file = config::load_config_file(&args.config)?;
    let selection = config::select_sources(
        args.repos.as_deref(),
        file.as_ref(),
        args.repo.as_deref(),
    )?;

    match selection {
        SourceSelection::Multi(sources) => Ok(sources
            .into_iter()
            .map(|s| {
                if s.branch.is_none() {
                    s.with_branch(args.branch.clone())
                } else {
                    s
                }
            })
            .collect()),
        SourceSelection::Single(source) => {
            let source = match source {
                Some(s) => s,
                None => Source::parse(&executor::detect_repo().await?)?,
            };
            let branch = match args.branch.clone().or_else(|| source.branch.clone()) {
                Some(b) => Some(b),
                None => detect_or_default_branch(&source, client).await,
            };
            Ok(vec![source.with_branch(branch)])
        }
    }
}

/// Current checkout branch, or the repository default when HEAD is detached.
async fn detect_or_default_branch(source: &Source, client: &dyn RemoteClient) -> Option<String> {
    match executor::detect_branch().await {
        Ok(Some(branch)) => return Some(branch),
        Ok(None) => tracing::info!("detached HEAD, using default branch"),
        Err(e) => tracing::debug!("branch detection failed: {e}"),
    }
    match client.default_branch(source).await {
        Ok(branch) => Some(branch),
        Err(e) => {
            tracing::warn!("could not resolve default branch: {e}");
            None
        }
    }
}

async fn run_subcommand(
    command: &RunCommand,
    source: &Source,
    client: &dyn RemoteClient,
) -> Result<()> {
    match command {
        RunCommand::Retry { run, failed, yes } => {
            let target = resolve_run(source, client, *run).await?;
            let scope = if *failed { "failed jobs of " } else { "" };
            let prompt = format!(
                "Rerun {scope}{} #{} on {}?",
                target.workflow_name(),
                target.run_number,
                source.slug()
            );
            if !*yes && !confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            client.rerun(source, target.id, *failed).await?;
            println!("Rerun requested for run #{}", target.run_number);
        }
        RunCommand::Cancel { run, yes } => {
            let target = resolve_run(source, client, *run).await?;
            if !target.status.is_running() {
                return Err(eyre!(
                    "run #{} is not running ({})",
                    target.run_number,
                    target.status.as_str()
                ));
            }
            let prompt = format!(
                "Cancel {} #{} on {}?",
                target.workflow_name(),
                target.run_number,
                source.slug()
            );
            if !*yes && !confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            client.cancel(source, target.id).await?;
            println!("Cancellation requested for run #{}", target.run_number);
        }
        RunCommand::Dispatch {
            workflow,
            git_ref,
            yes,
        } => {
            let git_ref = git_ref
                .clone()
                .or_else(|| source.branch.clone())
                .ok_or_else(|| eyre!("no branch to dispatch on, pass --ref"))?;
            let prompt = format!("Dispatch {workflow} on {git_ref} in {}?", source.slug());
            if !*yes && !confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            client.dispatch(source, workflow, &git_ref).await?;
            println!("Dispatched {workflow} on {git_ref}");
        }
    }
    Ok(())
}

/// Number of recent runs searched when a run id is given explicitly.
const RUN_LOOKUP_PAGE: u32 = 50;

/// The run a subcommand targets: the given id, or the newest run of the branch.
async fn resolve_run(source: &Source, client: &dyn RemoteClient, id: Option<u64>) -> Result<Run> {
    let runs = match id {
        Some(_) => client.fetch_runs(source, None, None, 1, RUN_LOOKUP_PAGE).await?,
        None => {
            client
                .fetch_runs(source, source.branch.as_deref(), None, 1, 1)
                .await?
        }
    };
    match id {
        Some(id) => runs
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| eyre!("run {id} not found among recent runs of {}", source.slug())),
        None => runs.into_iter().next().ok_or_else(|| {
            eyre!(
                "no workflow runs found for {} on {}",
                source.slug(),
                source.branch_label()
            )
        }),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(cli::is_confirmation(&answer))
}

fn setup_verbose_logging() -> Result<()> {
    let state_dir = dirs_next_or_fallback();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "ghmon v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn dirs_next_or_fallback() -> PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        PathBuf::from(state).join("ghmon")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local").join("state").join("ghmon")
    } else {
        PathBuf::from("/tmp/ghmon")
    }
}
