//! sfterm - a framed full-screen terminal hosting one interactive shell
//!
//! The display is split into a banner at the top, a bordered frame in the
//! middle that shows the live shell, and a two-line control bar at the
//! bottom. The shell runs on a pseudo terminal sized to the inside of the
//! frame, and is resized whenever the display is.
//!
//! # Quick Start
//!
//! ```text
//! sfterm                 # Start with the configured or login shell
//! sfterm -s /bin/zsh     # Start a specific program
//! sfterm --no-engine     # Run without content rendering
//! ```

mod config;
mod core;
mod ui;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{resolve_shell, Config};
use crate::core::engine::EngineKind;
use crate::core::mux::{Multiplexer, MuxOptions, Termination};
use crate::core::pty::ChildCommand;
use crate::ui::keymapper::CrosstermKeys;
use crate::ui::surface::{CrosstermSurface, DisplaySurface};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides given on the command line
#[derive(Debug, Default)]
struct CliArgs {
    shell: Option<String>,
    no_engine: bool,
}

fn print_version() {
    eprintln!("sfterm {}", VERSION);
}

fn print_help() {
    eprintln!("sfterm {} - A framed terminal for one interactive shell", VERSION);
    eprintln!();
    eprintln!("Usage: sfterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --shell <CMD>     Program to run (must be an executable file)");
    eprintln!("      --no-engine       Keep the session but do not render its output");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TOP_HEIGHT            Banner rows (default 6)");
    eprintln!("  MID_HEIGHT            Frame rows, border included (default 12)");
    eprintln!("  INSET_LEFT            Columns left of the frame (default 2)");
    eprintln!("  INSET_RIGHT           Columns right of the frame (default 2)");
    eprintln!("  SHELL_CMD             Program to run");
    eprintln!("  SFTERM_LOG            Log filter (default info)");
    eprintln!();
    eprintln!("Configuration: ~/.sfterm/config.toml");
    eprintln!("Log file:      ~/.sfterm/sfterm.log");
    eprintln!();
    eprintln!("Exit: leave the shell (exit or Ctrl+D)");
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliArgs, String> {
    let args: Vec<String> = args.into_iter().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--shell" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing shell argument".to_string());
                }
                cli.shell = Some(args[i].clone());
            }
            "--no-engine" => {
                cli.no_engine = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(cli)
}

/// Log to `~/.sfterm/sfterm.log`; the display belongs to the shell
fn init_logging() {
    let log_path = config::home_dir()
        .map(|h| h.join(".sfterm").join("sfterm.log"))
        .unwrap_or_else(|| PathBuf::from("sfterm.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("SFTERM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> ExitCode {
    let cli = match parse_args(env::args()) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            return ExitCode::from(1);
        }
    };

    init_logging();
    info!("sfterm {} starting...", VERSION);

    let mut config = Config::load();
    if cli.shell.is_some() {
        config.shell = cli.shell;
    }
    if cli.no_engine {
        config.engine = EngineKind::None;
    }

    match run(&config) {
        Ok(Termination::SpawnFailed(e)) => {
            eprintln!("sfterm: {}", e);
            ExitCode::from(1)
        }
        Ok(termination) => {
            let code = termination.exit_code();
            info!("Exiting with code {}", code);
            ExitCode::from(code.clamp(0, 255) as u8)
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("sfterm: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Run one session; the display is restored before this returns
fn run(config: &Config) -> anyhow::Result<Termination> {
    let login_shell = env::var("SHELL").ok();
    let shell = resolve_shell(config.shell.as_deref(), login_shell.as_deref());
    info!("Shell: {}", shell.display());

    let command = ChildCommand::new(&shell)
        .env("SFTERM", "1")
        .env("SFTERM_VERSION", VERSION);

    let mut surface = CrosstermSurface::new();
    surface.init().context("Failed to initialize the display")?;
    surface.set_title(&format!("sfterm - {}", shell.display()))?;
    let display = surface.size()?;

    let engine = config.engine.build(display);
    let options = MuxOptions {
        chrome: config.chrome,
        theme: config.theme.clone(),
        poll_interval: config.poll_interval(),
    };

    let mut mux = Multiplexer::new(surface, CrosstermKeys, engine, options);
    mux.start(&command)?;
    mux.run()?;

    mux.into_termination()
        .context("Run loop stopped without a termination reason")
}
