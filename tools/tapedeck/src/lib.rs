//! Record/replay stand-in for an HTTP client in tests.
//!
//! Responses are stored one per request as raw HTTP/1.1 messages under a
//! storage root, named by the request's [`fingerprint`](fingerprint::fingerprint).
//! [`dispatcher::ReplayClient`] answers only from those files;
//! [`dispatcher::RecordingClient`] falls back to a real client and saves what
//! it returns.

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod fingerprint;
pub mod logging;
pub mod runtime;
pub mod store;
pub mod types;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use config::{load_config, CliOverrides};
use dispatcher::Dispatcher;
use errors::TapedeckError;
use fingerprint::fingerprint;
use runtime::{HttpClient, ProductionRuntime, Terminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::FileStore;
use types::{DispatchMode, Request, Response};

#[derive(Debug, Clone, Parser)]
#[command(name = "tapedeck")]
#[command(about = "Inspect and maintain recorded HTTP responses")]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Storage root; overrides `store.root` from the config file.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// `replay` or `record`; overrides `dispatch.mode` from the config file.
    #[arg(long, global = true, value_parser = parse_mode)]
    pub mode: Option<DispatchMode>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the fingerprint of a request.
    Fingerprint { method: String, url: String },
    /// Print the record path of a request.
    Path { method: String, url: String },
    /// Print the recorded response for a request.
    Show { method: String, url: String },
    /// List every recorded request.
    List,
    /// Parse every record and report the ones that are malformed.
    Verify,
    /// Delete the record for a request.
    Evict { method: String, url: String },
    /// Send a request through the configured dispatcher and print the response.
    Fetch { method: String, url: String },
}

fn parse_mode(value: &str) -> Result<DispatchMode, String> {
    DispatchMode::parse_cli(value).ok_or_else(|| {
        format!(
            "expected {:?} or {:?}",
            DispatchMode::Replay.as_str(),
            DispatchMode::Record.as_str()
        )
    })
}

pub fn run() -> Result<i32, TapedeckError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| TapedeckError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &Path,
    runtime: &ProductionRuntime,
) -> Result<i32, TapedeckError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(TapedeckError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        root: cli.root.clone(),
        mode: cli.mode,
    };
    let cfg = load_config(&overrides, cwd, runtime.file_system.as_ref())?;
    let store = FileStore::new(cfg.store.root.clone(), runtime.file_system.clone());
    let terminal = runtime.terminal.as_ref();

    match cli.command {
        Command::Fingerprint { method, url } => {
            terminal.write_line(&fingerprint(&method, &url))?;
            Ok(0)
        }
        Command::Path { method, url } => {
            let path = store.path_for(&Request::new(method, url));
            terminal.write_line(&path.display().to_string())?;
            Ok(0)
        }
        Command::Show { method, url } => {
            let response = store.load(&Request::new(method, url))?;
            print_response(terminal, &response)?;
            Ok(0)
        }
        Command::List => {
            for entry in store.entries()? {
                terminal.write_line(&format!("{} {}", entry.request.method, entry.request.url))?;
            }
            Ok(0)
        }
        Command::Verify => {
            let entries = store.entries()?;
            let mut malformed = 0usize;
            for entry in &entries {
                if let Err(err) = store.load(&entry.request) {
                    malformed += 1;
                    terminal.write_line(&format!(
                        "malformed {} {} ({}): {err}",
                        entry.request.method,
                        entry.request.url,
                        entry.path.display()
                    ))?;
                }
            }
            terminal.write_line(&format!(
                "verified {} records, {malformed} malformed",
                entries.len()
            ))?;
            Ok(if malformed == 0 { 0 } else { 1 })
        }
        Command::Evict { method, url } => {
            let path = store.remove(&Request::new(method, url))?;
            terminal.write_line(&format!("removed {}", path.display()))?;
            Ok(0)
        }
        Command::Fetch { method, url } => {
            let real = match cfg.dispatch.mode {
                DispatchMode::Replay => None,
                DispatchMode::Record => live_client()?,
            };
            let dispatcher = Dispatcher::from_config(&cfg, runtime.file_system.clone(), real)?;
            let response = dispatcher.execute(&Request::new(method, url))?;
            print_response(terminal, &response)?;
            Ok(0)
        }
    }
}

fn print_response(terminal: &dyn Terminal, response: &Response) -> Result<(), TapedeckError> {
    terminal.write_line(&format!("HTTP/1.1 {:03}", response.status))?;
    for (name, value) in response.headers.iter() {
        terminal.write_line(&format!("{name}: {value}"))?;
    }
    terminal.write_line("")?;
    terminal.write_line(&response.body_text())
}

#[cfg(feature = "reqwest-client")]
fn live_client() -> Result<Option<Arc<dyn HttpClient>>, TapedeckError> {
    let client: Arc<dyn HttpClient> = Arc::new(runtime::reqwest_client::ReqwestClient::new()?);
    Ok(Some(client))
}

/// Without the `reqwest-client` feature there is no real client, so record
/// mode is rejected by [`Dispatcher::from_config`].
#[cfg(not(feature = "reqwest-client"))]
fn live_client() -> Result<Option<Arc<dyn HttpClient>>, TapedeckError> {
    Ok(None)
}

pub fn render_help() -> Result<String, TapedeckError> {
    let mut cmd = Cli::command();
    let mut buffer = Vec::new();
    cmd.write_long_help(&mut buffer)
        .map_err(|e| TapedeckError::Io(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TapedeckError::Io(e.to_string()))
}
