//! Command-line front end for the worker.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use log::debug;

use dirscout::{
    detect_engines, is_incomplete, EngineKind, Entry, GenerationTracker, Progress, Request,
    Response, SearchError, Worker, WorkerConfig,
};

/// dirscout - list a directory or search it with a directive query
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to list or search (defaults to current directory)
    pub path: Option<PathBuf>,

    /// Query, e.g. `ext:rs contents:todo recursive:3`. Lists the directory when omitted.
    pub query: Option<String>,

    /// Content-search engine: builtin, ripgrep (rg) or ugrep (ug)
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Binary to run for the selected engine instead of the one on PATH
    #[arg(long)]
    pub engine_cmd: Option<String>,

    /// JSON worker configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show which content-search engines are available
    #[arg(long)]
    pub list_engines: bool,
}

/// CLI実行エントリーポイント
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_engines {
        return show_engines().await;
    }

    let config = match &cli.config {
        Some(path) => WorkerConfig::from_file(path)?,
        None => WorkerConfig::default(),
    };

    let root = match cli.path {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let engine = match cli.engine.as_deref() {
        Some(name) => match EngineKind::from_name(name) {
            Some(kind) => kind,
            None => bail!("unknown engine {:?}", name),
        },
        None => EngineKind::Builtin,
    };

    let raw_query = cli.query.unwrap_or_default();
    let tracker = GenerationTracker::new();
    let generation = tracker.issue();

    let request = if raw_query.trim().is_empty() {
        Request::fetch(&root, generation)
    } else if is_incomplete(&raw_query) {
        eprintln!("query {:?} ends with an empty directive; listing directory", raw_query);
        Request::fetch(&root, generation)
    } else {
        Request::search(&root, raw_query, generation).with_engine(engine, cli.engine_cmd)
    };

    debug!("Submitting {:?}", request);
    let response = run_request(config, request, &tracker).await?;
    print_response(&response)
}

async fn run_request(
    config: WorkerConfig,
    request: Request,
    tracker: &GenerationTracker,
) -> Result<Response> {
    let mut handle = Worker::spawn(config);
    if !handle.submit(request) {
        bail!("worker stopped before accepting the request");
    }

    loop {
        tokio::select! {
            response = handle.responses.recv() => {
                let Some(response) = response else {
                    bail!("worker exited without a response");
                };
                if let Some(response) = tracker.accept(response.generation, response) {
                    return Ok(response);
                }
            }
            Some(progress) = handle.progress.recv() => {
                if let Some(progress) = tracker.accept(progress.generation, progress) {
                    print_progress(&progress);
                }
            }
        }
    }
}

fn print_progress(progress: &Progress) {
    match progress.percent() {
        Some(percent) => eprintln!("[{:>3}%] {}", percent, progress.label),
        None => eprintln!("[....] {}", progress.label),
    }
}

fn print_response(response: &Response) -> Result<()> {
    if response.cancelled {
        eprintln!("search cancelled");
        return Ok(());
    }

    for entry in &response.entries {
        println!("{}", format_entry(entry));
    }

    match &response.error {
        // Engine failures were already retried with the builtin walk.
        Some(e @ SearchError::Engine(_)) => {
            eprintln!("warning: {}", e);
            Ok(())
        }
        Some(e) => bail!("{}", e),
        None => Ok(()),
    }
}

fn format_entry(entry: &Entry) -> String {
    let modified: DateTime<Local> = entry.modified.into();
    format!(
        "{} {:>10} {} {}",
        if entry.is_dir { 'd' } else { '-' },
        entry.size,
        modified.format("%Y-%m-%d %H:%M"),
        entry.path.display()
    )
}

/// 利用可能なエンジン情報の表示
async fn show_engines() -> Result<()> {
    for info in detect_engines().await {
        let status = if info.available { "available" } else { "not found" };
        if info.command.is_empty() {
            println!("{:<8} {:<10} {}", info.name, status, info.version);
        } else {
            println!("{:<8} {:<10} {} ({})", info.name, status, info.version, info.command);
        }
    }
    Ok(())
}
