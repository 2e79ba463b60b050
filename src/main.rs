//! dirscout - directory listing and directive-query search
//!
//! Command-line usage:
//!   dirscout [PATH]                      - List PATH
//!   dirscout [PATH] "ext:go contents:x"  - Search PATH
//!   dirscout --list-engines              - Show external engines

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    cli::run_cli().await
}
