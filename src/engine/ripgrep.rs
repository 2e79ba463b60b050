//! ripgrep adapter

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::{EngineAdapter, EngineKind, ENGINE_MAX_FILESIZE};

#[derive(Debug, Default, Clone, Copy)]
pub struct RipgrepAdapter;

#[async_trait]
impl EngineAdapter for RipgrepAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::Ripgrep
    }

    fn candidates(&self) -> &'static [&'static str] {
        &["rg"]
    }

    fn build_command(&self, program: &str, pattern: &str, base: &Path, max_depth: usize) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("--files-with-matches")
            .arg("--ignore-case")
            .arg("--fixed-strings")
            .arg("--no-messages")
            .arg("--color=never")
            .arg("--max-filesize")
            .arg(ENGINE_MAX_FILESIZE)
            .arg("--max-depth")
            .arg(max_depth.to_string())
            .arg("--")
            .arg(pattern)
            .arg(base);
        cmd
    }
}
