//! ugrep adapter
//!
//! ugrep has no per-file size cap; the worker's post-filter applies the
//! content size limit to its results instead.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::{EngineAdapter, EngineKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct UgrepAdapter;

#[async_trait]
impl EngineAdapter for UgrepAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::Ugrep
    }

    fn candidates(&self) -> &'static [&'static str] {
        &["ug", "ugrep"]
    }

    fn build_command(&self, program: &str, pattern: &str, base: &Path, max_depth: usize) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("--recursive")
            .arg("--files-with-matches")
            .arg("--ignore-case")
            .arg("--fixed-strings")
            .arg("--no-messages")
            .arg("--color=never")
            .arg(format!("--depth={max_depth}"))
            .arg("--")
            .arg(pattern)
            .arg(base);
        cmd
    }
}
