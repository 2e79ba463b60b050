//! Asynchronous directory listing and directive-query search.
//!
//! A [`Worker`] serves `FetchDir`/`SearchDir`/`CancelSearch` requests.
//! Searches run either as a builtin walk evaluated by a [`Matcher`] or through
//! an external engine (ripgrep, ugrep) whose output is post-filtered.

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod query;
pub mod types;
pub mod worker;

// 公開API
pub use config::{WorkerConfig, SYSTEM_SKIP_PATHS};
pub use engine::{detect_engines, resolve_command, search_with_engine, EngineInfo, EngineKind};
pub use error::{ConfigError, EngineError, SearchError};
pub use generation::GenerationTracker;
pub use query::{
    is_incomplete, match_glob, parse, Directive, DirectiveKind, DirectiveType, Matcher, Operator,
    Query,
};
pub use types::{Entry, Op, Progress, Request, Response};
pub use worker::{Worker, WorkerHandle};
