//! Directive-based query language for directory search.
//!
//! A query is a whitespace-separated list of tokens. Tokens of the form
//! `name:value` with a recognized name become typed directives, everything
//! else is a filename filter:
//!
//! - `name:` / `file:` / `filename:` - glob-lite filename match
//! - `contents:` / `content:` / `text:` / `body:` - case-insensitive content substring
//! - `ext:` / `extension:` / `type:` - file extension
//! - `size:` - size comparison (`size:>1MB`, `size:<=10kb`)
//! - `modified:` / `date:` / `mtime:` - modification date (`modified:>2024-01-01`, `mtime:week`)
//! - `recursive:` / `recurse:` / `r:` / `depth:` - walk depth control
//!
//! All directives must match (AND). Parsing never fails.

mod date;
mod glob;
mod incomplete;
mod matcher;
mod parser;
mod size;

use chrono::{DateTime, Local};

pub use date::parse_date;
pub use glob::match_glob;
pub use incomplete::is_incomplete;
pub use matcher::{cancellable, mmap_reader, read_lossy, ContentReader, Matcher, MAX_CONTENT_SIZE};
pub use parser::{parse, tokenize};
pub use size::parse_size;

/// Default walk depth for a bare `recursive:` directive.
pub const DEFAULT_RECURSIVE_DEPTH: u32 = 2;

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
}

impl Operator {
    /// Split a leading operator off `raw`; returns `None` if there is none.
    pub fn split_prefix(raw: &str) -> (Option<Operator>, &str) {
        for (prefix, op) in [
            (">=", Operator::Gte),
            ("<=", Operator::Lte),
            (">", Operator::Gt),
            ("<", Operator::Lt),
            ("=", Operator::Eq),
        ] {
            if let Some(rest) = raw.strip_prefix(prefix) {
                return (Some(op), rest.trim());
            }
        }
        (None, raw.trim())
    }

    pub fn compare<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            Operator::Gt => left > right,
            Operator::Lt => left < right,
            Operator::Gte => left >= right,
            Operator::Lte => left <= right,
            Operator::Eq => left == right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Eq => "=",
        }
    }
}

/// Typed payload of a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    Filename(String),
    Contents(String),
    /// Lower-cased, always with a leading dot.
    Ext(String),
    Size { op: Operator, bytes: u64 },
    /// `time` is `None` when the date could not be parsed; such a directive matches everything.
    Modified {
        op: Operator,
        time: Option<DateTime<Local>>,
    },
    /// `depth` 0 means "no usable depth given"; the worker substitutes its fallback.
    Recursive { depth: u32 },
}

/// ディレクティブの種別（値なし）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveType {
    Filename,
    Contents,
    Ext,
    Size,
    Modified,
    Recursive,
}

impl DirectiveType {
    /// Look up a directive name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "filename" | "name" | "file" => Some(DirectiveType::Filename),
            "contents" | "content" | "text" | "body" => Some(DirectiveType::Contents),
            "ext" | "extension" | "type" => Some(DirectiveType::Ext),
            "size" => Some(DirectiveType::Size),
            "modified" | "date" | "mtime" => Some(DirectiveType::Modified),
            "recursive" | "recurse" | "r" | "depth" => Some(DirectiveType::Recursive),
            _ => None,
        }
    }

    /// Relative evaluation cost; cheaper directives are checked first.
    fn cost(self) -> u8 {
        match self {
            DirectiveType::Recursive => 0,
            DirectiveType::Ext => 1,
            DirectiveType::Filename => 2,
            DirectiveType::Size => 3,
            DirectiveType::Modified => 4,
            DirectiveType::Contents => 10,
        }
    }
}

/// One clause of a parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Value text as written, with quotes removed.
    pub value: String,
    pub kind: DirectiveKind,
}

impl Directive {
    pub fn directive_type(&self) -> DirectiveType {
        match self.kind {
            DirectiveKind::Filename(_) => DirectiveType::Filename,
            DirectiveKind::Contents(_) => DirectiveType::Contents,
            DirectiveKind::Ext(_) => DirectiveType::Ext,
            DirectiveKind::Size { .. } => DirectiveType::Size,
            DirectiveKind::Modified { .. } => DirectiveType::Modified,
            DirectiveKind::Recursive { .. } => DirectiveType::Recursive,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            DirectiveKind::Size { op, .. } | DirectiveKind::Modified { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn is_contents(&self) -> bool {
        matches!(self.kind, DirectiveKind::Contents(_))
    }
}

/// An ordered list of directives, combined with AND.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub raw: String,
    pub directives: Vec<Directive>,
}

impl Query {
    /// An empty query matches everything.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Pattern of the first content directive, if any.
    pub fn contents_pattern(&self) -> Option<&str> {
        self.directives.iter().find_map(|directive| match &directive.kind {
            DirectiveKind::Contents(pattern) => Some(pattern.as_str()),
            _ => None,
        })
    }

    pub fn has_contents(&self) -> bool {
        self.directives.iter().any(Directive::is_contents)
    }

    /// Depth of the last `recursive:` directive, if the query has one.
    pub fn recursion(&self) -> Option<u32> {
        self.directives
            .iter()
            .rev()
            .find_map(|directive| match directive.kind {
                DirectiveKind::Recursive { depth } => Some(depth),
                _ => None,
            })
    }

    /// Walk depth for this query: 1 without a `recursive:` directive,
    /// the directive's depth when positive, otherwise `fallback`.
    pub fn max_depth(&self, fallback: usize) -> usize {
        match self.recursion() {
            None => 1,
            Some(0) => fallback,
            Some(depth) => depth as usize,
        }
    }

    /// Copy of this query without content directives.
    pub fn without_contents(&self) -> Query {
        Query {
            raw: self.raw.clone(),
            directives: self
                .directives
                .iter()
                .filter(|directive| !directive.is_contents())
                .cloned()
                .collect(),
        }
    }

    /// Directives sorted cheapest first; order inside a cost class is preserved.
    pub(crate) fn by_cost(&self) -> Vec<Directive> {
        let mut sorted = self.directives.clone();
        sorted.sort_by_key(|directive| directive.directive_type().cost());
        sorted
    }
}
