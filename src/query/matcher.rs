//! Evaluation of a parsed query against directory entries.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use memmap2::Mmap;
use tokio_util::sync::CancellationToken;

use super::{match_glob, Directive, DirectiveKind, Operator, Query};
use crate::types::Entry;

/// Files larger than this are never content-matched.
pub const MAX_CONTENT_SIZE: u64 = 10 * 1024 * 1024;

/// Reads a file's content for `contents:` directives.
pub type ContentReader = Arc<dyn Fn(&Path) -> io::Result<String> + Send + Sync>;

/// Read the whole file, replacing invalid UTF-8.
pub fn read_lossy() -> ContentReader {
    Arc::new(|path: &Path| {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    })
}

/// Read through a memory map, replacing invalid UTF-8.
pub fn mmap_reader() -> ContentReader {
    Arc::new(|path: &Path| {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(String::new());
        }
        // SAFETY: the map is read-only and dropped before returning; a file
        // truncated underneath us can at worst yield garbage text.
        let map = unsafe { Mmap::map(&file)? };
        Ok(String::from_utf8_lossy(&map).into_owned())
    })
}

/// Wrap `inner` so reads fail with `Interrupted` once `token` is cancelled.
pub fn cancellable(inner: ContentReader, token: CancellationToken) -> ContentReader {
    Arc::new(move |path: &Path| {
        if token.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "search cancelled"));
        }
        inner(path)
    })
}

/// Evaluates every directive of a query against an entry (AND).
#[derive(Clone)]
pub struct Matcher {
    directives: Vec<Directive>,
    reader: ContentReader,
    max_content_size: u64,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("directives", &self.directives)
            .field("max_content_size", &self.max_content_size)
            .finish()
    }
}

impl Matcher {
    pub fn new(query: &Query) -> Self {
        Self {
            directives: query.by_cost(),
            reader: read_lossy(),
            max_content_size: MAX_CONTENT_SIZE,
        }
    }

    pub fn with_reader(mut self, reader: ContentReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_max_content_size(mut self, max_content_size: u64) -> Self {
        self.max_content_size = max_content_size;
        self
    }

    /// True iff every directive matches. An empty query matches everything.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.directives
            .iter()
            .all(|directive| self.matches_directive(directive, entry))
    }

    fn matches_directive(&self, directive: &Directive, entry: &Entry) -> bool {
        match &directive.kind {
            DirectiveKind::Filename(pattern) => match_glob(&entry.name, pattern),
            DirectiveKind::Contents(needle) => self.contents_match(entry, needle),
            DirectiveKind::Ext(ext) => entry.extension() == *ext,
            DirectiveKind::Size { op, bytes } => op.compare(entry.size, *bytes),
            DirectiveKind::Modified { op, time } => match time {
                Some(time) => modified_matches(*op, DateTime::<Local>::from(entry.modified), *time),
                None => true,
            },
            // Consumed by the walker to bound depth.
            DirectiveKind::Recursive { .. } => true,
        }
    }

    fn contents_match(&self, entry: &Entry, needle: &str) -> bool {
        if entry.is_dir || entry.size > self.max_content_size {
            return false;
        }

        match (self.reader)(&entry.path) {
            Ok(content) => content.to_lowercase().contains(&needle.to_lowercase()),
            Err(e) => {
                log::debug!("content read failed for {}: {}", entry.path.display(), e);
                false
            }
        }
    }
}

fn modified_matches(op: Operator, modified: DateTime<Local>, target: DateTime<Local>) -> bool {
    match op {
        Operator::Eq => modified.date_naive() == target.date_naive(),
        _ => op.compare(modified, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn entry(name: &str, size: u64) -> Entry {
        Entry {
            name: name.to_string(),
            path: PathBuf::from("/virtual").join(name),
            is_dir: false,
            size,
            modified: SystemTime::now(),
        }
    }

    fn fixed_content(content: &'static str) -> ContentReader {
        Arc::new(move |_path: &Path| Ok(content.to_string()))
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let matcher = Matcher::new(&parse(""));
        assert!(matcher.matches(&entry("anything.bin", 42)));
    }

    #[test]
    fn test_and_semantics() {
        let matcher =
            Matcher::new(&parse("ext:go contents:func")).with_reader(fixed_content("func main(){}"));
        assert!(matcher.matches(&entry("main.go", 13)));
        assert!(!matcher.matches(&entry("main.py", 13)));
    }

    #[test]
    fn test_contents_case_insensitive() {
        let matcher = Matcher::new(&parse("contents:TODO")).with_reader(fixed_content("// todo: fix"));
        assert!(matcher.matches(&entry("lib.rs", 12)));
    }

    #[test]
    fn test_contents_skips_directories_and_large_files() {
        let matcher = Matcher::new(&parse("contents:x")).with_reader(fixed_content("x"));
        let mut dir = entry("src", 0);
        dir.is_dir = true;
        assert!(!matcher.matches(&dir));
        assert!(!matcher.matches(&entry("huge.log", MAX_CONTENT_SIZE + 1)));
        assert!(matcher.matches(&entry("small.log", MAX_CONTENT_SIZE)));
    }

    #[test]
    fn test_read_error_is_non_match() {
        let failing: ContentReader =
            Arc::new(|_path: &Path| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
        let matcher = Matcher::new(&parse("contents:x")).with_reader(failing);
        assert!(!matcher.matches(&entry("secret.txt", 1)));
    }

    #[test]
    fn test_cancelled_reader_is_non_match() {
        let token = CancellationToken::new();
        token.cancel();
        let matcher = Matcher::new(&parse("contents:x"))
            .with_reader(cancellable(fixed_content("x"), token));
        assert!(!matcher.matches(&entry("a.txt", 1)));
    }

    #[test]
    fn test_size_comparisons() {
        let matcher = Matcher::new(&parse("size:>1kb"));
        assert!(matcher.matches(&entry("big", 2048)));
        assert!(!matcher.matches(&entry("small", 1024)));

        let matcher = Matcher::new(&parse("size:1024"));
        assert!(matcher.matches(&entry("exact", 1024)));
    }

    #[test]
    fn test_modified_directives() {
        let matcher = Matcher::new(&parse("modified:today"));
        assert!(matcher.matches(&entry("fresh.txt", 1)));

        let mut old = entry("old.txt", 1);
        old.modified = SystemTime::now() - Duration::from_secs(60 * 60 * 24 * 30);
        assert!(!matcher.matches(&old));

        let matcher = Matcher::new(&parse("modified:week"));
        assert!(matcher.matches(&entry("fresh.txt", 1)));
        assert!(!matcher.matches(&old));

        let matcher = Matcher::new(&parse("modified:<2000-01-01"));
        assert!(!matcher.matches(&old));
    }

    #[test]
    fn test_unparseable_date_matches_everything() {
        let matcher = Matcher::new(&parse("modified:whenever"));
        assert!(matcher.matches(&entry("any.txt", 1)));
    }

    #[test]
    fn test_recursive_is_ignored() {
        let matcher = Matcher::new(&parse("recursive:3 ext:rs"));
        assert!(matcher.matches(&entry("lib.rs", 1)));
    }

    #[test]
    fn test_readers_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello \xFF world").unwrap();
        assert_eq!(read_lossy()(&path).unwrap(), "hello \u{FFFD} world");
        assert_eq!(mmap_reader()(&path).unwrap(), "hello \u{FFFD} world");

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(mmap_reader()(&empty).unwrap(), "");
    }
}
