use std::fs;
use std::path::Path;

use crate::error::SearchError;
use crate::types::Entry;

/// ディレクトリ直下の一覧を名前順で取得
///
/// Failing to open `path` itself is an error; entries that cannot be
/// stat'ed are skipped.
pub fn fetch_dir(path: &Path) -> Result<Vec<Entry>, SearchError> {
    let read_dir = fs::read_dir(path).map_err(|source| SearchError::ReadDir {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for item in read_dir {
        match item {
            Ok(dir_entry) => {
                let entry_path = dir_entry.path();
                match Entry::stat(&entry_path) {
                    Some(entry) => entries.push(entry),
                    None => log::debug!("skipping unreadable entry {}", entry_path.display()),
                }
            }
            Err(e) => log::warn!("error reading entry in {}: {}", path.display(), e),
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
