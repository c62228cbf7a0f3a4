//! Top-level file matching for the watched folder.
//!
//! Only the immediate children of the root are considered. Category folders
//! live inside the root, so descending would re-match files that were already
//! moved.

use glob::{MatchOptions, Pattern};
use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

/// Match options following the host filesystem's case sensitivity.
pub fn host_match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: !cfg!(any(target_os = "macos", windows)),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Lazily enumerates regular files directly under `root` whose name matches
/// `pattern`.
///
/// # Errors
///
/// Returns an error only if `root` itself cannot be listed. Entries that fail
/// or disappear while the scan is in progress are skipped.
///
/// # Examples
///
/// ```no_run
/// use glob::Pattern;
/// use std::path::Path;
/// use watchdawg::matcher::find_matches;
///
/// let pattern = Pattern::new("*.pdf").unwrap();
/// for path in find_matches(Path::new("/home/me/Downloads"), &pattern).unwrap() {
///     println!("{}", path.display());
/// }
/// ```
pub fn find_matches<'a>(root: &Path, pattern: &'a Pattern) -> io::Result<Matches<'a>> {
    let entries = fs::read_dir(root)?;
    Ok(Matches {
        entries,
        pattern,
        options: host_match_options(),
    })
}

/// Iterator returned by [`find_matches`].
pub struct Matches<'a> {
    entries: ReadDir,
    pattern: &'a Pattern,
    options: MatchOptions,
}

impl Iterator for Matches<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            // file_type() does not follow symlinks, so links and folders are both skipped.
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "entry vanished during scan");
                    continue;
                }
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                tracing::warn!(
                    path = %entry.path().display(),
                    "file name is not valid UTF-8, leaving it unsorted"
                );
                continue;
            };

            if self.pattern.matches_with(name, self.options) {
                return Some(entry.path());
            }
        }
        None
    }
}
