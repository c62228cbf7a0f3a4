/// Category folder creation and file relocation.
///
/// This module provides the two filesystem-mutating operations of the daemon:
/// making sure every category folder exists under the watched root, and
/// moving a matched file into its category folder with a single rename.
use crate::file_category::CategoryTable;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The original path of the file before the move.
    pub original_path: PathBuf,
    /// The path of the file inside its category folder.
    pub new_path: PathBuf,
    /// The category the file was moved to.
    pub category: String,
}

/// What [`FileOrganizer::relocate`] did with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file was renamed into its category folder.
    Moved(Operation),
    /// The file is still being downloaded and was left in place.
    SkippedTransient,
}

/// Errors that can occur during file organization operations.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a category directory.
    #[error("can't create category folder {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to move a file to its category directory.
    #[error("can't move file {} to {}: {source}", file.display(), destination.display())]
    FileMoveFailure {
        file: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A file with the same name already exists in the category folder.
    #[error("can't move file {}: {} already exists", file.display(), destination.display())]
    DestinationExists {
        file: PathBuf,
        destination: PathBuf,
    },
    /// The base directory path is invalid or doesn't exist.
    #[error("invalid base path {}: {source}", path.display())]
    InvalidBasePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Listing the root for a rule failed.
    #[error("can't scan {} for '{pattern}': {source}", root.display())]
    ScanFailed {
        root: PathBuf,
        pattern: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Recognizes in-progress downloads by their file name suffix.
#[derive(Debug, Clone, Default)]
pub struct TransientFilter {
    suffixes: Vec<String>,
}

impl TransientFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(Into::<String>::into)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Returns true if the file name ends with one of the configured suffixes.
    pub fn is_transient(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

/// Creates category folders and moves files into them.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Ensures every category referenced by `table` exists as a folder under `base_path`.
    ///
    /// Existing folders are left alone. Returns the folders that were created.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBasePath` if `base_path` is not a directory, and
    /// `DirectoryCreationFailed` for any creation failure other than the
    /// folder already existing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use watchdawg::config::CategoryRule;
    /// use watchdawg::file_category::CategoryTable;
    /// use watchdawg::file_organizer::FileOrganizer;
    ///
    /// let table = CategoryTable::new(&[CategoryRule::new("PDF", ".pdf", "Documents")]).unwrap();
    /// let created = FileOrganizer::ensure_category_folders(Path::new("/home/me/Downloads"), &table);
    /// ```
    pub fn ensure_category_folders(
        base_path: &Path,
        table: &CategoryTable,
    ) -> OrganizeResult<Vec<PathBuf>> {
        Self::check_base_path(base_path)?;

        let mut created = Vec::new();
        for category in table.categories() {
            let category_path = base_path.join(category);
            if Self::ensure_folder(&category_path)? {
                tracing::debug!(folder = %category_path.display(), "created category folder");
                created.push(category_path);
            } else {
                tracing::debug!(folder = %category_path.display(), "category folder already exists");
            }
        }
        Ok(created)
    }

    /// Moves `file_path` into `base_path/category_dir_name/`.
    ///
    /// In-progress downloads are skipped. An existing file at the destination
    /// is never overwritten; the move fails with `DestinationExists` instead.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use watchdawg::file_organizer::{FileOrganizer, MoveOutcome, TransientFilter};
    ///
    /// let transient = TransientFilter::new([".crdownload", ".part", ".tmp"]);
    /// match FileOrganizer::relocate(
    ///     Path::new("/home/me/Downloads"),
    ///     "Documents",
    ///     Path::new("/home/me/Downloads/report.pdf"),
    ///     &transient,
    /// ) {
    ///     Ok(MoveOutcome::Moved(op)) => println!("moved to {}", op.new_path.display()),
    ///     Ok(MoveOutcome::SkippedTransient) => {}
    ///     Err(e) => eprintln!("ERROR: {}", e),
    /// }
    /// ```
    pub fn relocate(
        base_path: &Path,
        category_dir_name: &str,
        file_path: &Path,
        transient: &TransientFilter,
    ) -> OrganizeResult<MoveOutcome> {
        if transient.is_transient(file_path) {
            tracing::debug!(file = %file_path.display(), "skipping in-progress download");
            return Ok(MoveOutcome::SkippedTransient);
        }

        let category_path = base_path.join(category_dir_name);

        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::FileMoveFailure {
                file: file_path.to_path_buf(),
                destination: category_path.clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "file has no name component",
                ),
            })?;

        let destination_path = category_path.join(file_name);

        // rename(2) replaces an existing file, so refuse up front.
        if fs::symlink_metadata(&destination_path).is_ok() {
            return Err(OrganizeError::DestinationExists {
                file: file_path.to_path_buf(),
                destination: destination_path,
            });
        }

        fs::rename(file_path, &destination_path).map_err(|e| OrganizeError::FileMoveFailure {
            file: file_path.to_path_buf(),
            destination: destination_path.clone(),
            source: e,
        })?;

        tracing::debug!(
            from = %file_path.display(),
            to = %destination_path.display(),
            "moved file"
        );

        Ok(MoveOutcome::Moved(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination_path,
            category: category_dir_name.to_string(),
        }))
    }

    fn check_base_path(base_path: &Path) -> OrganizeResult<()> {
        match fs::metadata(base_path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(OrganizeError::InvalidBasePath {
                path: base_path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            }),
            Err(e) => Err(OrganizeError::InvalidBasePath {
                path: base_path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Creates a single folder. Returns false if it was already there.
    fn ensure_folder(path: &Path) -> OrganizeResult<bool> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }

        match builder.create(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
            Err(e) => Err(OrganizeError::DirectoryCreationFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryRule;
    use std::fs;
    use tempfile::TempDir;

    fn transient() -> TransientFilter {
        TransientFilter::new([".crdownload", ".part", ".tmp"])
    }

    fn table() -> CategoryTable {
        CategoryTable::new(&[
            CategoryRule::new("PDF", ".pdf", "Documents"),
            CategoryRule::new("Text", ".txt", "Documents"),
            CategoryRule::new("Zip", ".zip", "Archives"),
        ])
        .unwrap()
    }

    #[test]
    fn test_ensure_category_folders_creates_each_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let created = FileOrganizer::ensure_category_folders(base_path, &table()).unwrap();

        assert_eq!(
            created,
            vec![base_path.join("Documents"), base_path.join("Archives")]
        );
        assert!(base_path.join("Documents").is_dir());
        assert!(base_path.join("Archives").is_dir());
    }

    #[test]
    fn test_ensure_category_folders_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).unwrap();
        fs::write(base_path.join("Documents").join("keep.pdf"), "keep").unwrap();

        let first = FileOrganizer::ensure_category_folders(base_path, &table()).unwrap();
        let second = FileOrganizer::ensure_category_folders(base_path, &table()).unwrap();

        assert_eq!(first, vec![base_path.join("Archives")]);
        assert!(second.is_empty());
        assert!(base_path.join("Documents").join("keep.pdf").exists());
    }

    #[test]
    fn test_ensure_category_folders_fails_when_file_blocks_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("Documents"), "not a folder").unwrap();

        let result = FileOrganizer::ensure_category_folders(base_path, &table());
        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
    }

    #[test]
    fn test_ensure_category_folders_invalid_base_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("missing");

        let result = FileOrganizer::ensure_category_folders(&missing, &table());
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_category_folder_is_owner_writable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        FileOrganizer::ensure_category_folders(temp_dir.path(), &table()).unwrap();

        let mode = fs::metadata(temp_dir.path().join("Documents"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o700, 0o700);
    }

    #[test]
    fn test_relocate_moves_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).unwrap();
        let file_path = base_path.join("note.txt");
        fs::write(&file_path, "hello").unwrap();

        let outcome =
            FileOrganizer::relocate(base_path, "Documents", &file_path, &transient()).unwrap();

        let moved = base_path.join("Documents").join("note.txt");
        assert_eq!(
            outcome,
            MoveOutcome::Moved(Operation {
                original_path: file_path.clone(),
                new_path: moved.clone(),
                category: "Documents".to_string(),
            })
        );
        assert!(!file_path.exists());
        assert_eq!(fs::read_to_string(moved).unwrap(), "hello");
    }

    #[test]
    fn test_relocate_skips_transient_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).unwrap();

        for name in ["a.pdf.crdownload", "b.pdf.part", "c.pdf.tmp"] {
            let file_path = base_path.join(name);
            fs::write(&file_path, "partial").unwrap();

            let outcome =
                FileOrganizer::relocate(base_path, "Documents", &file_path, &transient()).unwrap();

            assert_eq!(outcome, MoveOutcome::SkippedTransient);
            assert!(file_path.exists());
        }
    }

    #[test]
    fn test_relocate_never_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).unwrap();
        fs::write(base_path.join("Documents").join("a.pdf"), "old").unwrap();
        let file_path = base_path.join("a.pdf");
        fs::write(&file_path, "new").unwrap();

        let result = FileOrganizer::relocate(base_path, "Documents", &file_path, &transient());

        assert!(matches!(result, Err(OrganizeError::DestinationExists { .. })));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(base_path.join("Documents").join("a.pdf")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_relocate_missing_category_folder_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("a.pdf");
        fs::write(&file_path, "x").unwrap();

        let result = FileOrganizer::relocate(base_path, "Documents", &file_path, &transient());

        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
        assert!(file_path.exists());
    }

    #[test]
    fn test_transient_filter_ignores_empty_suffixes() {
        let filter = TransientFilter::new(["", ".part"]);
        assert_eq!(filter.suffixes(), &[".part".to_string()]);
        assert!(!filter.is_transient(Path::new("movie.mkv")));
        assert!(filter.is_transient(Path::new("movie.mkv.part")));
    }

    #[cfg(unix)]
    #[test]
    fn test_transient_filter_handles_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let filter = TransientFilter::new([".part"]);
        let partial = Path::new("/downloads").join(OsStr::from_bytes(b"clip\xfe.part"));
        let finished = Path::new("/downloads").join(OsStr::from_bytes(b"clip\xfe.mkv"));

        assert!(filter.is_transient(&partial));
        assert!(!filter.is_transient(&finished));
    }
}
