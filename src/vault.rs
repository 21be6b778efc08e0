//! Document storage.
//!
//! [`VaultStore`] abstracts the corpus so the pipeline and tests never touch
//! the filesystem directly. [`FsVault`] is the real implementation: a
//! directory tree of markdown files, scanned with include/exclude glob sets
//! and written back atomically via a temp file in the same directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors surfaced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("document not found: {0}")]
    NotFound(String),
}

/// One document: a stable identifier plus its full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Vault-relative path with forward slashes.
    pub id: String,
    pub text: String,
}

/// Storage interface for a document corpus.
pub trait VaultStore: Send + Sync {
    /// Lists all documents, sorted by id.
    fn list_documents(&self) -> Result<Vec<Document>, VaultError>;

    /// Reads one document by id.
    fn read_document(&self, id: &str) -> Result<Document, VaultError>;

    /// Writes a document's full text back, replacing the previous content.
    fn write_document(&self, id: &str, text: &str) -> Result<(), VaultError>;

    /// Lists folder ids (vault-relative, sorted) that contain at least one
    /// matching document.
    fn list_folders(&self) -> Result<Vec<String>, VaultError>;
}

const DEFAULT_INCLUDE: &str = "**/*.md";
const DEFAULT_EXCLUDES: &[&str] = &[".git/**", "target/**", "node_modules/**"];

/// Filesystem-backed vault rooted at a directory.
pub struct FsVault {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl FsVault {
    /// Opens a vault with the default markdown include pattern.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VaultError> {
        Self::with_patterns(root, &[DEFAULT_INCLUDE], DEFAULT_EXCLUDES)
    }

    /// Opens a vault scoped to a subfolder of the corpus.
    pub fn open_folder(
        root: impl Into<PathBuf>,
        folder: &str,
    ) -> Result<Self, VaultError> {
        let folder = folder.trim_matches('/');
        let include = format!("{folder}/**/*.md");
        Self::with_patterns(root, &[&include], DEFAULT_EXCLUDES)
    }

    pub fn with_patterns(
        root: impl Into<PathBuf>,
        includes: &[&str],
        excludes: &[&str],
    ) -> Result<Self, VaultError> {
        Ok(FsVault {
            root: root.into(),
            include: build_glob_set(includes)?,
            exclude: build_glob_set(excludes)?,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Vault-relative id for an absolute path, normalized to forward slashes.
    fn relative_id(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut id = String::new();
        for component in relative.components() {
            if !id.is_empty() {
                id.push('/');
            }
            id.push_str(&component.as_os_str().to_string_lossy());
        }
        Some(id)
    }

    fn document_ids(&self) -> Result<Vec<String>, VaultError> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| VaultError::Io {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(id) = self.relative_id(entry.path())
                && self.matches(&id)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn build_glob_set(patterns: &[&str]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

impl VaultStore for FsVault {
    fn list_documents(&self) -> Result<Vec<Document>, VaultError> {
        self.document_ids()?
            .into_iter()
            .map(|id| self.read_document(&id))
            .collect()
    }

    fn read_document(&self, id: &str) -> Result<Document, VaultError> {
        let path = self.root.join(id);
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                VaultError::NotFound(id.to_string())
            } else {
                VaultError::Io { path, source }
            }
        })?;
        Ok(Document {
            id: id.to_string(),
            text,
        })
    }

    fn write_document(&self, id: &str, text: &str) -> Result<(), VaultError> {
        let path = self.root.join(id);
        let dir = path.parent().unwrap_or(&self.root);

        // Write-then-rename so a crash never leaves a half-written document.
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| VaultError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        fs::write(tmp.path(), text).map_err(|source| VaultError::Io {
            path: tmp.path().to_path_buf(),
            source,
        })?;
        tmp.persist(&path).map_err(|e| VaultError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    fn list_folders(&self) -> Result<Vec<String>, VaultError> {
        let mut folders: Vec<String> = Vec::new();
        for id in self.document_ids()? {
            let folder = match id.rfind('/') {
                Some(i) => id[..i].to_string(),
                None => String::new(),
            };
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }
        folders.sort();
        Ok(folders)
    }
}
