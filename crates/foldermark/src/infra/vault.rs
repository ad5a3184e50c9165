//! Storage adapters for the note vault.
//!
//! Vault paths are relative, `/`-separated strings (`Notes/index.md`). The empty string denotes
//! the vault root.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Storage operations the resolver relies on.
pub trait Vault: Send + Sync {
    /// Whether any entry (folder or document) exists at `path`.
    fn exists(&self, path: &str) -> io::Result<bool>;

    /// Whether `path` names an existing document. Folders and the vault root are not documents.
    fn is_document(&self, path: &str) -> io::Result<bool>;

    /// Create a single folder. Fails when the parent is missing or the entry already exists.
    fn create_folder(&self, path: &str) -> io::Result<()>;

    /// Create a document with the given content. Fails when the entry already exists.
    fn create_document(&self, path: &str, content: &str) -> io::Result<()>;

    fn delete_document(&self, path: &str) -> io::Result<()>;

    fn read_document(&self, path: &str) -> io::Result<String>;
}

impl<V: Vault + ?Sized> Vault for &V {
    fn exists(&self, path: &str) -> io::Result<bool> {
        (**self).exists(path)
    }

    fn is_document(&self, path: &str) -> io::Result<bool> {
        (**self).is_document(path)
    }

    fn create_folder(&self, path: &str) -> io::Result<()> {
        (**self).create_folder(path)
    }

    fn create_document(&self, path: &str, content: &str) -> io::Result<()> {
        (**self).create_document(path, content)
    }

    fn delete_document(&self, path: &str) -> io::Result<()> {
        (**self).delete_document(path)
    }

    fn read_document(&self, path: &str) -> io::Result<String> {
        (**self).read_document(path)
    }
}

/// Vault backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalVault {
    root: PathBuf,
}

impl LocalVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a vault path. `.` and `..` segments are dropped.
    pub fn full_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !matches!(*segment, "" | "." | ".."))
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    /// Convert a filesystem path into a vault path.
    ///
    /// Relative inputs are taken as already relative to the vault root. Returns `None` for
    /// absolute paths outside the root and for paths containing `..`.
    pub fn vault_path(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?.to_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(segments.join("/"))
    }
}

impl Vault for LocalVault {
    fn exists(&self, path: &str) -> io::Result<bool> {
        self.full_path(path).try_exists()
    }

    fn is_document(&self, path: &str) -> io::Result<bool> {
        if path.split('/').all(|segment| matches!(segment, "" | ".")) {
            return Ok(false);
        }
        match fs::metadata(self.full_path(path)) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn create_folder(&self, path: &str) -> io::Result<()> {
        fs::create_dir(self.full_path(path))
    }

    fn create_document(&self, path: &str, content: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.full_path(path))?;
        file.write_all(content.as_bytes())
    }

    fn delete_document(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.full_path(path))
    }

    fn read_document(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.full_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_folder_requires_parent() -> io::Result<()> {
        let temp = tempfile::tempdir()?;
        let vault = LocalVault::new(temp.path());

        assert!(vault.create_folder("missing/child").is_err());
        vault.create_folder("parent")?;
        vault.create_folder("parent/child")?;
        assert!(vault.exists("parent/child")?);
        assert!(vault.create_folder("parent").is_err());
        Ok(())
    }

    #[test]
    fn documents_round_trip_through_vault() -> io::Result<()> {
        let temp = tempfile::tempdir()?;
        let vault = LocalVault::new(temp.path());

        vault.create_document("note.md", "hello")?;
        assert_eq!(vault.read_document("note.md")?, "hello");
        assert!(vault.create_document("note.md", "again").is_err());

        vault.delete_document("note.md")?;
        assert!(!vault.exists("note.md")?);
        Ok(())
    }

    #[test]
    fn only_files_count_as_documents() -> io::Result<()> {
        let temp = tempfile::tempdir()?;
        let vault = LocalVault::new(temp.path());
        vault.create_folder("Notes")?;
        vault.create_document("Notes/index.md", "")?;

        assert!(vault.is_document("Notes/index.md")?);
        assert!(!vault.is_document("Notes")?);
        assert!(!vault.is_document("")?);
        assert!(!vault.is_document("Notes/ghost.md")?);
        Ok(())
    }

    #[test]
    fn vault_path_relativizes_inside_root() {
        let vault = LocalVault::new("/vault");
        assert_eq!(
            vault.vault_path(Path::new("/vault/Notes/index.md")).as_deref(),
            Some("Notes/index.md")
        );
        assert_eq!(
            vault.vault_path(Path::new("./Notes/a.md")).as_deref(),
            Some("Notes/a.md")
        );
        assert_eq!(vault.vault_path(Path::new("/elsewhere/a.md")), None);
        assert_eq!(vault.vault_path(Path::new("../a.md")), None);
    }
}
