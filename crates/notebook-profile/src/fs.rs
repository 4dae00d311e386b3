//! Filesystem port used by the provisioner.
//!
//! [`LocalFs`] talks to the real disk. [`MemoryFs`] keeps everything in a
//! map and records file modes and write counts, which is what the tests
//! inspect to check idempotence.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Owner read/write only.
pub const PRIVATE_FILE_MODE: u32 = 0o600;
/// Strips group and other bits from everything created.
pub const PRIVATE_UMASK: u32 = 0o077;

/// Set the process umask so every file and directory created from here on,
/// by this process or by a child such as `ipython profile create`, is
/// private to the owner. Returns the previous mask.
#[cfg(unix)]
pub fn restrict_umask() -> u32 {
    // SAFETY: umask only swaps the process file mode creation mask.
    let previous = unsafe { libc::umask(PRIVATE_UMASK as libc::mode_t) };
    previous as u32
}

#[cfg(not(unix))]
pub fn restrict_umask() -> u32 {
    0
}

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write `contents` to `path` and restrict it to the owner.
    /// The parent directory must already exist.
    fn write_private(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Recursively remove a directory. A missing directory is not an error.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn write_private(&self, path: &Path, contents: &str) -> io::Result<()> {
        (**self).write_private(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).remove_dir_all(path)
    }
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_private(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = open_private(path)?;
        file.write_all(contents.as_bytes())?;
        // An existing file keeps its old mode through open()
        set_mode(path, PRIVATE_FILE_MODE)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(PRIVATE_FILE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<std::fs::File> {
    std::fs::File::create(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[derive(Debug, Clone)]
enum Entry {
    Dir,
    File {
        contents: String,
        mode: u32,
        writes: usize,
    },
}

/// In-memory filesystem.
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: Mutex<BTreeMap<PathBuf, Entry>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a file (and its parent directories) without counting it as a write.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str) {
        let path = path.as_ref();
        let mut entries = self.entries();
        if let Some(parent) = path.parent() {
            insert_dirs(&mut entries, parent);
        }
        entries.insert(
            path.to_path_buf(),
            Entry::File {
                contents: contents.to_string(),
                mode: 0o644,
                writes: 0,
            },
        );
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.entries().get(path.as_ref()) {
            Some(Entry::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    pub fn mode(&self, path: impl AsRef<Path>) -> Option<u32> {
        match self.entries().get(path.as_ref()) {
            Some(Entry::File { mode, .. }) => Some(*mode),
            _ => None,
        }
    }

    /// Number of times `write_private` hit this file.
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        match self.entries().get(path.as_ref()) {
            Some(Entry::File { writes, .. }) => *writes,
            _ => 0,
        }
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.entries().get(path.as_ref()), Some(Entry::Dir))
    }
}

fn insert_dirs(entries: &mut BTreeMap<PathBuf, Entry>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        entries.entry(ancestor.to_path_buf()).or_insert(Entry::Dir);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.entries().get(path) {
            Some(Entry::File { contents, .. }) => Ok(contents.clone()),
            Some(Entry::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write_private(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut entries = self.entries();
        let parent = path.parent().ok_or_else(|| not_found(path))?;
        if !parent.as_os_str().is_empty() && !matches!(entries.get(parent), Some(Entry::Dir)) {
            return Err(not_found(parent));
        }

        let writes = match entries.get(path) {
            Some(Entry::File { writes, .. }) => *writes,
            _ => 0,
        };
        entries.insert(
            path.to_path_buf(),
            Entry::File {
                contents: contents.to_string(),
                mode: PRIVATE_FILE_MODE,
                writes: writes + 1,
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        insert_dirs(&mut self.entries(), path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.entries().retain(|entry, _| !entry.starts_with(path));
        Ok(())
    }
}
