use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreErr;
use crate::kv_store::KeyValueStore;

/// A file-per-key store rooted at a metadata directory. A key of the shape
/// `staged/t0123/7` maps to the file `<root>/staged/t0123/7`. Values are
/// written to a temporary file and renamed into place, so a record is never
/// observable half-written.
#[derive(Debug)]
pub struct FileSystemKvs {
    root: PathBuf,
}

impl FileSystemKvs {
    fn key_path(&self, key: &str) -> Result<PathBuf, StoreErr> {
        if key.is_empty()
            || key.split('/').any(|c| c.is_empty() || c == "." || c == "..")
        {
            return Err(StoreErr::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(key))
    }

    fn ensure_available(&self) -> Result<(), StoreErr> {
        if !self.root.is_dir() {
            return Err(StoreErr::Unavailable(format!(
                "store root {:?} is not a directory",
                self.root
            )));
        }

        Ok(())
    }
}

impl KeyValueStore for FileSystemKvs {
    fn initialize<P: AsRef<Path>>(root_dir: P) -> Result<FileSystemKvs, StoreErr> {
        fs::create_dir_all(root_dir.as_ref())?;

        Ok(FileSystemKvs {
            root: root_dir.as_ref().to_path_buf(),
        })
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreErr> {
        self.ensure_available()?;

        let path = self.key_path(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StoreErr::InvalidKey(key.to_string()))?;

        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|err| StoreErr::Io(err.error))?;

        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreErr> {
        let path = self.key_path(key)?;

        match fs::read(&path) {
            Ok(value) => Ok(Some(value)),
            Err(ref err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreErr::Io(err)),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StoreErr> {
        self.ensure_available()?;

        let dir = self.key_path(prefix)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(ref err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreErr::Io(err)),
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }

        // Directory iteration order is not stable across filesystems.
        paths.sort();

        let mut values = Vec::with_capacity(paths.len());
        for path in paths {
            values.push(fs::read(&path)?);
        }

        Ok(values)
    }

    fn delete(&self, key: &str) -> Result<(), StoreErr> {
        let path = self.key_path(key)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(ref err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreErr::Io(err)),
        }
    }
}
