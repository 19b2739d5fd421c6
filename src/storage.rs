//! Local file set and on-disk transfer primitives (§4.7).
//!
//! [`FileStore`] tracks which file names this node currently holds and
//! mediates reads/writes against the node's data directory. It makes no
//! claim that the names it holds actually hash into this node's arc —
//! ownership is established lazily by [`crate::membership`] and
//! [`crate::procedures`] pulling/pushing files around the ring.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Chunk size used when streaming file bytes over a connection (§4.7,
/// following `original_source/node.py`'s 1024-byte read/send loop).
pub const TRANSFER_CHUNK_SIZE: usize = 1024;

/// Names that can never be genuine shared files, even if present in the
/// data directory: the crate's own build artifacts.
fn is_reserved_name(name: &str) -> bool {
    matches!(name, "Cargo.toml" | "Cargo.lock" | "target" | ".git")
}

/// Tracks the set of file names held locally and mediates disk I/O for
/// them.
pub struct FileStore {
    data_dir: PathBuf,
    names: Mutex<HashSet<String>>,
}

impl FileStore {
    /// Scans `data_dir` for its initial file set, excluding build
    /// artifacts and directories (§3: "populated at startup from the
    /// host directory, excluding the program's own source and auxiliary
    /// files").
    pub fn load_from_dir<P: Into<PathBuf>>(data_dir: P) -> io::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let mut names = HashSet::new();
        for entry in fs::read_dir(&data_dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_reserved_name(&name) {
                names.insert(name);
            }
        }

        Ok(FileStore { data_dir, names: Mutex::new(names) })
    }

    /// Returns whether `name` is currently held locally.
    pub fn contains(&self, name: &str) -> bool {
        self.names.lock().unwrap().contains(name)
    }

    /// Returns every locally held file name.
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().iter().cloned().collect()
    }

    /// Records that `name` is now held locally, without touching disk.
    pub fn insert_name(&self, name: String) {
        self.names.lock().unwrap().insert(name);
    }

    /// Forgets that `name` is held locally, without touching disk.
    ///
    /// Used when a file has just been handed off to another peer (§9:
    /// "Implementers SHOULD delete on successful transfer").
    pub fn remove_name(&self, name: &str) {
        self.names.lock().unwrap().remove(name);
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Returns the byte size of a locally held file.
    pub fn size_of(&self, name: &str) -> io::Result<u64> {
        fs::metadata(self.path_for(name)).map(|m| m.len())
    }

    /// Opens a locally held file for reading.
    pub fn open_for_read(&self, name: &str) -> io::Result<fs::File> {
        fs::File::open(self.path_for(name))
    }

    /// Creates a new local file for writing an incoming transfer.
    ///
    /// Fails if `name` is already present; callers are responsible for
    /// checking [`contains`](Self::contains) first and surfacing the
    /// "file already exists" error described in §4.7/§7.
    pub fn create_for_write(&self, name: &str) -> io::Result<fs::File> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(name))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_dir_excludes_reserved_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), b"[package]").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();

        let store = FileStore::load_from_dir(dir.path()).unwrap();
        let names = store.names();

        assert_eq!(names, vec!["notes.txt".to_string()]);
    }

    #[test]
    fn create_for_write_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let store = FileStore::load_from_dir(dir.path()).unwrap();
        assert!(store.create_for_write("notes.txt").is_err());
    }

    #[test]
    fn insert_and_remove_name_update_the_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::load_from_dir(dir.path()).unwrap();

        store.insert_name("a.bin".to_string());
        assert!(store.contains("a.bin"));

        store.remove_name("a.bin");
        assert!(!store.contains("a.bin"));
    }

    #[test]
    fn round_trip_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::load_from_dir(dir.path()).unwrap();

        {
            let mut f = store.create_for_write("payload.bin").unwrap();
            f.write_all(b"some bytes").unwrap();
        }
        store.insert_name("payload.bin".to_string());

        assert_eq!(store.size_of("payload.bin").unwrap(), 10);

        let mut contents = Vec::new();
        use std::io::Read;
        store.open_for_read("payload.bin").unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"some bytes");
    }
}
