//! File-backed storage adapter.
//!
//! Implements [`StoragePort`] over `std::fs`, mapping `(namespace, key)` to
//! `<root>/<namespace>/<key>`. The history cache and every CSV export live
//! here.
//!
//! - **`target_os = "espidf"`** — [`FsStorage::mount_spiffs`] registers the
//!   SPIFFS partition with the VFS and roots the adapter at the mount point.
//!   SPIFFS is flat; `/` is just part of the object name, so directory
//!   creation failures are ignored.
//! - **`not(target_os = "espidf")`** — any host directory, e.g. a
//!   `tempfile::TempDir` in tests or a copied flash image.
//!
//! Writes go to `<key>.tmp` first and are renamed over the target, so a
//! reset mid-write leaves either the old file or the new one. SPIFFS
//! refuses to rename onto an existing name, so there the target is removed
//! first; a reset between the remove and the rename leaves only the
//! complete `.tmp`, which reads fall back to.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::app::ports::{StorageError, StoragePort};

const TMP_SUFFIX: &str = ".tmp";

/// Whether `rename` replaces an existing destination.
const RENAME_REPLACES: bool = !cfg!(target_os = "espidf");

#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("FsStorage: rooted at {}", root.display());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(key)
    }

    fn tmp_path(&self, namespace: &str, key: &str) -> PathBuf {
        tmp_of(&self.path(namespace, key))
    }

    /// Register the SPIFFS partition at `base_path` (formatting it if it
    /// cannot be mounted) and root the adapter there.
    #[cfg(target_os = "espidf")]
    pub fn mount_spiffs(base_path: &'static core::ffi::CStr) -> Result<Self, StorageError> {
        use esp_idf_sys::{ESP_OK, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

        let conf = esp_vfs_spiffs_conf_t {
            base_path: base_path.as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 4,
            format_if_mount_failed: true,
        };
        // SAFETY: `conf` outlives the call and `base_path` is 'static; the
        // VFS copies what it keeps. Called once from the main task.
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK {
            warn!("FsStorage: SPIFFS mount failed ({})", ret);
            return Err(StorageError::IoError);
        }
        let root = base_path.to_str().map_err(|_| StorageError::IoError)?;
        Ok(Self::new(root))
    }

    /// Names of every entry stored under `namespace`, sorted.
    pub fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.root.join(namespace);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io(&e)),
        };
        // An orphaned `.tmp` stands in for its key.
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .map(|name| match name.strip_suffix(TMP_SUFFIX) {
                Some(key) => key.to_string(),
                None => name,
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

fn tmp_of(target: &Path) -> PathBuf {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    PathBuf::from(tmp)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Move a fully written `tmp` into place at `target`.
fn commit(
    tmp: &Path,
    target: &Path,
    rename_replaces: bool,
    rename: impl Fn(&Path, &Path) -> io::Result<()>,
) -> io::Result<()> {
    if !rename_replaces {
        remove_if_present(target)?;
    }
    rename(tmp, target)
}

fn map_io(e: &io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => StorageError::Full,
        _ => StorageError::IoError,
    }
}

impl StoragePort for FsStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let mut file = match fs::File::open(self.path(namespace, key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let file =
                    fs::File::open(self.tmp_path(namespace, key)).map_err(|e| map_io(&e))?;
                warn!("FsStorage: {}/{} missing, reading uncommitted copy", namespace, key);
                file
            }
            Err(e) => return Err(map_io(&e)),
        };
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(map_io(&e)),
            }
        }
        Ok(filled)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.path(namespace, key);
        if let Some(parent) = target.parent() {
            // Flat filesystems have no directories to create.
            let _ = fs::create_dir_all(parent);
        }
        let tmp = tmp_of(&target);

        if let Err(e) = fs::write(&tmp, data) {
            warn!("FsStorage: write {}/{} failed: {}", namespace, key, e);
            let _ = fs::remove_file(&tmp);
            return Err(map_io(&e));
        }
        commit(&tmp, &target, RENAME_REPLACES, |from, to| fs::rename(from, to)).map_err(
            |e| {
                warn!("FsStorage: commit {}/{} failed: {}", namespace, key, e);
                map_io(&e)
            },
        )?;
        debug!("FsStorage: wrote {}/{} ({} bytes)", namespace, key, data.len());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        remove_if_present(&self.path(namespace, key)).map_err(|e| map_io(&e))?;
        remove_if_present(&self.tmp_path(namespace, key)).map_err(|e| map_io(&e))
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.path(namespace, key).is_file() || self.tmp_path(namespace, key).is_file()
    }
}
