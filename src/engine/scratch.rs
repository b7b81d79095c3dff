//! Scoped temporary files
//!
//! Uploaded bytes are spooled to disk before decoding. A [`ScratchFile`]
//! owns that copy and removes it when dropped, so it disappears on success,
//! on error and on unwind alike.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// A file that is deleted when this guard goes out of scope
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    keep: bool,
}

impl ScratchFile {
    /// Write `data` to a fresh uuid-named file in `dir`.
    ///
    /// The extension of `original_name` is kept, since decoders use it as a
    /// format hint.
    pub fn spool(dir: &Path, original_name: Option<&str>, data: &[u8]) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let extension = original_name
            .map(Path::new)
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let mut name = format!("upload_{}", Uuid::new_v4().simple());
        if let Some(ext) = extension {
            name.push('.');
            name.push_str(&ext);
        }

        let guard = Self::adopt(dir.join(name));
        let mut file = fs::File::create(&guard.path)?;
        file.write_all(data)?;
        file.sync_all()?;
        debug!("Spooled {} bytes to {}", data.len(), guard.path.display());
        Ok(guard)
    }

    /// Take ownership of an existing path; it is removed on drop.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file on disk and return its path.
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_spool_keeps_extension() {
        let dir = tempdir().unwrap();
        let scratch = ScratchFile::spool(dir.path(), Some("Voice Memo.M4A"), b"abc").unwrap();

        assert_eq!(scratch.path().extension().unwrap(), "m4a");
        assert_eq!(fs::read(scratch.path()).unwrap(), b"abc");
    }

    #[test]
    fn test_dropped_file_is_removed() {
        let dir = tempdir().unwrap();
        let path = {
            let scratch = ScratchFile::spool(dir.path(), None, b"abc").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_keeps_file() {
        let dir = tempdir().unwrap();
        let scratch = ScratchFile::spool(dir.path(), Some("a.wav"), b"abc").unwrap();
        let path = scratch.persist();
        assert!(path.exists());
    }
}
