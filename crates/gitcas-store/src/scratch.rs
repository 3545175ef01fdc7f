//! Scratch space for content awaiting its batch.
//!
//! Each pending hash owns exactly one file, `dir/<hash>`. Writes go through
//! a uniquely named temporary file and a rename, so a reader never observes
//! a partial file and concurrent writers of the same hash converge on the
//! same bytes.

use std::io;
use std::path::{Path, PathBuf};

use gitcas_core::ContentDigest;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hash: &ContentDigest) -> PathBuf {
        self.dir.join(hash.to_hex())
    }

    /// Persist `bytes` as the scratch file for `hash`.
    pub async fn write(&self, hash: &ContentDigest, bytes: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{}.{}.part", hash.to_hex(), Uuid::new_v4()));
        let dest = self.path_for(hash);
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &dest).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::debug!(path = %tmp.display(), "failed to remove partial scratch file: {cleanup}");
            }
            return Err(e);
        }
        Ok(dest)
    }

    /// Delete the scratch file for `hash`. A missing file is not an error.
    pub async fn remove(&self, hash: &ContentDigest) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(hash)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Move a scratch file to `dest`, creating parent directories.
    ///
    /// Falls back to copy and remove when a rename is not possible, e.g.
    /// across filesystems.
    pub async fn move_into(src: &Path, dest: &Path) -> io::Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::rename(src, dest).await.is_ok() {
            return Ok(());
        }
        tokio::fs::copy(src, dest).await?;
        tokio::fs::remove_file(src).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_file_named_by_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(tmp.path().join("scratch"));
        let hash = ContentDigest::of(b"hello");

        let path = scratch.write(&hash, b"hello").await.unwrap();
        assert_eq!(path, scratch.path_for(&hash));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");

        // No temporary files are left behind.
        let mut entries = tokio::fs::read_dir(scratch.dir()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn concurrent_writes_of_same_hash_converge() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(tmp.path());
        let hash = ContentDigest::of(b"same");
        let (a, b) = tokio::join!(scratch.write(&hash, b"same"), scratch.write(&hash, b"same"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(tokio::fs::read(scratch.path_for(&hash)).await.unwrap(), b"same");
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(tmp.path());
        let hash = ContentDigest::of(b"blocked");
        // A non-empty directory at the destination makes the rename fail.
        let blocker = scratch.path_for(&hash);
        std::fs::create_dir_all(blocker.join("inner")).unwrap();

        assert!(scratch.write(&hash, b"blocked").await.is_err());
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(tmp.path());
        scratch.remove(&ContentDigest::of(b"never")).await.unwrap();
    }

    #[tokio::test]
    async fn move_into_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(tmp.path().join("s"));
        let hash = ContentDigest::of(b"m");
        let src = scratch.write(&hash, b"m").await.unwrap();
        let dest = tmp.path().join("repo").join("nested").join("m.txt");

        ScratchSpace::move_into(&src, &dest).await.unwrap();
        assert!(!src.exists());
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"m");
    }
}
