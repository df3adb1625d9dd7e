//! Disk-backed image store.

use bytes::Bytes;
use imagevault_common::types::now_rfc3339;
use imagevault_common::{Error, ImageRecord, Result};
use imagevault_repo::ImageRepository;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Blob store over a single directory.
///
/// The lock guards the minimal critical section: existence check, file
/// write, metadata update. Keeping the existence check inside the section
/// means two concurrent uploads of the same new filename cannot both take
/// the insert path.
pub struct DiskImageStore {
    storage_dir: PathBuf,
    lock: RwLock<()>,
}

impl DiskImageStore {
    /// Open a store over `storage_dir`, creating the directory if absent.
    pub async fn open(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        tokio::fs::create_dir_all(&storage_dir).await?;
        Ok(Self {
            storage_dir,
            lock: RwLock::new(()),
        })
    }

    /// Directory this store writes into.
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Persist `blob` under `record.filename` and bring the repository in
    /// line, inside one critical section.
    ///
    /// Insert path (filename unseen): the blob lands on disk, a row is
    /// inserted with `changed_at == created_at` and a freshly generated
    /// identifier, which is returned.
    ///
    /// Overwrite path (filename present): the blob replaces the old file
    /// atomically, `changed_at` is rewritten to now, and the identifier the
    /// row already held is returned. The identifier is a stable per-filename
    /// handle; the one generated for this call is discarded.
    pub async fn save_new_image(
        &self,
        blob: Bytes,
        mut record: ImageRecord,
        repo: &dyn ImageRepository,
    ) -> Result<String> {
        let image_id = Uuid::new_v4().to_string();
        let image_path = self.image_path(&record.filename)?;
        let part_path = self.part_path(&record.filename);

        let _guard = self.lock.write().await;

        let exists = tokio::fs::try_exists(&image_path).await?;

        // Stage to a temp file and rename so a replaced image is never
        // observable half-written.
        tokio::fs::write(&part_path, &blob).await?;
        if let Err(e) = tokio::fs::rename(&part_path, &image_path).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e.into());
        }

        if exists {
            record.changed_at = now_rfc3339();
            let previous_id = repo.update_info(&record).await?;
            info!(
                filename = %record.filename,
                changed_at = %record.changed_at,
                "replaced image"
            );
            return Ok(previous_id);
        }

        record.image_id = image_id;
        record.changed_at = record.created_at.clone();
        if let Err(e) = repo.save_new_info(&record).await {
            // Keep disk and table in lockstep: a row-less blob must not
            // survive the failed insert.
            if let Err(cleanup) = tokio::fs::remove_file(&image_path).await {
                warn!(
                    filename = %record.filename,
                    error = %cleanup,
                    "cannot remove blob after failed metadata insert"
                );
            }
            return Err(e);
        }

        info!(
            filename = %record.filename,
            created_at = %record.created_at,
            "saved new image"
        );
        Ok(record.image_id)
    }

    /// Read back the full content of a stored image.
    pub async fn get_image(&self, filename: &str) -> Result<Bytes> {
        let image_path = self.image_path(filename)?;

        let _guard = self.lock.read().await;

        if !tokio::fs::try_exists(&image_path).await? {
            return Err(Error::ImageNotFound {
                filename: filename.to_string(),
            });
        }

        let data = tokio::fs::read(&image_path).await?;
        Ok(Bytes::from(data))
    }

    /// Filenames currently present in the storage directory.
    pub async fn list_images(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read().await;

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Staging files are dot-prefixed and never count as stored.
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn image_path(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty()
            || filename.starts_with('.')
            || filename.contains('/')
            || filename.contains('\\')
        {
            return Err(Error::invalid_argument(format!(
                "invalid filename: {filename:?}"
            )));
        }
        Ok(self.storage_dir.join(filename))
    }

    fn part_path(&self, filename: &str) -> PathBuf {
        self.storage_dir.join(format!(".{filename}.part"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagevault_repo::SqlImageRepository;
    use tempfile::TempDir;

    async fn fixture() -> (TempDir, DiskImageStore, SqlImageRepository) {
        let dir = TempDir::new().unwrap();
        let store = DiskImageStore::open(dir.path()).await.unwrap();
        let repo = SqlImageRepository::connect("sqlite::memory:").await.unwrap();
        (dir, store, repo)
    }

    #[tokio::test]
    async fn save_then_read_back() {
        let (_dir, store, repo) = fixture().await;

        let blob = Bytes::from_static(b"png bytes");
        let id = store
            .save_new_image(blob.clone(), ImageRecord::new("cat.png"), &repo)
            .await
            .unwrap();
        assert!(!id.is_empty());

        let read = store.get_image("cat.png").await.unwrap();
        assert_eq!(read, blob);

        let rows = repo.get_all_info().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at, rows[0].changed_at);
    }

    #[tokio::test]
    async fn overwrite_keeps_identifier_and_created_at() {
        let (_dir, store, repo) = fixture().await;

        let first_id = store
            .save_new_image(Bytes::from_static(b"v1"), ImageRecord::new("cat.png"), &repo)
            .await
            .unwrap();
        let first_row = repo.get_all_info().await.unwrap().remove(0);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second_id = store
            .save_new_image(Bytes::from_static(b"v2"), ImageRecord::new("cat.png"), &repo)
            .await
            .unwrap();
        assert_eq!(second_id, first_id, "identifier is a stable handle");

        let rows = repo.get_all_info().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at, first_row.created_at);
        assert!(rows[0].changed_at > first_row.changed_at);

        assert_eq!(store.get_image("cat.png").await.unwrap(), &b"v2"[..]);
    }

    #[tokio::test]
    async fn get_missing_image_is_not_found() {
        let (_dir, store, _repo) = fixture().await;
        let err = store.get_image("ghost.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rejects_path_escaping_filenames() {
        let (_dir, store, repo) = fixture().await;
        for bad in ["", "../etc/passwd", "a/b", ".hidden"] {
            let err = store
                .save_new_image(Bytes::from_static(b"x"), ImageRecord::new(bad), &repo)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn listing_matches_saved_files() {
        let (_dir, store, repo) = fixture().await;
        for name in ["b.png", "a.png"] {
            store
                .save_new_image(Bytes::from_static(b"x"), ImageRecord::new(name), &repo)
                .await
                .unwrap();
        }
        assert_eq!(store.list_images().await.unwrap(), vec!["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn concurrent_saves_of_new_filename_insert_once() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(DiskImageStore::open(dir.path()).await.unwrap());
        let repo = std::sync::Arc::new(
            SqlImageRepository::connect("sqlite::memory:").await.unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                store
                    .save_new_image(
                        Bytes::from(vec![i; 16]),
                        ImageRecord::new("race.png"),
                        repo.as_ref(),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows = repo.get_all_info().await.unwrap();
        assert_eq!(rows.len(), 1, "one row per filename under contention");
        assert_eq!(store.list_images().await.unwrap(), vec!["race.png"]);
    }
}
