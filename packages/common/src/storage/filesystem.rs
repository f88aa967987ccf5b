use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::{BoxReader, FileStore, StoredFile};

/// Directory under the storage root that holds all user uploads.
const USER_DATA_DIR: &str = "user_data";

/// How many collision suffixes to try before giving up. High enough that
/// exhausting it means something other than normal contention is wrong.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Filesystem-backed file store.
///
/// Files land under `{root}/user_data/{owner_id}/{project}/{filename}`.
/// When the requested name is taken, a numeric suffix is appended
/// (`logo.png`, `logo-1.png`, `logo-2.png`, ...). Each name is claimed with
/// an exclusive create so concurrent uploads of the same filename get
/// distinct references instead of overwriting each other.
pub struct FilesystemFileStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemFileStore {
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join(USER_DATA_DIR)).await?;
        Ok(Self { root, max_size })
    }

    /// Resolve a reference to an on-disk path, rejecting traversal.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        if reference.is_empty() || Path::new(reference).is_absolute() {
            return Err(StorageError::InvalidReference(reference.into()));
        }
        for component in reference.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return Err(StorageError::InvalidReference(reference.into()));
            }
        }
        Ok(self.root.join(reference))
    }
}

/// Reduce an untrusted name to a single safe path component.
fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "unnamed".into()
    } else {
        cleaned
    }
}

/// Split a filename into (stem, extension-with-dot).
fn split_name(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

#[async_trait]
impl FileStore for FilesystemFileStore {
    async fn store(
        &self,
        owner_id: i32,
        project: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<StoredFile, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let project_dir = sanitize_component(project);
        let filename = sanitize_component(filename);
        let (stem, ext) = split_name(&filename);

        let dir_reference = format!("{USER_DATA_DIR}/{owner_id}/{project_dir}");
        fs::create_dir_all(self.root.join(&dir_reference)).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                filename.clone()
            } else {
                format!("{stem}-{attempt}{ext}")
            };
            let reference = format!("{dir_reference}/{candidate}");
            let path = self.root.join(&reference);

            // create_new claims the name atomically; AlreadyExists means a
            // concurrent writer got there first, so try the next suffix.
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = async {
                file.write_all(data).await?;
                file.flush().await
            }
            .await
            {
                let _ = fs::remove_file(&path).await;
                return Err(e.into());
            }

            return Ok(StoredFile {
                reference,
                size: data.len() as i64,
            });
        }

        Err(StorageError::InvalidReference(format!(
            "could not find a free name for '{filename}' in {dir_reference}"
        )))
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(reference)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, reference: &str) -> Result<BoxReader, StorageError> {
        let path = self.resolve(reference)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (FilesystemFileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemFileStore::new(dir.path().join("media"), 10 * 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn store_get_round_trip() {
        let (store, _dir) = temp_store().await;
        let stored = store.store(1, "demo", "logo.png", b"png bytes").await.unwrap();
        assert_eq!(stored.reference, "user_data/1/demo/logo.png");
        assert_eq!(stored.size, 9);
        assert_eq!(store.get(&stored.reference).await.unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn collision_gets_suffixed() {
        let (store, _dir) = temp_store().await;
        let first = store.store(1, "demo", "logo.png", b"v1").await.unwrap();
        let second = store.store(1, "demo", "logo.png", b"v2").await.unwrap();
        assert_eq!(first.reference, "user_data/1/demo/logo.png");
        assert_eq!(second.reference, "user_data/1/demo/logo-1.png");
        assert_eq!(store.get(&first.reference).await.unwrap(), b"v1");
        assert_eq!(store.get(&second.reference).await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn namespaces_do_not_collide() {
        let (store, _dir) = temp_store().await;
        let a = store.store(1, "demo", "file.txt", b"a").await.unwrap();
        let b = store.store(2, "demo", "file.txt", b"b").await.unwrap();
        assert_ne!(a.reference, b.reference);
    }

    #[tokio::test]
    async fn filenames_are_sanitized() {
        let (store, _dir) = temp_store().await;
        let stored = store
            .store(1, "my project", "../../etc/passwd", b"nope")
            .await
            .unwrap();
        assert_eq!(stored.reference, "user_data/1/my_project/etc_passwd");
    }

    #[tokio::test]
    async fn traversal_references_are_rejected() {
        let (store, _dir) = temp_store().await;
        assert!(matches!(
            store.get("user_data/../secrets").await,
            Err(StorageError::InvalidReference(_))
        ));
        assert!(matches!(
            store.get("/etc/passwd").await,
            Err(StorageError::InvalidReference(_))
        ));
    }

    #[tokio::test]
    async fn size_limit_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemFileStore::new(dir.path().join("media"), 10)
            .await
            .unwrap();
        let result = store.store(1, "p", "big.bin", b"way more than ten bytes").await;
        assert!(matches!(result, Err(StorageError::SizeLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn get_not_found() {
        let (store, _dir) = temp_store().await;
        assert!(matches!(
            store.get("user_data/1/p/missing.txt").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let (store, _dir) = temp_store().await;
        let stored = store.store(1, "p", "gone.txt", b"bye").await.unwrap();
        assert!(store.delete(&stored.reference).await.unwrap());
        assert!(!store.exists(&stored.reference).await.unwrap());
        assert!(!store.delete(&stored.reference).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_stores_get_distinct_references() {
        let (store, _dir) = temp_store().await;
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..10u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.store(1, "p", "same.txt", &[i]).await
            }));
        }

        let mut refs = Vec::new();
        for handle in handles {
            refs.push(handle.await.unwrap().unwrap().reference);
        }
        refs.sort();
        refs.dedup();
        assert_eq!(refs.len(), 10);
    }
}
