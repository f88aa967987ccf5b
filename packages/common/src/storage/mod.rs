mod error;

pub mod filesystem;

use async_trait::async_trait;
use tokio::io::AsyncRead;

pub use error::StorageError;
pub use filesystem::FilesystemFileStore;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Receipt for a stored file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    /// Opaque reference resolvable back to the bytes. For the filesystem
    /// store this is a slash-separated path relative to the storage root.
    pub reference: String,
    /// Size in bytes.
    pub size: i64,
}

/// Durable file storage, namespaced by owner and project.
///
/// Name collisions within a namespace are the store's problem, not the
/// caller's: `store` always succeeds with a fresh reference even when the
/// requested filename is taken.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `data` under the owner/project namespace and return a
    /// reference to it.
    async fn store(
        &self,
        owner_id: i32,
        project: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<StoredFile, StorageError>;

    /// Read all bytes behind a reference.
    async fn get(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    /// Open a reference as a streaming async reader.
    async fn open(&self, reference: &str) -> Result<BoxReader, StorageError>;

    /// Check whether a reference still resolves.
    async fn exists(&self, reference: &str) -> Result<bool, StorageError>;

    /// Delete the file behind a reference.
    ///
    /// Returns `true` if a file was deleted, `false` if it did not exist.
    async fn delete(&self, reference: &str) -> Result<bool, StorageError>;
}
