//! Object storage
//!
//! [`ObjectStore`] is the common surface of Cloud Storage and S3 that the
//! metadata and SFTP helpers are written against.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::utils::file::read_local_file;

pub mod gcs;
pub mod s3;

pub use gcs::GcsService;
pub use s3::S3Service;

/// Content for an upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl UploadSource {
    pub async fn into_bytes(self) -> crate::Result<Vec<u8>> {
        match self {
            UploadSource::File(path) => read_local_file(&path).await,
            UploadSource::Bytes(bytes) => Ok(bytes),
        }
    }

    /// Short description for log lines
    pub fn describe(&self) -> String {
        match self {
            UploadSource::File(path) => path.display().to_string(),
            UploadSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::File(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        UploadSource::File(path.to_path_buf())
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(bytes: Vec<u8>) -> Self {
        UploadSource::Bytes(bytes)
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// URI scheme, e.g. `gs`
    fn scheme(&self) -> &'static str;

    async fn exists(&self, bucket: &str, key: &str) -> crate::Result<bool>;

    /// Object content, `None` when it does not exist
    async fn get(&self, bucket: &str, key: &str) -> crate::Result<Option<Vec<u8>>>;

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> crate::Result<()>;

    /// Upload from a file or bytes. Stores that can stream a file override this.
    async fn upload(&self, bucket: &str, key: &str, source: UploadSource) -> crate::Result<()> {
        self.put(bucket, key, source.into_bytes().await?).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> crate::Result<()>;

    /// Object size in bytes, `None` when it does not exist
    async fn size(&self, bucket: &str, key: &str) -> crate::Result<Option<u64>>;

    fn location(&self, bucket: &str, key: &str) -> String {
        format!("{}://{}/{}", self.scheme(), bucket, key)
    }
}

/// Process-local store keyed by bucket and key
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_objects<T>(&self, f: impl FnOnce(&mut HashMap<(String, String), Vec<u8>>) -> T) -> T {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut objects)
    }

    /// Keys stored in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self.with_objects(|objects| {
            objects
                .keys()
                .filter(|(b, _)| b == bucket)
                .map(|(_, k)| k.clone())
                .collect()
        });
        keys.sort();
        keys
    }
}

fn object_id(bucket: &str, key: &str) -> (String, String) {
    (bucket.to_string(), key.to_string())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn scheme(&self) -> &'static str {
        "mem"
    }

    async fn exists(&self, bucket: &str, key: &str) -> crate::Result<bool> {
        Ok(self.with_objects(|objects| objects.contains_key(&object_id(bucket, key))))
    }

    async fn get(&self, bucket: &str, key: &str) -> crate::Result<Option<Vec<u8>>> {
        Ok(self.with_objects(|objects| objects.get(&object_id(bucket, key)).cloned()))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> crate::Result<()> {
        self.with_objects(|objects| objects.insert(object_id(bucket, key), bytes));
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> crate::Result<()> {
        self.with_objects(|objects| objects.remove(&object_id(bucket, key)));
        Ok(())
    }

    async fn size(&self, bucket: &str, key: &str) -> crate::Result<Option<u64>> {
        Ok(self.with_objects(|objects| {
            objects
                .get(&object_id(bucket, key))
                .map(|bytes| bytes.len() as u64)
        }))
    }
}
