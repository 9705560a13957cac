use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use uuid::Uuid;

use super::{ImageStore, StorageError, StoredImage};

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Bytes,
    content_type: String,
}

/// Keeps uploads in process memory. Used when no provider is configured.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    blobs: DashMap<String, StoredBlob>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.blobs.contains_key(public_id)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn content_type(&self, public_id: &str) -> Option<String> {
        self.blobs.get(public_id).map(|b| b.content_type.clone())
    }

    pub fn size_of(&self, public_id: &str) -> Option<usize> {
        self.blobs.get(public_id).map(|b| b.bytes.len())
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload(
        &self,
        bytes: Bytes,
        _filename: &str,
        content_type: &str,
    ) -> Result<StoredImage, StorageError> {
        let public_id = format!("gallery/{}", Uuid::new_v4().simple());
        self.blobs.insert(
            public_id.clone(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredImage {
            url: format!("memory://{}", public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), StorageError> {
        self.blobs.remove(public_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_destroy() {
        let store = InMemoryImageStore::new();
        let stored = store
            .upload(Bytes::from_static(b"\x89PNG"), "logo.png", "image/png")
            .await
            .unwrap();

        assert!(stored.public_id.starts_with("gallery/"));
        assert!(stored.url.ends_with(&stored.public_id));
        assert_eq!(store.size_of(&stored.public_id), Some(4));
        assert_eq!(store.content_type(&stored.public_id).as_deref(), Some("image/png"));

        store.destroy(&stored.public_id).await.unwrap();
        assert!(store.is_empty());
        // Destroying twice is fine.
        store.destroy(&stored.public_id).await.unwrap();
    }
}
