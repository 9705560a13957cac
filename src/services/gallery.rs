use bytes::Bytes;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clean, fetch_page, find_or_404, Page, PageRequest};
use crate::entities::gallery_image;
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::storage::ImageStore;

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageUpdate {
    pub title: Option<String>,
}

#[derive(Clone)]
pub struct GalleryService {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn ImageStore>,
    events: EventSender,
    max_upload_bytes: usize,
}

impl GalleryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn ImageStore>,
        events: EventSender,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            store,
            events,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn list(&self, page: PageRequest) -> ServiceResult<Page<gallery_image::Model>> {
        let query = gallery_image::Entity::find().order_by_desc(gallery_image::Column::CreatedAt);
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<gallery_image::Model> {
        find_or_404::<gallery_image::Entity, _>(&*self.db, id, "GalleryImage").await
    }

    fn check_upload(&self, upload: &ImageUpload) -> ServiceResult<()> {
        if upload.bytes.is_empty() {
            return Err(ServiceError::ValidationError("file is required".into()));
        }
        if !upload.content_type.starts_with("image/") {
            return Err(ServiceError::ValidationError(
                "Only image uploads are allowed".into(),
            ));
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "Image exceeds the maximum upload size of {} bytes",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Stores the file remotely, then records it. A failed insert destroys the
    /// remote copy again.
    #[instrument(skip(self, upload), fields(filename = %upload.filename, size = upload.bytes.len()))]
    pub async fn upload(
        &self,
        upload: ImageUpload,
        uploaded_by: Option<Uuid>,
    ) -> ServiceResult<gallery_image::Model> {
        self.check_upload(&upload)?;
        let size_bytes = upload.bytes.len() as i64;
        let stored = self
            .store
            .upload(upload.bytes, &upload.filename, &upload.content_type)
            .await?;

        let now = Utc::now();
        let row = gallery_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(clean(upload.title)),
            url: Set(stored.url),
            public_id: Set(stored.public_id.clone()),
            content_type: Set(upload.content_type),
            size_bytes: Set(size_bytes),
            uploaded_by: Set(uploaded_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = match row.insert(&*self.db).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.store.destroy(&stored.public_id).await {
                    warn!(error = %cleanup, public_id = %stored.public_id, "orphaned remote image");
                }
                return Err(e.into());
            }
        };

        info!(image_id = %created.id, store = self.store.name(), "image uploaded");
        self.events
            .emit(Event::ImageUploaded {
                image_id: created.id,
                public_id: created.public_id.clone(),
            })
            .await;
        Ok(created)
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: GalleryImageUpdate,
    ) -> ServiceResult<gallery_image::Model> {
        let mut active: gallery_image::ActiveModel = self.get(id).await?.into();
        if let Some(title) = clean(update.title) {
            active.title = Set(Some(title));
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Destroys the remote image first; the row stays if that fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let image = self.get(id).await?;
        self.store.destroy(&image.public_id).await?;
        let public_id = image.public_id.clone();
        image.delete(&*self.db).await?;

        info!(image_id = %id, %public_id, "image deleted");
        self.events
            .emit(Event::ImageDeleted {
                image_id: id,
                public_id,
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use crate::storage::InMemoryImageStore;
    use tokio::sync::mpsc;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            bytes: Bytes::from(vec![7u8; len]),
            filename: "plate.png".into(),
            content_type: content_type.into(),
            title: Some("Plate".into()),
        }
    }

    #[tokio::test]
    async fn upload_then_delete_round_trips_the_store() {
        let (db, _dir) = migrated_sqlite().await;
        let store = Arc::new(InMemoryImageStore::new());
        let (tx, _rx) = mpsc::channel(8);
        let service = GalleryService::new(db, store.clone(), EventSender::new(tx), 1024);

        let image = service.upload(upload("image/png", 16), None).await.unwrap();
        assert!(store.contains(&image.public_id));
        assert_eq!(image.size_bytes, 16);

        service.delete(image.id).await.unwrap();
        assert!(!store.contains(&image.public_id));
        assert!(matches!(service.get(image.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversized_files() {
        let (db, _dir) = migrated_sqlite().await;
        let store = Arc::new(InMemoryImageStore::new());
        let (tx, _rx) = mpsc::channel(8);
        let service = GalleryService::new(db, store.clone(), EventSender::new(tx), 8);

        let err = service.upload(upload("text/plain", 4), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Only image uploads are allowed");

        let err = service.upload(upload("image/jpeg", 9), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::PayloadTooLarge(_)));
        assert!(store.is_empty());
    }
}
