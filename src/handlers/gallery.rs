use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::gallery_image;
use crate::errors::{ApiError, ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::gallery::{GalleryImageUpdate, ImageUpload};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart form accepted by the upload endpoint (documentation only).
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct GalleryUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    title: Option<String>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(err.body_text()).into()
    } else {
        ApiError::MalformedBody(err.body_text())
    }
}

/// Reads the `file` part and the optional `title` part; unknown parts are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    let mut file = None;
    let mut title = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((bytes, filename, content_type));
            }
            Some("title") => {
                title = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let (bytes, filename, content_type) =
        file.ok_or_else(|| ServiceError::ValidationError("file is required".into()))?;
    Ok(ImageUpload {
        bytes,
        filename,
        content_type,
        title,
    })
}

#[utoipa::path(
    get,
    path = "/api/gallery",
    tag = "gallery",
    params(PaginationParams),
    responses((status = 200, description = "Images, newest first", body = PaginatedResponse<gallery_image::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_images(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<gallery_image::Model>>, ServiceError> {
    Ok(Json(state.services.gallery.list(page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/gallery/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image", body = gallery_image::Model),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<gallery_image::Model>, ServiceError> {
    Ok(Json(state.services.gallery.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/gallery",
    tag = "gallery",
    request_body(content = GalleryUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = gallery_image::Model),
        (status = 400, description = "Missing file or not an image", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "Image storage failed", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let multipart = multipart.map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
    let upload = read_upload(multipart).await?;
    let created = state
        .services
        .gallery
        .upload(upload, Some(user.user_id))
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/gallery/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Image id")),
    request_body = GalleryImageUpdate,
    responses(
        (status = 200, description = "Title updated", body = gallery_image::Model),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(update): AppJson<GalleryImageUpdate>,
) -> Result<Json<gallery_image::Model>, ServiceError> {
    Ok(Json(state.services.gallery.update(id, update).await?))
}

/// The remote copy is destroyed first; if that fails the record is kept.
#[utoipa::path(
    delete,
    path = "/api/gallery/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image deleted", body = MessageResponse),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 502, description = "Image storage failed", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.gallery.delete(id).await?;
    Ok(Json(MessageResponse::new("Image deleted successfully")))
}
