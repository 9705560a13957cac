use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{ImageStore, StorageError, StoredImage};
use crate::config::AppConfig;

const UPLOAD_FOLDER: &str = "gallery";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl CloudinaryConfig {
    /// `None` unless all three credentials are present.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Some(Self {
            cloud_name: non_empty(&config.cloudinary_cloud_name)?,
            api_key: non_empty(&config.cloudinary_api_key)?,
            api_secret: non_empty(&config.cloudinary_api_secret)?,
            api_base: config.cloudinary_api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.storage_timeout_secs),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.cloud_name, action)
    }
}

/// Request signature: parameters sorted by name, joined as `k=v&k=v`, the secret
/// appended, SHA-256 hex digest.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: CloudinaryConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn signed(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign_params(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        Err(StorageError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bytes: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredImage, StorageError> {
        let params = self.signed(vec![
            ("folder", UPLOAD_FOLDER.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let file = multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = params
            .into_iter()
            .fold(multipart::Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", file);

        let response = self
            .client
            .post(self.config.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| StorageError::InvalidResponse("upload response has no url".into()))?;
        debug!(public_id = %body.public_id, "image uploaded");
        Ok(StoredImage {
            url,
            public_id: body.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<(), StorageError> {
        let params = self.signed(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let response = self
            .client
            .post(self.config.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;
        let body: DestroyResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        match body.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                warn!(public_id, "image already absent from storage");
                Ok(())
            }
            other => Err(StorageError::InvalidResponse(format!(
                "destroy returned '{}'",
                other
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> CloudinaryStore {
        CloudinaryStore::new(CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key-123".into(),
            api_secret: "shh".into(),
            api_base: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn signature_sorts_and_skips_empty_params() {
        let a = sign_params(
            &[("timestamp", "100".into()), ("folder", "gallery".into())],
            "secret",
        );
        let b = sign_params(
            &[
                ("folder", "gallery".into()),
                ("public_id", String::new()),
                ("timestamp", "100".into()),
            ],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=gallery&timestamp=100secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[tokio::test]
    async fn upload_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .and(body_string_contains("key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_id": "gallery/abc",
                "secure_url": "https://res.example.com/demo/gallery/abc.png",
                "url": "http://res.example.com/demo/gallery/abc.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stored = store(&server)
            .upload(Bytes::from_static(b"png"), "abc.png", "image/png")
            .await
            .unwrap();
        assert_eq!(stored.public_id, "gallery/abc");
        assert_eq!(stored.url, "https://res.example.com/demo/gallery/abc.png");
    }

    #[tokio::test]
    async fn upstream_errors_carry_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "Invalid Signature"}})),
            )
            .mount(&server)
            .await;

        let err = store(&server)
            .upload(Bytes::from_static(b"png"), "abc.png", "image/png")
            .await
            .unwrap_err();
        assert_matches!(err, StorageError::Upstream { status: 401, ref message } if message == "Invalid Signature");
    }

    #[tokio::test]
    async fn destroy_tolerates_missing_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/destroy"))
            .and(body_string_contains("public_id=gallery%2Fgone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "not found"})))
            .mount(&server)
            .await;

        store(&server).destroy("gallery/gone").await.unwrap();
    }
}
