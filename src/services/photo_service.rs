// src/services/photo_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, PhotoRepository, ReferenceRepository},
    models::photo::{AuditPhoto, NewPhoto},
};

pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Verificações feitas antes de gravar qualquer coisa no armazenamento.
pub fn validate_photo(content_type: &str, size: usize) -> Result<(), AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::InvalidUpload("errors.upload.not_image"));
    }
    if size == 0 {
        return Err(AppError::InvalidUpload("errors.upload.empty"));
    }
    if size > MAX_PHOTO_BYTES {
        return Err(AppError::InvalidUpload("errors.upload.too_large"));
    }
    Ok(())
}

/// Extensão do objeto salvo: a do próprio arquivo, senão o subtipo MIME.
pub fn extension_for(content_type: &str, file_name: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        let subtype = content_type.split_once('/').map(|(_, s)| s).unwrap_or("bin");
        let subtype = subtype.split(['+', ';']).next().unwrap_or(subtype);
        match subtype {
            "jpeg" => "jpg".to_string(),
            other => other.to_string(),
        }
    })
}

pub fn storage_path(organization_id: Uuid, audit_id: Uuid, ext: &str) -> String {
    format!("{}/{}/{}.{}", organization_id, audit_id, Uuid::new_v4(), ext)
}

// ---
// Armazenamento de objetos
// ---
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Grava o objeto e devolve a URL pública.
    async fn upload(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError>;

    async fn remove(&self, path: &str) -> Result<(), AppError>;
}

/// Usado quando não há armazenamento configurado: toda chamada falha com um erro claro.
pub struct UnconfiguredStorage;

#[async_trait]
impl PhotoStorage for UnconfiguredStorage {
    async fn upload(&self, _path: &str, _content_type: &str, _bytes: Vec<u8>) -> Result<String, AppError> {
        Err(AppError::StorageNotConfigured)
    }

    async fn remove(&self, _path: &str) -> Result<(), AppError> {
        Err(AppError::StorageNotConfigured)
    }
}

/// API REST de storage do backend gerenciado (`/storage/v1/object/...`).
pub struct HttpObjectStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl HttpObjectStorage {
    pub fn new(client: reqwest::Client, base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl PhotoStorage for HttpObjectStorage {
    async fn upload(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StorageError(format!("upload of {} failed ({}): {}", path, status, body)));
        }
        Ok(self.public_url(path))
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::StorageError(format!("removal of {} failed ({})", path, response.status())));
        }
        Ok(())
    }
}

// ---
// Serviço
// ---
pub struct PhotoUpload {
    pub audit_id: Uuid,
    pub result_id: Option<Uuid>,
    pub caption: Option<String>,
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Clone)]
pub struct PhotoService {
    storage: Arc<dyn PhotoStorage>,
    audit_repo: AuditRepository,
    photo_repo: PhotoRepository,
}

impl PhotoService {
    pub fn new(storage: Arc<dyn PhotoStorage>) -> Self {
        Self { storage, audit_repo: AuditRepository, photo_repo: PhotoRepository }
    }

    /// Valida, grava o objeto e depois registra a linha. Se o INSERT falhar,
    /// o objeto é removido de novo.
    pub async fn upload<'e, E>(&self, executor: E, organization_id: Uuid, upload: PhotoUpload) -> Result<AuditPhoto, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // 1. Tipo e tamanho antes de tocar em qualquer coisa
        validate_photo(&upload.content_type, upload.bytes.len())?;

        // 2. A auditoria (e o resultado, se vier) precisam ser da organização
        let mut tx = executor.begin().await?;
        self.audit_repo
            .find_row(&mut *tx, organization_id, upload.audit_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("audit".into()))?;
        if let Some(result_id) = upload.result_id {
            ReferenceRepository
                .require_result(&mut *tx, organization_id, upload.audit_id, result_id)
                .await?;
        }

        // 3. Sobe o arquivo
        let ext = extension_for(&upload.content_type, upload.file_name.as_deref());
        let path = storage_path(organization_id, upload.audit_id, &ext);
        let size_bytes = upload.bytes.len() as i64;

        let public_url = self.storage.upload(&path, &upload.content_type, upload.bytes).await?;

        // 4. Registra a linha; se falhar, apaga o objeto órfão
        let new = NewPhoto {
            audit_id: upload.audit_id,
            result_id: upload.result_id,
            storage_path: path.clone(),
            public_url,
            content_type: upload.content_type,
            size_bytes,
            caption: upload.caption,
            uploaded_by: upload.uploaded_by,
        };

        let created = match self.photo_repo.create(&mut *tx, organization_id, &new).await {
            Ok(photo) => tx.commit().await.map(|_| photo).map_err(AppError::from),
            Err(e) => Err(e),
        };
        match created {
            Ok(photo) => Ok(photo),
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(&path).await {
                    tracing::error!("Orphaned photo object {}: {}", path, cleanup);
                }
                Err(e)
            }
        }
    }

    /// A linha sai primeiro; se a remoção do objeto falhar, sobra só um órfão.
    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let photo = self
            .photo_repo
            .find(&mut *tx, organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("photo".into()))?;

        self.photo_repo.delete(&mut *tx, organization_id, id).await?;
        tx.commit().await?;

        if let Err(e) = self.storage.remove(&photo.storage_path).await {
            tracing::warn!("Photo row {} deleted but object {} remains: {}", id, photo.storage_path, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_images() {
        let err = validate_photo("application/pdf", 1024).unwrap_err();
        assert!(matches!(err, AppError::InvalidUpload("errors.upload.not_image")));
    }

    #[test]
    fn enforces_the_size_ceiling() {
        assert!(validate_photo("image/png", MAX_PHOTO_BYTES).is_ok());
        assert!(matches!(
            validate_photo("image/png", MAX_PHOTO_BYTES + 1),
            Err(AppError::InvalidUpload("errors.upload.too_large"))
        ));
        assert!(matches!(validate_photo("image/png", 0), Err(AppError::InvalidUpload("errors.upload.empty"))));
    }

    #[test]
    fn picks_a_sensible_extension() {
        assert_eq!(extension_for("image/jpeg", Some("IMG_001.JPG")), "jpg");
        assert_eq!(extension_for("image/jpeg", None), "jpg");
        assert_eq!(extension_for("image/svg+xml", Some("noext")), "svg");
        assert_eq!(extension_for("image/webp", Some("weird.name.!!")), "webp");
    }

    #[test]
    fn paths_are_scoped_by_org_and_audit() {
        let (org, audit) = (Uuid::new_v4(), Uuid::new_v4());
        let path = storage_path(org, audit, "png");
        assert!(path.starts_with(&format!("{}/{}/", org, audit)));
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn public_urls_point_at_the_bucket() {
        let storage = HttpObjectStorage::new(reqwest::Client::new(), "https://store.example.com/", "key", "audit-photos");
        assert_eq!(
            storage.public_url("a/b/c.png"),
            "https://store.example.com/storage/v1/object/public/audit-photos/a/b/c.png"
        );
    }

    #[tokio::test]
    async fn unconfigured_storage_refuses_uploads() {
        let result = UnconfiguredStorage.upload("x", "image/png", vec![1]).await;
        assert!(matches!(result, Err(AppError::StorageNotConfigured)));
    }
}
