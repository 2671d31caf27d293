// src/handlers/photos.rs

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::{OrganizationRepository, PhotoRepository},
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::OrgScope},
    models::photo::AuditPhoto,
    services::photo_service::PhotoUpload,
};

/// Multipart fields of an upload before the audit and uploader are known.
#[derive(Debug, Default)]
struct PhotoForm {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Option<Vec<u8>>,
    result_id: Option<Uuid>,
    caption: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<PhotoForm, AppError> {
    let mut form = PhotoForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidPayload(format!("multipart: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidPayload(format!("file: {}", e)))?;
                form.bytes = Some(data.to_vec());
            }
            "resultId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidPayload(format!("resultId: {}", e)))?;
                form.result_id = match text.trim() {
                    "" => None,
                    raw => Some(
                        Uuid::parse_str(raw).map_err(|_| AppError::InvalidPayload("resultId is not a uuid".into()))?,
                    ),
                };
            }
            "caption" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidPayload(format!("caption: {}", e)))?;
                form.caption = Some(text).filter(|c| !c.trim().is_empty());
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(form)
}

#[utoipa::path(
    get,
    path = "/api/audits/{id}/photos",
    tag = "Photos",
    params(("id" = Uuid, Path, description = "Audit id")),
    responses((status = 200, description = "Photos attached to the audit", body = ListResponse<AuditPhoto>)),
    security(("api_jwt" = []))
)]
pub async fn list_photos(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Path(audit_id): Path<Uuid>,
) -> ListResponse<AuditPhoto> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        PhotoRepository.list_for_audit(&mut *conn, tenant.0, audit_id).await
    }
    .await;

    ListResponse::from_result(result, "photos")
}

#[utoipa::path(
    post,
    path = "/api/audits/{id}/photos",
    tag = "Photos",
    params(("id" = Uuid, Path, description = "Audit id")),
    request_body(content_type = "multipart/form-data", description = "`file` (image, at most 10MB), optional `resultId` and `caption`"),
    responses(
        (status = 201, description = "Photo stored; the row carries its public URL", body = AuditPhoto),
        (status = 400, description = "Not an image, empty, or larger than 10MB"),
        (status = 404, description = "No such audit"),
        (status = 503, description = "Photo storage not configured")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(audit_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let form = read_form(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    let bytes = form.bytes.ok_or_else(|| {
        AppError::InvalidUpload("errors.upload.missing_file").to_api_error(&locale, &app_state.i18n_store)
    })?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let uploaded_by = OrganizationRepository
        .find_user_id(&mut *rls_conn, &user.0.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let upload = PhotoUpload {
        audit_id,
        result_id: form.result_id,
        caption: form.caption,
        file_name: form.file_name,
        content_type: form.content_type.unwrap_or_default(),
        bytes,
        uploaded_by,
    };
    let photo = app_state
        .photo_service
        .upload(&mut *rls_conn, tenant.0, upload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(photo_id = %photo.id, audit_id = %audit_id, size = photo.size_bytes, "Photo uploaded");
    Ok(ActionResponse::created(photo).revalidate(views::AUDITS))
}

#[utoipa::path(
    delete,
    path = "/api/photos/{id}",
    tag = "Photos",
    params(("id" = Uuid, Path, description = "Photo id")),
    responses(
        (status = 200, description = "Photo row and stored object removed"),
        (status = 404, description = "No such photo")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .photo_service
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::AUDITS))
}
