// src/handlers/comments.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::{CommentRepository, OrganizationRepository},
    handlers::ValidatedJson,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::OrgScope},
    models::comment::ActionComment,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentPayload {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

#[utoipa::path(
    get,
    path = "/api/actions/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Action id")),
    responses((status = 200, description = "Comments, oldest first, with author name and avatar", body = ListResponse<ActionComment>)),
    security(("api_jwt" = []))
)]
pub async fn list_comments(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Path(action_id): Path<Uuid>,
) -> ListResponse<ActionComment> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        CommentRepository.list_for_action(&mut *conn, tenant.0, action_id).await
    }
    .await;

    ListResponse::from_result(result, "comments")
}

#[utoipa::path(
    post,
    path = "/api/actions/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Action id")),
    request_body = CreateCommentPayload,
    responses(
        (status = 201, description = "Comment added", body = ActionComment),
        (status = 400, description = "Empty or overlong body"),
        (status = 404, description = "No such action")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(action_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let body = payload.body.trim();
    if body.is_empty() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("body", validator::ValidationError::new("length"));
        return Err(AppError::ValidationError(errors).to_api_error(&locale, &app_state.i18n_store));
    }

    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let author_id = OrganizationRepository
        .find_user_id(&mut *rls_conn, &user.0.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comment = CommentRepository
        .create(&mut *rls_conn, tenant.0, action_id, author_id, body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::created(comment).revalidate(views::ACTIONS))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Comment belongs to someone else"),
        (status = 404, description = "No such comment")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_comment(
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

    let author = CommentRepository
        .find_author(&mut *rls_conn, tenant.0, id)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("comment".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let caller = OrganizationRepository
        .find_user_id(&mut *rls_conn, &user.0.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    if !is_own_comment(author, caller) {
        return Err(AppError::NotOwner("errors.comment_not_owned").to_api_error(&locale, &app_state.i18n_store));
    }

    CommentRepository
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::ACTIONS))
}

/// Comments whose author was removed from the mirror belong to nobody.
fn is_own_comment(author: Option<Uuid>, caller: Option<Uuid>) -> bool {
    matches!((author, caller), (Some(a), Some(c)) if a == c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_author_may_delete() {
        let me = Uuid::new_v4();
        assert!(is_own_comment(Some(me), Some(me)));
        assert!(!is_own_comment(Some(Uuid::new_v4()), Some(me)));
        assert!(!is_own_comment(None, Some(me)));
        assert!(!is_own_comment(None, None));
    }
}
