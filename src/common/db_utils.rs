// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;

pub type RlsTransaction = Transaction<'static, Postgres>;

pub(crate) fn pool(app_state: &AppState) -> Result<&PgPool, AppError> {
    app_state.db_pool.as_ref().ok_or(AppError::StoreNotConfigured)
}

// ---
// Helper de RLS: a "chave" do banco
// ---
/// Abre uma transação e define as variáveis de tenant que as políticas de RLS leem.
/// `set_config(.., true)` vale só para a transação, então nada vaza de volta para
/// o pool junto com a conexão. Descartar a transação faz rollback: handlers de
/// escrita precisam chamar `commit()`.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<RlsTransaction, AppError> {
    let mut tx = pool(app_state)?.begin().await?;

    sqlx::query("SELECT set_config('app.organization_id', $1, true)")
        .bind(tenant_ctx.0.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(&user.0.user_id)
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Mesma transação, sem usuário: para leituras que só precisam da chave do tenant.
pub(crate) async fn get_tenant_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
) -> Result<RlsTransaction, AppError> {
    let mut tx = pool(app_state)?.begin().await?;

    sqlx::query("SELECT set_config('app.organization_id', $1, true)")
        .bind(tenant_ctx.0.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Acesso entre tenants para buscas feitas antes de se saber o tenant (leitura de QR).
pub(crate) async fn get_service_connection(app_state: &AppState) -> Result<RlsTransaction, AppError> {
    let mut tx = pool(app_state)?.begin().await?;

    sqlx::query("SELECT set_config('app.bypass_rls', 'on', true)")
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
