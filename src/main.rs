// src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::session_middleware;
use crate::services::photo_service::MAX_PHOTO_BYTES;

// Room for the multipart framing around a maximum-size photo.
const UPLOAD_BODY_LIMIT: usize = MAX_PHOTO_BYTES + 1024 * 1024;

fn api_routes() -> Router<AppState> {
    let audit_routes = Router::new()
        .route("/", get(handlers::audits::list_audits).post(handlers::audits::create_audit))
        .route(
            "/{id}",
            get(handlers::audits::get_audit)
                .patch(handlers::audits::update_audit)
                .delete(handlers::audits::delete_audit),
        )
        .route("/{id}/complete", post(handlers::audits::complete_audit))
        .route(
            "/{id}/photos",
            get(handlers::photos::list_photos)
                .post(handlers::photos::upload_photo)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        );

    let action_routes = Router::new()
        .route("/", get(handlers::actions::list_actions).post(handlers::actions::create_action))
        .route(
            "/{id}",
            get(handlers::actions::get_action)
                .patch(handlers::actions::update_action)
                .delete(handlers::actions::delete_action),
        )
        .route("/{id}/status", post(handlers::actions::set_action_status))
        .route(
            "/{id}/comments",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        );

    let location_routes = Router::new()
        .route("/", get(handlers::locations::list_locations).post(handlers::locations::create_location))
        .route(
            "/{id}",
            get(handlers::locations::get_location).patch(handlers::locations::update_location),
        )
        .route("/{id}/status", post(handlers::locations::set_location_status))
        .route("/{id}/qr", post(handlers::locations::update_location_qr))
        .route("/{id}/qr.png", get(handlers::locations::location_qr_png));

    let template_routes = Router::new()
        .route("/", get(handlers::templates::list_templates).post(handlers::templates::create_template))
        .route(
            "/{id}",
            get(handlers::templates::get_template)
                .patch(handlers::templates::update_template)
                .delete(handlers::templates::delete_template),
        );

    let schedule_routes = Router::new()
        .route("/", get(handlers::schedules::list_schedules).post(handlers::schedules::create_schedule))
        .route(
            "/{id}",
            patch(handlers::schedules::update_schedule).delete(handlers::schedules::delete_schedule),
        )
        .route("/{id}/active", post(handlers::schedules::set_schedule_active))
        .route("/{id}/advance", post(handlers::schedules::advance_schedule));

    let alert_routes = Router::new()
        .route("/", get(handlers::alerts::list_alerts))
        .route("/{id}", delete(handlers::alerts::delete_alert))
        .route("/{id}/read", post(handlers::alerts::mark_alert_read));

    let notification_routes = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route("/unread-count", get(handlers::notifications::unread_count))
        .route("/read-all", post(handlers::notifications::mark_all_notifications_read))
        .route("/{id}/read", post(handlers::notifications::mark_notification_read));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/session", get(handlers::session::get_session))
        .route("/search", get(handlers::search::search))
        .route("/analytics/overview", get(handlers::analytics::get_overview))
        .route("/comments/{id}", delete(handlers::comments::delete_comment))
        .route("/photos/{id}", delete(handlers::photos::delete_photo))
        .route("/sync-users", get(handlers::sync::sync_users))
        .route("/webhooks/clerk", post(handlers::webhooks::clerk_webhook))
        .nest("/audits", audit_routes)
        .nest("/actions", action_routes)
        .nest("/locations", location_routes)
        .nest("/templates", template_routes)
        .nest("/scheduled-audits", schedule_routes)
        .nest("/alerts", alert_routes)
        .nest("/notifications", notification_routes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("auditflow=info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await?;

    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!().run(pool).await?;
        tracing::info!("Database migrations applied");
    }

    let bind_addr = app_state.settings.bind_addr.clone();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes())
        .route("/scan/{token}", get(handlers::scan::scan))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), session_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Um handler cujo future não é Send não compila aqui.
    #[test]
    fn every_route_group_builds_into_a_router() {
        let _app: Router = api_routes().with_state(AppState::for_tests());
    }
}
