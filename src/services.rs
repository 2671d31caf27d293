pub mod audit_service;
pub mod auth;
pub mod identity_provider;
pub mod identity_sync;
pub mod location_service;
pub mod photo_service;
pub mod schedule_service;
pub mod search_service;
pub mod template_service;
pub mod webhook_service;
