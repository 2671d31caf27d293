pub mod action_repo;
pub use action_repo::ActionRepository;
pub mod alert_repo;
pub use alert_repo::AlertRepository;
pub mod analytics_repo;
pub use analytics_repo::AnalyticsRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod comment_repo;
pub use comment_repo::CommentRepository;
pub mod identity_repo;
pub use identity_repo::IdentityRepository;
pub mod location_repo;
pub use location_repo::LocationRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod organization_repo;
pub use organization_repo::OrganizationRepository;
pub mod photo_repo;
pub use photo_repo::PhotoRepository;
pub mod scan_repo;
pub use scan_repo::ScanRepository;
pub mod schedule_repo;
pub use schedule_repo::ScheduleRepository;
pub mod search_repo;
pub use search_repo::SearchRepository;
pub mod template_repo;
pub use template_repo::TemplateRepository;
pub mod reference_repo;
pub use reference_repo::{Reference, ReferenceRepository};

#[cfg(test)]
pub(crate) mod fixtures;
