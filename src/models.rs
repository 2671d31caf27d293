pub mod action;
pub mod alert;
pub mod analytics;
pub mod audit;
pub mod auth;
pub mod comment;
pub mod identity;
pub mod location;
pub mod notification;
pub mod photo;
pub mod scan;
pub mod schedule;
pub mod search;
pub mod template;
