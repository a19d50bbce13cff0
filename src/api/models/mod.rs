//! API request/response models.

pub mod attempts;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod mailings;
pub mod messages;
pub mod pagination;
pub mod users;
