//! HTTP request handlers.

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod mailings;
pub mod messages;
pub mod users;
