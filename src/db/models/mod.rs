//! Database request/response models.
//!
//! Each entity has three shapes: a `*CreateDBRequest` consumed by
//! `Repository::create`, a `*UpdateDBRequest` with optional fields where
//! `None` means "leave unchanged", and a `*DBResponse` row representation.

pub mod attempts;
pub mod clients;
pub mod mailings;
pub mod messages;
pub mod users;
