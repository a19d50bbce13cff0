//! Common type aliases for entity identifiers.
//!
//! All entity ids are 64-bit signed integers (SQLite rowid-backed
//! autoincrement keys) wrapped in aliases for readability:
//!
//! - [`UserId`]: user account identifier
//! - [`ClientId`]: mailing recipient identifier
//! - [`MessageId`]: message template identifier
//! - [`MailingId`]: mailing campaign identifier
//! - [`AttemptId`]: delivery attempt identifier

pub type UserId = i64;
pub type ClientId = i64;
pub type MessageId = i64;
pub type MailingId = i64;
pub type AttemptId = i64;
