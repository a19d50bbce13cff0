//! Database repositories, one per table.

pub mod attempts;
pub mod clients;
pub mod mailings;
pub mod messages;
pub mod repository;
pub mod users;

pub use attempts::Attempts;
pub use clients::{ClientFilter, Clients};
pub use mailings::{MailingFilter, Mailings};
pub use messages::{MessageFilter, Messages};
pub use repository::Repository;
pub use users::{UserFilter, Users};
