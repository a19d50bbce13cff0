//! OpenAPI documentation configuration.
//!
//! The generated document is served as JSON at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::api;
use crate::api::models;

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/", description = "mailcast API server")
    ),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::clients::list_clients,
        api::handlers::clients::create_client,
        api::handlers::clients::get_client,
        api::handlers::clients::update_client,
        api::handlers::clients::delete_client,
        api::handlers::messages::list_messages,
        api::handlers::messages::create_message,
        api::handlers::messages::get_message,
        api::handlers::messages::update_message,
        api::handlers::messages::delete_message,
        api::handlers::mailings::list_mailings,
        api::handlers::mailings::create_mailing,
        api::handlers::mailings::get_mailing,
        api::handlers::mailings::update_mailing,
        api::handlers::mailings::delete_mailing,
        api::handlers::mailings::send_mailing,
        api::handlers::mailings::toggle_mailing,
        api::handlers::mailings::list_attempts,
        api::handlers::mailings::mailing_stats,
        api::handlers::users::list_users,
        api::handlers::users::get_me,
        api::handlers::users::get_user,
        api::handlers::users::block_user,
        api::handlers::users::unblock_user,
        api::handlers::users::promote_user,
        api::handlers::users::demote_user,
        api::handlers::users::manager_overview,
        api::handlers::dashboard::dashboard,
    ),
    components(
        schemas(
            models::auth::RegisterRequest,
            models::auth::LoginRequest,
            models::auth::RegisterResponse,
            models::auth::LoginResponse,
            models::auth::LogoutResponse,
            models::clients::ClientCreate,
            models::clients::ClientUpdate,
            models::clients::ClientResponse,
            models::messages::MessageCreate,
            models::messages::MessageUpdate,
            models::messages::MessageResponse,
            models::mailings::MailingStatus,
            models::mailings::MailingCreate,
            models::mailings::MailingUpdate,
            models::mailings::MailingResponse,
            models::mailings::SendResultResponse,
            models::mailings::MailingStatsResponse,
            models::attempts::AttemptStatus,
            models::attempts::AttemptResponse,
            models::users::UserResponse,
            models::users::ManagerOverview,
            models::dashboard::DashboardResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login and logout"),
        (name = "clients", description = "Recipient management"),
        (name = "messages", description = "Message template management"),
        (name = "mailings", description = "Mailing campaigns, sending and attempt logs"),
        (name = "users", description = "User administration"),
        (name = "dashboard", description = "Site-wide counters"),
    ),
    info(
        title = "mailcast API",
        description = "Email mailing-campaign management service",
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/authentication/login"));
        assert!(paths.contains_key("/api/v1/mailings/{id}/send"));
        assert!(paths.contains_key("/api/v1/users/{id}/block"));
    }
}
