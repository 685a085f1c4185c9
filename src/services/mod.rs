pub mod auth_service;
pub mod google_auth_service;
pub mod id_token_service;
pub mod identity_service;
pub mod team_service;
