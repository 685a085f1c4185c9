pub mod auth;
pub mod security_headers;

pub use auth::IdentityGuard;
pub use security_headers::SecurityHeaders;
