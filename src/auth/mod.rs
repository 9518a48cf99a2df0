// Authentication module
// JWT access tokens, rotating refresh tokens held in a cookie, and per-user session lists

pub mod cookie;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod session;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{login_handler, logout_handler, refresh_handler, register_handler};
pub use middleware::AuthenticatedUser;
pub use models::{LoginRequest, RegisterRequest, User};
pub use repository::{CredentialStore, PgUserRepository, SessionStore};
pub use service::AuthService;
