pub mod auth;
pub mod error;
pub mod store;

pub use auth::{AuthIdentity, AuthProvider, AuthService, LocalAuthProvider};
pub use error::{AuthError, SessionError};
pub use store::{SessionEvent, SessionStore, SessionSubscription};
