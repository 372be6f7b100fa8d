use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no authenticated user; log in first")]
    NotAuthenticated,
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account for `{email}` already exists")]
    EmailTaken { email: String },
    #[error("auth provider failed: {0}")]
    Provider(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
