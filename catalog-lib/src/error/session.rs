//! Session error types

/// Errors raised by the session guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Username and password did not match the expected pair.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A protected operation was attempted while logged out.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The persisted session flag has not been read yet.
    #[error("Session is still loading")]
    Loading,

    /// The session storage backend failed.
    #[error("Session storage error: {0}")]
    Storage(String),
}
