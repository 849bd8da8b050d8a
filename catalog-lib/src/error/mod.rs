//! Error types

mod api;
mod session;
mod validation;

pub use api::*;
pub use session::*;
pub use validation::*;

/// Top-level error returned by the catalog layers.
///
/// Cheap to clone so a single failed fetch can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The remote product service failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session guard refused the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl Error {
    /// Returns the API error, if this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Session(_) => None,
        }
    }

    /// Returns `true` if the remote service reported a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(ApiError::NotFound { .. }))
    }
}
