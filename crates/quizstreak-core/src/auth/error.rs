use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No authentication token")]
    NotAuthenticated,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Authentication expired")]
    AuthenticationExpired,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error(transparent)]
    Api(ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => AuthError::AuthenticationExpired,
            other => AuthError::Api(other),
        }
    }
}

impl AuthError {
    /// True when the failure came from the network rather than the server's verdict
    pub fn is_network(&self) -> bool {
        matches!(self, AuthError::Api(e) if e.is_transport())
    }
}
