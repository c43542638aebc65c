//! Error taxonomy for the AniList client.

use thiserror::Error;

/// Failures surfaced by the API client.
///
/// `PrivateUser` and `UserNotFound` classify a 404 whose GraphQL error body
/// names the condition. The upstream API reports one error for the whole
/// request, so both carry every member of the batch rather than the specific
/// offender. `Request` means the retry budget is spent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller misuse detected before any network traffic.
    #[error("invalid query arguments: {0}")]
    Contract(String),

    /// At least one user in the batch has a private profile.
    #[error("a user in the batch {users:?} has a private profile")]
    PrivateUser { users: Vec<String> },

    /// At least one user in the batch does not exist.
    #[error("a user in the batch {users:?} was not found")]
    UserNotFound { users: Vec<String> },

    /// A response arrived but did not have the expected shape.
    #[error("unexpected response shape")]
    Decode(#[from] serde_json::Error),

    /// Transport or server failure that survived every retry attempt.
    #[error("request failed after {attempts} attempts: {last_error}")]
    Request { attempts: u32, last_error: String },
}

impl ApiError {
    /// Whether a batch pipeline should drop the current batch and keep going.
    ///
    /// Data conditions (private/unknown users) and argument misuse are scoped
    /// to one batch; everything else poisons the run.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ApiError::Contract(_) | ApiError::PrivateUser { .. } | ApiError::UserNotFound { .. }
        )
    }
}
