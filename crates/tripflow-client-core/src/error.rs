use crate::view::{ViewEvent, ViewState};

/// Bad user input, detected before any state transition or remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination city must not be empty")]
    EmptyCity,
    #[error("trip length must be at least one day")]
    ZeroDays,
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email must contain '@'")]
    InvalidEmail,
    #[error("verification code must not be empty")]
    EmptyVerificationCode,
    #[error("no entry at position {index} in the open panel")]
    NoSuchEntry { index: usize },
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Transport or network failure; the server never answered usefully.
    #[error("remote call failed: {message}")]
    RemoteCall { message: String },
    /// The server answered but reported failure.
    #[error("{message}")]
    BusinessRejection { message: String },
    #[error("no itinerary is active")]
    NoActiveItinerary,
    #[error("view cannot handle {event} while {from}")]
    InvalidTransition { from: ViewState, event: ViewEvent },
}

impl ControllerError {
    pub fn remote(error: impl std::fmt::Display) -> Self {
        Self::RemoteCall {
            message: error.to_string(),
        }
    }

    pub fn rejected(message: Option<String>, fallback: &str) -> Self {
        let message = message
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Self::BusinessRejection { message }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NoActiveItinerary | Self::InvalidTransition { .. }
        )
    }
}
