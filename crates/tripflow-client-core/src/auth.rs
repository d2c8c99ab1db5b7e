use tracing::debug;

use crate::error::ValidationError;
use crate::model::{CurrentUserResponse, LoginRequest, SendCodeRequest};

pub const GUEST_FALLBACK_NAME: &str = "traveler";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_logged_in: bool,
    pub username: Option<String>,
}

impl Session {
    #[must_use]
    pub fn guest() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthSurface {
    #[default]
    Closed,
    Open,
}

/// Login status as last reported by the server, plus the login dialog state.
#[derive(Debug, Default)]
pub struct SessionGate {
    session: Session,
    auth_surface: AuthSurface,
    last_email: Option<String>,
}

impl SessionGate {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn auth_surface(&self) -> AuthSurface {
        self.auth_surface
    }

    pub fn open_auth(&mut self) {
        self.auth_surface = AuthSurface::Open;
    }

    pub fn close_auth(&mut self) {
        self.auth_surface = AuthSurface::Closed;
    }

    pub fn remember_email(&mut self, email: &str) {
        self.last_email = Some(email.to_string());
    }

    /// Mirrors a current-user response. A signed-in user without a username is
    /// shown by the local part of the email used to log in.
    pub fn reflect(&mut self, response: CurrentUserResponse) {
        let username = if response.is_logged_in {
            Some(
                response
                    .username
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .or_else(|| self.email_local_part())
                    .unwrap_or_else(|| GUEST_FALLBACK_NAME.to_string()),
            )
        } else {
            None
        };
        self.session = Session {
            is_logged_in: response.is_logged_in,
            username,
        };
        debug!(
            logged_in = self.session.is_logged_in,
            username = self.session.username.as_deref().unwrap_or(""),
            "session reflected"
        );
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn email_local_part(&self) -> Option<String> {
        self.last_email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(ToString::to_string)
    }
}

pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if !normalized.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(normalized)
}

pub fn normalize_verification_code(raw: &str) -> Result<String, ValidationError> {
    let collapsed = raw.split_whitespace().collect::<String>();
    if collapsed.is_empty() {
        return Err(ValidationError::EmptyVerificationCode);
    }
    Ok(collapsed)
}

pub fn send_code_request(email: &str) -> Result<SendCodeRequest, ValidationError> {
    Ok(SendCodeRequest {
        email: normalize_email(email)?,
    })
}

pub fn login_request(email: &str, code: &str) -> Result<LoginRequest, ValidationError> {
    Ok(LoginRequest {
        email: normalize_email(email)?,
        code: normalize_verification_code(code)?,
    })
}
