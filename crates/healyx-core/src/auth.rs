//! Provider authentication.
//!
//! Sign-in, sign-out, provider sign-up and the connection probe shown on the
//! sign-in page. Form validation happens before the auth service is contacted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::backend::{AuthProvider, AuthSession, AuthUser, BackendError};

/// Shown when the auth service cannot be reached.
pub const CONNECTION_MESSAGE: &str =
    "Unable to connect to authentication service. Please check your internet connection.";

/// Shown when a sign-up needs email confirmation before use.
pub const CONFIRMATION_MESSAGE: &str = "Please check your email for the confirmation link";

/// Role stored in the metadata of every provider account.
pub const PROVIDER_ROLE: &str = "provider";

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Please accept the Terms & Conditions")]
    TermsNotAccepted,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{}", CONNECTION_MESSAGE)]
    Connection,

    #[error("{0}")]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Fold transport failures into the connection error the UI shows.
    fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::Connection(_) | BackendError::Http(_) => AuthError::Connection,
            BackendError::Auth(message) => AuthError::InvalidCredentials(message),
            other => AuthError::Backend(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// The provider sign-up form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderSignUp {
    pub organization: String,
    pub location: String,
    pub admin: String,
    pub email: String,
    pub npi: String,
    pub password: String,
    pub confirm_password: String,
    pub terms_accepted: bool,
}

impl ProviderSignUp {
    pub fn validate(&self) -> AuthResult<()> {
        if self.password != self.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if !self.terms_accepted {
            return Err(AuthError::TermsNotAccepted);
        }
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(())
    }

    /// User metadata stored with the account.
    pub fn metadata(&self) -> Value {
        json!({
            "organization": self.organization,
            "location": self.location,
            "admin": self.admin,
            "npi": self.npi,
            "role": PROVIDER_ROLE,
        })
    }
}

/// Result of a provider sign-up.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account usable immediately
    SignedIn(AuthSession),
    /// Account created; the provider must confirm their email before signing in
    AccountCreated(AuthUser),
    /// The service answered without a usable identity (e.g., the email is
    /// already registered and unconfirmed)
    ConfirmationRequired,
}

impl SignUpOutcome {
    /// Short name of the outcome for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SignUpOutcome::SignedIn(_) => "signed_in",
            SignUpOutcome::AccountCreated(_) => "account_created",
            SignUpOutcome::ConfirmationRequired => "confirmation_required",
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            SignUpOutcome::SignedIn(_) => None,
            SignUpOutcome::AccountCreated(_) | SignUpOutcome::ConfirmationRequired => {
                Some(CONFIRMATION_MESSAGE)
            }
        }
    }
}

pub fn sign_in(auth: &dyn AuthProvider, email: &str, password: &str) -> AuthResult<AuthSession> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    match auth.sign_in_with_password(email.trim(), password) {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "Signed in");
            Ok(session)
        }
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed");
            Err(AuthError::from_backend(e))
        }
    }
}

pub fn sign_up(auth: &dyn AuthProvider, form: &ProviderSignUp) -> AuthResult<SignUpOutcome> {
    form.validate()?;

    let response = auth
        .sign_up(form.email.trim(), &form.password, &form.metadata())
        .map_err(|e| {
            tracing::error!(error = %e, "Sign-up failed");
            AuthError::from_backend(e)
        })?;

    let outcome = match (response.session, response.user) {
        (Some(session), _) => SignUpOutcome::SignedIn(session),
        (None, Some(user)) if !user.identities.is_empty() => SignUpOutcome::AccountCreated(user),
        (None, _) => SignUpOutcome::ConfirmationRequired,
    };
    tracing::info!(email = %form.email.trim(), outcome = outcome.kind(), "Provider sign-up");
    Ok(outcome)
}

/// Revoke the session remotely. The caller drops its copy regardless.
pub fn sign_out(auth: &dyn AuthProvider, session: &AuthSession) -> AuthResult<()> {
    auth.sign_out(&session.access_token).map_err(|e| {
        tracing::error!(error = %e, "Sign-out failed");
        AuthError::from_backend(e)
    })
}

/// Probe the auth service.
pub fn check_connection(auth: &dyn AuthProvider) -> AuthResult<()> {
    auth.health().map_err(|e| {
        tracing::error!(error = %e, "Auth service unreachable");
        AuthError::Connection
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;

    fn form() -> ProviderSignUp {
        ProviderSignUp {
            organization: "Riverside Clinic".into(),
            location: "Portland, OR".into(),
            admin: "Dana Reyes".into(),
            email: "dana@riverside.org".into(),
            npi: "1234567893".into(),
            password: "correct horse".into(),
            confirm_password: "correct horse".into(),
            terms_accepted: true,
        }
    }

    #[test]
    fn test_validation_messages() {
        let mut f = form();
        f.confirm_password = "other".into();
        assert_eq!(f.validate().unwrap_err().to_string(), "Passwords do not match");

        let mut f = form();
        f.terms_accepted = false;
        assert_eq!(
            f.validate().unwrap_err().to_string(),
            "Please accept the Terms & Conditions"
        );
    }

    #[test]
    fn test_metadata_carries_role() {
        let metadata = form().metadata();
        assert_eq!(metadata["role"], "provider");
        assert_eq!(metadata["npi"], "1234567893");
        assert_eq!(metadata["organization"], "Riverside Clinic");
    }

    #[test]
    fn test_sign_up_and_sign_in() {
        let backend = LocalBackend::open_in_memory().unwrap();
        let outcome = sign_up(&backend, &form()).unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
        assert_eq!(outcome.message(), None);

        let session = sign_in(&backend, "dana@riverside.org", "correct horse").unwrap();
        assert_eq!(session.user.user_metadata["role"], "provider");
        sign_out(&backend, &session).unwrap();
    }

    #[test]
    fn test_signed_in_outcome_does_not_print_tokens() {
        let backend = LocalBackend::open_in_memory().unwrap();
        let outcome = sign_up(&backend, &form()).unwrap();
        let SignUpOutcome::SignedIn(session) = &outcome else {
            panic!("expected a session, got {:?}", outcome);
        };
        assert_eq!(outcome.kind(), "signed_in");

        let printed = format!("{:?}", outcome);
        assert!(!printed.contains(&session.access_token));
        assert!(!printed.contains(&session.refresh_token));
    }

    #[test]
    fn test_duplicate_sign_up_requires_confirmation() {
        let backend = LocalBackend::open_in_memory().unwrap();
        sign_up(&backend, &form()).unwrap();
        let outcome = sign_up(&backend, &form()).unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
        assert_eq!(outcome.message(), Some(CONFIRMATION_MESSAGE));
    }

    #[test]
    fn test_bad_credentials() {
        let backend = LocalBackend::open_in_memory().unwrap();
        sign_up(&backend, &form()).unwrap();
        let err = sign_in(&backend, "dana@riverside.org", "nope").unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(matches!(
            sign_in(&backend, "", "x"),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_transport_errors_become_connection_error() {
        let err = AuthError::from_backend(BackendError::Connection("https://x".into()));
        assert_eq!(err.to_string(), CONNECTION_MESSAGE);
    }

    #[test]
    fn test_check_connection_local() {
        let backend = LocalBackend::open_in_memory().unwrap();
        check_connection(&backend).unwrap();
    }
}
