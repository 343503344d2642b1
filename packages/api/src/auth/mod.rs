//! Authentication boundary.
//!
//! [`AuthProvider`] is the contract a hosted auth service has to meet: session
//! lookup, password sign-in, sign-up with an email confirmation redirect,
//! resending the confirmation, sign-out and a push channel of session changes.
//! [`MemoryAuth`] implements it in-process.

use std::future::Future;

mod memory;
mod password;
mod session;

pub use memory::MemoryAuth;
pub use password::{hash_password, normalize_email, validate_sign_up, verify_password};
pub use session::{AuthEvent, AuthSession, AuthSubscription};

use crate::error::AuthError;

pub trait AuthProvider {
    /// The current session, if one was persisted by an earlier sign-in.
    fn get_session(&self) -> impl Future<Output = Result<Option<AuthSession>, AuthError>>;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession, AuthError>>;

    /// Register a new account. `None` means the account exists but the email
    /// has to be confirmed (via a link to `redirect_target`) before sign-in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_target: &str,
    ) -> impl Future<Output = Result<Option<AuthSession>, AuthError>>;

    fn resend_signup_confirmation(&self, email: &str)
        -> impl Future<Output = Result<(), AuthError>>;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>>;

    /// Start receiving [`AuthEvent`]s. Dropping the handle unsubscribes.
    fn subscribe(&self) -> AuthSubscription;
}
