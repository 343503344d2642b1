use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::password::{hash_password, normalize_email, verify_password};
use super::{AuthEvent, AuthProvider, AuthSession, AuthSubscription};
use crate::error::AuthError;
use crate::models::UserInfo;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug)]
struct Account {
    user: UserInfo,
    password_hash: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by normalized email.
    accounts: HashMap<String, Account>,
    session: Option<AuthSession>,
    require_confirmation: bool,
    offline: bool,
    /// (email, redirect target) of every confirmation mail sent.
    outbox: Vec<(String, String)>,
}

/// In-process AuthProvider for tests and offline use.
///
/// Clones share accounts, the current session and the push channel, so a
/// clone can play the part of "another tab".
#[derive(Clone, Debug)]
pub struct MemoryAuth {
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::default(),
            events,
        }
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// New sign-ups must confirm their email before they can sign in.
    pub fn requiring_confirmation() -> Self {
        let auth = Self::default();
        auth.state().require_confirmation = true;
        auth
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Simulate the user following the confirmation link.
    pub fn confirm(&self, email: &str) -> bool {
        match self.state().accounts.get_mut(&normalize_email(email)) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Confirmation mails sent to `email`, as their redirect targets.
    pub fn confirmations_sent(&self, email: &str) -> Vec<String> {
        let email = normalize_email(email);
        self.state()
            .outbox
            .iter()
            .filter(|(to, _)| *to == email)
            .map(|(_, target)| target.clone())
            .collect()
    }

    /// Make every call fail with [`AuthError::Provider`] until turned off.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// End the session from outside this client, e.g. token revoked.
    pub fn revoke_session(&self) {
        if self.state().session.take().is_some() {
            self.emit(AuthEvent::SignedOut);
        }
    }

    fn check_online(state: &State) -> Result<(), AuthError> {
        if state.offline {
            Err(AuthError::Provider("auth service unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn start_session(&self, mut state: MutexGuard<'_, State>, user: UserInfo) -> AuthSession {
        let session = AuthSession {
            access_token: uuid::Uuid::new_v4().to_string(),
            user,
        };
        state.session = Some(session.clone());
        drop(state);
        info!(user_id = %session.user.id, "signed in");
        self.emit(AuthEvent::SignedIn(session.clone()));
        session
    }
}

impl AuthProvider for MemoryAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let state = self.state();
        Self::check_online(&state)?;
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let state = self.state();
        Self::check_online(&state)?;
        let account = state
            .accounts
            .get(&normalize_email(email))
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !account.confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }
        let user = account.user.clone();
        Ok(self.start_session(state, user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_target: &str,
    ) -> Result<Option<AuthSession>, AuthError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let mut state = self.state();
        Self::check_online(&state)?;
        if state.accounts.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered);
        }
        let user = UserInfo::from_email(uuid::Uuid::new_v4().to_string(), &email);
        let confirmed = !state.require_confirmation;
        state.accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password_hash,
                confirmed,
            },
        );

        if !confirmed {
            debug!(%email, redirect_target, "confirmation sent");
            state.outbox.push((email, redirect_target.to_string()));
            return Ok(None);
        }
        Ok(Some(self.start_session(state, user)))
    }

    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let mut state = self.state();
        Self::check_online(&state)?;
        let pending = state
            .accounts
            .get(&email)
            .is_some_and(|account| !account.confirmed);
        // Unknown or already confirmed addresses succeed silently.
        if pending {
            let target = state
                .outbox
                .iter()
                .rev()
                .find(|(to, _)| *to == email)
                .map(|(_, target)| target.clone())
                .unwrap_or_default();
            state.outbox.push((email, target));
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut state = self.state();
        Self::check_online(&state)?;
        let had_session = state.session.take().is_some();
        drop(state);
        if had_session {
            info!("signed out");
            self.emit(AuthEvent::SignedOut);
        }
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}
