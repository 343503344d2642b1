//! # Session lifecycle controller
//!
//! [`SessionController`] drives one client session over
//! `{Anonymous, Loading, Authenticated, Error}`:
//!
//! | From | Event | To |
//! |------|-------|----|
//! | any | sign-in attempt or session restore | `Loading` |
//! | `Loading` | session obtained | `Authenticated` (page load runs) |
//! | `Authenticated` | sign-out (local or pushed) | `Anonymous`, document reset |
//! | any | auth provider failure | `Error` until cleared or the next successful transition |
//!
//! Rejected credentials go back to `Anonymous` instead of `Error`; an
//! unconfirmed account is reported as [`AuthError::EmailNotConfirmed`] so the
//! caller can offer [`SessionController::resend_confirmation`].
//!
//! ## Push events
//!
//! [`SessionController::start`] subscribes to the provider's push channel and
//! keeps the handle until [`SessionController::shutdown`]. Events queued by
//! other tabs or by token expiry are applied by
//! [`SessionController::process_events`] through the same transitions as
//! local calls.
//!
//! Providers echo locally started sign-ins and sign-outs onto the same
//! channel. A local transition that succeeds drains the queue, so those echoes
//! (and anything older than the provider state the transition just observed)
//! are never replayed against the newer session.
//!
//! ## Errors
//!
//! Auth, store and partial-write errors are written to a last-error slot and
//! to the activity log. The slot is cleared by [`SessionController::clear_error`]
//! or by the next success of the same kind (a save clears store errors, a
//! sign-in clears auth errors). Validation errors are only returned. None of
//! them end the session: a failed save leaves the document dirty for a retry.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use store::interactions;
use store::{
    Document, Editor, FormDraft, FormSubmission, LinkData, LinkItem, PageStore, Product,
    SaveOutcome, Synchronizer, SyncError,
};
use tracing::{debug, error, info};

use crate::activity_log::{ActivityLog, LogLevel};
use crate::auth::{validate_sign_up, AuthEvent, AuthProvider, AuthSession, AuthSubscription};
use crate::error::{AppError, AuthError, ErrorKind};
use crate::import::ProductImporter;
use crate::models::UserInfo;
use crate::settings::AuthSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Loading,
    Authenticated,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn,
    /// The account exists; the user has to follow the emailed link first.
    ConfirmationRequired,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    session: Option<AuthSession>,
    /// The page of the current session was loaded at least once.
    page_loaded: bool,
    last_error: Option<AppError>,
    confirmation_sent: bool,
    subscription: Option<AuthSubscription>,
    submissions: Vec<FormSubmission>,
    log: ActivityLog,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: SessionState::Anonymous,
            session: None,
            page_loaded: false,
            last_error: None,
            confirmation_sent: false,
            subscription: None,
            submissions: Vec::new(),
            log: ActivityLog::default(),
        }
    }
}

pub struct SessionController<S: PageStore, A: AuthProvider> {
    auth: A,
    sync: Synchronizer<S>,
    settings: AuthSettings,
    inner: Mutex<Inner>,
}

impl<S: PageStore, A: AuthProvider> SessionController<S, A> {
    pub fn new(auth: A, store: S, settings: AuthSettings) -> Self {
        Self {
            auth,
            sync: Synchronizer::new(store),
            settings,
            inner: Mutex::default(),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    pub fn synchronizer(&self) -> &Synchronizer<S> {
        &self.sync
    }

    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.inner().session.clone()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.inner().session.as_ref().map(|s| s.user.clone())
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.inner().last_error.clone()
    }

    /// Drop the held error; an `Error` state falls back to where it came from.
    pub fn clear_error(&self) {
        let mut inner = self.inner();
        inner.last_error = None;
        if inner.state == SessionState::Error {
            inner.state = if inner.session.is_some() {
                SessionState::Authenticated
            } else {
                SessionState::Anonymous
            };
        }
    }

    /// The last sign-in failed only because the email is unconfirmed.
    pub fn needs_confirmation(&self) -> bool {
        self.inner().last_error == Some(AppError::Auth(AuthError::EmailNotConfirmed))
    }

    pub fn confirmation_sent(&self) -> bool {
        self.inner().confirmation_sent
    }

    pub fn activity(&self) -> ActivityLog {
        self.inner().log.clone()
    }

    /// Forms submitted during this session. Never persisted.
    pub fn submissions(&self) -> Vec<FormSubmission> {
        self.inner().submissions.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner().subscription.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.sync.is_loading() || self.state() == SessionState::Loading
    }

    pub fn is_saving(&self) -> bool {
        self.sync.is_saving()
    }

    pub fn is_dirty(&self) -> bool {
        self.sync.is_dirty()
    }

    pub fn document(&self) -> Document {
        self.sync.document()
    }

    /// Run a mutation against the page.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        self.sync.edit(f)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Editor) -> R) -> R {
        self.sync.read(f)
    }

    fn notify(&self, level: LogLevel, message: impl Into<String>) {
        self.inner().log.log(level, message);
    }

    /// Record a non-validation error in the last-error slot and the activity
    /// log, then hand it back.
    fn surface(&self, err: AppError) -> AppError {
        if err.kind() != ErrorKind::Validation {
            error!(kind = ?err.kind(), error = %err, "session error");
            let mut inner = self.inner();
            inner.log.log(LogLevel::Error, err.to_string());
            inner.last_error = Some(err.clone());
        }
        err
    }

    fn clear_kinds(inner: &mut Inner, kinds: &[ErrorKind]) {
        if inner
            .last_error
            .as_ref()
            .is_some_and(|e| kinds.contains(&e.kind()))
        {
            inner.last_error = None;
        }
    }

    /// Auth failure: provider errors move to `Error`, rejected credentials
    /// return to the state matching the current session.
    fn fail_auth(&self, err: AuthError) -> AppError {
        {
            let mut inner = self.inner();
            inner.state = match (&err, inner.session.is_some()) {
                (AuthError::Provider(_), _) => SessionState::Error,
                (_, true) => SessionState::Authenticated,
                (_, false) => SessionState::Anonymous,
            };
        }
        self.surface(err.into())
    }

    /// Subscribe to push events and restore a persisted session, if any.
    pub async fn start(&self) -> Result<(), AppError> {
        {
            let mut inner = self.inner();
            if inner.subscription.is_none() {
                inner.subscription = Some(self.auth.subscribe());
            }
            inner.state = SessionState::Loading;
        }
        match self.auth.get_session().await {
            Ok(Some(session)) => {
                info!(user_id = session.user_id(), "restoring session");
                self.enter(session).await
            }
            Ok(None) => {
                self.inner().state = SessionState::Anonymous;
                Ok(())
            }
            Err(e) => Err(self.fail_auth(e)),
        }
    }

    /// Unsubscribe from push events.
    pub fn shutdown(&self) {
        if self.inner().subscription.take().is_some() {
            debug!("auth subscription released");
        }
    }

    async fn enter(&self, session: AuthSession) -> Result<(), AppError> {
        let user_id = session.user.id.clone();
        {
            let mut inner = self.inner();
            inner.session = Some(session);
            inner.state = SessionState::Loading;
            inner.page_loaded = false;
            inner.confirmation_sent = false;
            Self::clear_kinds(&mut inner, &[ErrorKind::Auth]);
        }
        self.load_page(&user_id).await
    }

    async fn load_page(&self, user_id: &str) -> Result<(), AppError> {
        match self.sync.load(user_id).await {
            Ok(loaded) => {
                debug!(user_id, defaulted = ?loaded.defaulted, "page ready");
                let mut inner = self.inner();
                inner.page_loaded = true;
                inner.state = SessionState::Authenticated;
                Self::clear_kinds(&mut inner, &[ErrorKind::Store]);
                Ok(())
            }
            // The session ended while loading; nothing left to populate.
            Err(SyncError::Superseded) => Ok(()),
            Err(e) => {
                self.inner().state = SessionState::Authenticated;
                Err(self.surface(e.into()))
            }
        }
    }

    /// Load the current user's page again, discarding unsaved edits.
    pub async fn reload(&self) -> Result<(), AppError> {
        let user_id = self.current_user_id()?;
        self.load_page(&user_id).await
    }

    fn current_user_id(&self) -> Result<String, AppError> {
        let user_id = self.inner().session.as_ref().map(|s| s.user.id.clone());
        user_id.ok_or_else(|| self.surface(AuthError::NoSession.into()))
    }

    /// Ends the session: defaults page, and the previous user's notifications
    /// are dropped.
    fn end_session(&self) {
        self.sync.reset();
        let mut inner = self.inner();
        inner.session = None;
        inner.state = SessionState::Anonymous;
        inner.page_loaded = false;
        inner.confirmation_sent = false;
        inner.log.clear();
    }

    /// Discard queued push events after a local transition has been applied.
    fn drain_events(&self) -> usize {
        let mut inner = self.inner();
        let Some(subscription) = inner.subscription.as_mut() else {
            return 0;
        };
        let mut drained = 0;
        while subscription.try_next().is_some() {
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, "dropped auth events superseded by a local transition");
        }
        drained
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AppError> {
        self.inner().state = SessionState::Loading;
        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.drain_events();
                self.notify(
                    LogLevel::Success,
                    format!("Signed in as {}", session.user.display_name()),
                );
                self.enter(session).await
            }
            Err(e) => Err(self.fail_auth(e)),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError> {
        validate_sign_up(email, password, self.settings.min_password_len)?;
        self.inner().state = SessionState::Loading;
        match self
            .auth
            .sign_up(email, password, &self.settings.redirect_target)
            .await
        {
            Ok(Some(session)) => {
                self.drain_events();
                self.notify(LogLevel::Success, "Account created");
                self.enter(session).await?;
                Ok(SignUpOutcome::SignedIn)
            }
            Ok(None) => {
                {
                    let mut inner = self.inner();
                    inner.confirmation_sent = true;
                    inner.state = SessionState::Anonymous;
                }
                self.notify(LogLevel::Info, "Check your email to confirm your account");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
            Err(e) => Err(self.fail_auth(e)),
        }
    }

    pub async fn resend_confirmation(&self, email: &str) -> Result<(), AppError> {
        match self.auth.resend_signup_confirmation(email).await {
            Ok(()) => {
                self.inner().confirmation_sent = true;
                self.notify(LogLevel::Info, "Confirmation email sent");
                Ok(())
            }
            Err(e) => Err(self.surface(e.into())),
        }
    }

    /// Sign out and reset the page to defaults. If the provider refuses, the
    /// session and the page are kept.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        if let Err(e) = self.auth.sign_out().await {
            return Err(self.surface(e.into()));
        }
        self.drain_events();
        self.end_session();
        self.notify(LogLevel::Success, "Signed out successfully");
        Ok(())
    }

    /// Apply queued push events. Returns how many were handled.
    pub async fn process_events(&self) -> usize {
        let mut handled = 0;
        loop {
            let event = self
                .inner()
                .subscription
                .as_mut()
                .and_then(AuthSubscription::try_next);
            let Some(event) = event else {
                break;
            };
            handled += 1;

            match event {
                AuthEvent::SignedIn(session) => {
                    let current = self.inner().session.as_ref().map(|s| s.user.id.clone());
                    if current.as_deref() == Some(session.user_id()) {
                        // Same user; keep the newer token.
                        self.inner().session = Some(session);
                        continue;
                    }
                    if current.is_some() {
                        self.end_session();
                    }
                    info!(user_id = session.user_id(), "signed in elsewhere");
                    self.notify(
                        LogLevel::Success,
                        format!("Signed in as {}", session.user.display_name()),
                    );
                    if let Err(e) = self.enter(session).await {
                        debug!(error = %e, "pushed sign-in could not load the page");
                    }
                }
                AuthEvent::SignedOut => {
                    if self.inner().session.is_some() {
                        info!("signed out elsewhere");
                        self.end_session();
                        self.notify(LogLevel::Success, "Signed out successfully");
                    }
                }
            }
        }
        handled
    }

    /// Persist the page if it has unsaved changes.
    pub async fn save(&self) -> Result<SaveOutcome, AppError> {
        let user_id = self.current_user_id()?;
        if !self.is_dirty() {
            return Ok(SaveOutcome::Clean);
        }
        if !self.inner().page_loaded {
            return Err(self.surface(AppError::NotLoaded));
        }
        match self.sync.save(&user_id).await {
            Ok(outcome) => {
                if outcome != SaveOutcome::Clean {
                    let mut inner = self.inner();
                    Self::clear_kinds(&mut inner, &[ErrorKind::Store, ErrorKind::PartialWrite]);
                    inner.log.log(LogLevel::Success, "Changes saved");
                }
                Ok(outcome)
            }
            Err(e) => Err(self.surface(e.into())),
        }
    }

    pub fn vote(&self, link_id: &str, option_id: &str) -> Result<(), AppError> {
        self.sync
            .edit(|e| interactions::vote(e, link_id, option_id, Utc::now()))
            .map_err(AppError::from)
    }

    pub fn vote_many(&self, link_id: &str, option_ids: &[&str]) -> Result<(), AppError> {
        self.sync
            .edit(|e| interactions::vote_many(e, link_id, option_ids, Utc::now()))
            .map_err(AppError::from)
    }

    pub fn open_form(&self, link_id: &str) -> Result<FormDraft, AppError> {
        self.sync
            .read(|e| FormDraft::open(e, link_id))
            .map_err(AppError::from)
    }

    /// Validate and keep a form submission in memory.
    pub fn submit_form(&self, draft: &mut FormDraft) -> Result<FormSubmission, AppError> {
        let submission = draft.submit(Utc::now())?;
        let mut inner = self.inner();
        inner.submissions.push(submission.clone());
        inner.log.log(LogLevel::Success, "Form submitted");
        Ok(submission)
    }

    /// Append products as `product` links. Products that do not validate are
    /// skipped. Returns how many were added.
    pub fn add_products(&self, products: Vec<Product>) -> usize {
        let mut added = 0;
        for product in products {
            let item = LinkItem::new(LinkData::Product(product));
            match self.sync.edit(|e| e.add_link(item)) {
                Ok(()) => added += 1,
                Err(e) => debug!(error = %e, "skipping product"),
            }
        }
        added
    }

    /// Fetch products from every configured platform and add them.
    pub async fn import_products(&self, importer: &ProductImporter) -> usize {
        let added = self.add_products(importer.fetch_all().await);
        if added == 0 {
            self.notify(LogLevel::Warning, "No products imported");
        } else {
            self.notify(LogLevel::Success, format!("Imported {added} products"));
        }
        added
    }
}
