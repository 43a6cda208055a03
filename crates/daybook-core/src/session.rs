//! Session gate and the identity collaborator seam.
//!
//! The workspace never reads session state from anywhere global: a
//! [`SessionGate`] is owned by the page shell and updated only through
//! [`AuthControl`], which talks to an [`IdentityProvider`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;

pub const DEFAULT_PROVIDER: &str = "google";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Welcome")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),
    #[error("sign-in rejected: {0}")]
    Rejected(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// The external identity collaborator.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn sign_in(&mut self, provider: &str) -> Result<Session, AuthError>;

    async fn sign_out(&mut self) -> Result<(), AuthError>;

    fn session(&self) -> Option<Session>;
}

/// OAuth client registration for one provider. The exchange itself happens
/// outside this crate; only presence of credentials is checked.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthProviderConfig {
    pub id: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl OAuthProviderConfig {
    /// Reads `AUTH_<ID>_ID` and `AUTH_<ID>_SECRET`.
    pub fn from_env(id: &str) -> Self {
        let upper = id.trim().to_ascii_uppercase();
        let read = |suffix: &str| {
            std::env::var(format!("AUTH_{upper}_{suffix}"))
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            id: id.trim().to_ascii_lowercase(),
            client_id: read("ID"),
            client_secret: read("SECRET"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Local identity provider that signs in a configured user.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: User,
    providers: Vec<OAuthProviderConfig>,
    failure: Option<String>,
    current: Option<Session>,
}

impl StaticIdentity {
    pub fn new(user: User, providers: Vec<OAuthProviderConfig>) -> Self {
        Self {
            user,
            providers,
            failure: None,
            current: None,
        }
    }

    /// Every call fails with `reason` until cleared.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn set_failure(&mut self, reason: Option<String>) {
        self.failure = reason;
    }

    pub fn providers(&self) -> &[OAuthProviderConfig] {
        &self.providers
    }

    #[instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> Self {
        let provider_ids = cfg
            .get("auth.provider")
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let providers: Vec<OAuthProviderConfig> = provider_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(OAuthProviderConfig::from_env)
            .collect();

        for provider in &providers {
            if provider.is_configured() {
                debug!(provider = %provider.id, "oauth credentials present");
            } else {
                warn!(
                    provider = %provider.id,
                    "oauth client credentials missing; sign-in stays local"
                );
            }
        }

        let user = User {
            name: cfg.get("auth.user.name").filter(|v| !v.is_empty()),
            email: cfg.get("auth.user.email").filter(|v| !v.is_empty()),
        };
        let identity = Self::new(user, providers);
        if cfg.get_bool("auth.fail").unwrap_or(false) {
            identity.failing("identity provider configured to fail")
        } else {
            identity
        }
    }
}

impl IdentityProvider for StaticIdentity {
    async fn sign_in(&mut self, provider: &str) -> Result<Session, AuthError> {
        tokio::task::yield_now().await;

        let wanted = provider.trim().to_ascii_lowercase();
        if !self.providers.iter().any(|p| p.id == wanted) {
            return Err(AuthError::UnknownProvider(wanted));
        }
        if let Some(reason) = &self.failure {
            return Err(AuthError::Rejected(reason.clone()));
        }

        let session = Session {
            user: self.user.clone(),
        };
        self.current = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&mut self) -> Result<(), AuthError> {
        tokio::task::yield_now().await;

        if let Some(reason) = &self.failure {
            return Err(AuthError::Unavailable(reason.clone()));
        }
        if self.current.take().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        Ok(())
    }

    fn session(&self) -> Option<Session> {
        self.current.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

/// Decides whether the protected workspace renders.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    state: GateState,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, GateState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            GateState::Authenticated(session) => Some(session),
            GateState::Unauthenticated => None,
        }
    }

    /// Re-reads the provider's session; returns whether it is authenticated.
    pub fn refresh<P: IdentityProvider>(&mut self, provider: &P) -> bool {
        match provider.session() {
            Some(session) => self.enter(session),
            None => self.leave(),
        }
        self.is_authenticated()
    }

    fn enter(&mut self, session: Session) {
        if !self.is_authenticated() {
            info!(user = ?session.user.email, "session gate opened");
        }
        self.state = GateState::Authenticated(session);
    }

    fn leave(&mut self) {
        if self.is_authenticated() {
            info!("session gate closed");
        }
        self.state = GateState::Unauthenticated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignOut,
}

/// Proof that an auth action was started; consumed by `finish_*`.
#[derive(Debug)]
#[must_use]
pub struct AuthTicket {
    action: AuthAction,
}

impl AuthTicket {
    pub fn action(&self) -> AuthAction {
        self.action
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn(Session),
    SignedOut,
    Failed(AuthError),
    /// Another action was still pending.
    Ignored,
}

/// Loading indicator and enabled flag of the sign-in/sign-out control.
#[derive(Debug, Clone, Default)]
pub struct AuthControl {
    pending: Option<AuthAction>,
}

impl AuthControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        !self.is_loading()
    }

    pub fn pending(&self) -> Option<AuthAction> {
        self.pending
    }

    /// Starts an action, or returns None while one is outstanding.
    pub fn begin(&mut self, action: AuthAction) -> Option<AuthTicket> {
        if let Some(pending) = self.pending {
            warn!(?pending, requested = ?action, "auth action already in flight; ignoring");
            return None;
        }
        debug!(?action, "auth action started");
        self.pending = Some(action);
        Some(AuthTicket { action })
    }

    pub fn finish_sign_in(
        &mut self,
        ticket: AuthTicket,
        result: Result<Session, AuthError>,
        gate: &mut SessionGate,
    ) -> AuthOutcome {
        self.release(&ticket);
        match result {
            Ok(session) => {
                gate.enter(session.clone());
                AuthOutcome::SignedIn(session)
            }
            Err(err) => {
                error!(error = %err, "sign in error");
                AuthOutcome::Failed(err)
            }
        }
    }

    pub fn finish_sign_out(
        &mut self,
        ticket: AuthTicket,
        result: Result<(), AuthError>,
        gate: &mut SessionGate,
    ) -> AuthOutcome {
        self.release(&ticket);
        match result {
            Ok(()) => {
                gate.leave();
                AuthOutcome::SignedOut
            }
            Err(err) => {
                error!(error = %err, "sign out error");
                AuthOutcome::Failed(err)
            }
        }
    }

    pub async fn sign_in<P: IdentityProvider>(
        &mut self,
        provider: &mut P,
        gate: &mut SessionGate,
        provider_id: &str,
    ) -> AuthOutcome {
        let Some(ticket) = self.begin(AuthAction::SignIn) else {
            return AuthOutcome::Ignored;
        };
        let result = provider.sign_in(provider_id).await;
        self.finish_sign_in(ticket, result, gate)
    }

    pub async fn sign_out<P: IdentityProvider>(
        &mut self,
        provider: &mut P,
        gate: &mut SessionGate,
    ) -> AuthOutcome {
        let Some(ticket) = self.begin(AuthAction::SignOut) else {
            return AuthOutcome::Ignored;
        };
        let result = provider.sign_out().await;
        self.finish_sign_out(ticket, result, gate)
    }

    fn release(&mut self, ticket: &AuthTicket) {
        debug!(action = ?ticket.action, "auth action finished");
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AuthAction, AuthControl, AuthError, AuthOutcome, GateState, IdentityProvider,
        OAuthProviderConfig, SessionGate, StaticIdentity, User,
    };

    fn google() -> OAuthProviderConfig {
        OAuthProviderConfig {
            id: "google".to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
        }
    }

    fn identity() -> StaticIdentity {
        StaticIdentity::new(
            User {
                name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
            },
            vec![google()],
        )
    }

    #[tokio::test]
    async fn sign_in_then_out_moves_gate_both_ways() {
        let mut provider = identity();
        let mut gate = SessionGate::new();
        let mut control = AuthControl::new();

        let outcome = control.sign_in(&mut provider, &mut gate, "google").await;
        assert!(matches!(outcome, AuthOutcome::SignedIn(_)));
        assert!(gate.is_authenticated());
        assert!(control.is_enabled());

        let outcome = control.sign_out(&mut provider, &mut gate).await;
        assert_eq!(outcome, AuthOutcome::SignedOut);
        assert_eq!(gate.state(), &GateState::Unauthenticated);
    }

    #[tokio::test]
    async fn failure_clears_loading_and_keeps_gate_closed() {
        let mut provider = identity().failing("network down");
        let mut gate = SessionGate::new();
        let mut control = AuthControl::new();

        let outcome = control.sign_in(&mut provider, &mut gate, "google").await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::Rejected("network down".to_string()))
        );
        assert!(!gate.is_authenticated());
        assert!(!control.is_loading());
    }

    #[tokio::test]
    async fn unknown_provider_is_reported() {
        let mut provider = identity();
        let mut gate = SessionGate::new();
        let mut control = AuthControl::new();

        let outcome = control.sign_in(&mut provider, &mut gate, "github").await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::UnknownProvider("github".to_string()))
        );
    }

    #[tokio::test]
    async fn duplicate_submission_is_ignored_while_pending() {
        let mut provider = identity();
        let mut gate = SessionGate::new();
        let mut control = AuthControl::new();

        let ticket = control.begin(AuthAction::SignIn).expect("first begin");
        assert!(control.is_loading());
        assert!(!control.is_enabled());
        assert!(control.begin(AuthAction::SignIn).is_none());
        assert_eq!(
            control.sign_in(&mut provider, &mut gate, "google").await,
            AuthOutcome::Ignored
        );

        let result = provider.sign_in("google").await;
        let outcome = control.finish_sign_in(ticket, result, &mut gate);
        assert!(matches!(outcome, AuthOutcome::SignedIn(_)));
        assert!(control.is_enabled());
    }

    #[tokio::test]
    async fn failed_sign_out_keeps_session() {
        let mut provider = identity();
        let mut gate = SessionGate::new();
        let mut control = AuthControl::new();
        control.sign_in(&mut provider, &mut gate, "google").await;

        provider.set_failure(Some("offline".to_string()));
        let outcome = control.sign_out(&mut provider, &mut gate).await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::Unavailable("offline".to_string()))
        );
        assert!(gate.is_authenticated());
        assert!(gate.refresh(&provider));
    }

    #[tokio::test]
    async fn sign_out_without_session_is_an_error() {
        let mut provider = identity();
        assert_eq!(provider.sign_out().await, Err(AuthError::NotSignedIn));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", google());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"secret\""));
    }
}
