use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quillsign_core::config::SessionConfig;
use quillsign_core::traits::{KEY_SESSION_TOKEN, KEY_SUB_ACCOUNT_DATA};
use quillsign_core::{
    ClientStore, CredentialInput, CredentialOutcome, PortalBackend, PortalResult, SessionValidator,
    SubAccount, SubAccountSession,
};

/// Client identity attached to credential exchange. A native portal host
/// does not know its public address; the backend fills in what it can.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        ClientContext {
            ip_address: String::new(),
            user_agent: concat!("quillsign-portal/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// The shipped validator: always reports valid, including when no backend
/// is configured. Validation never forces a logout; this is the observed
/// availability-over-strictness behavior, kept deliberately.
pub struct TrustingValidator;

#[async_trait]
impl SessionValidator for TrustingValidator {
    async fn validate(&self, _token: &str) -> PortalResult<bool> {
        Ok(true)
    }
}

/// Explicitly scoped sub-account session state: populated by login or
/// restore, cleared by logout, injected into consumers. Never a module-level
/// global.
pub struct SessionManager<B, S> {
    backend: Arc<B>,
    store: Arc<S>,
    validator: Arc<dyn SessionValidator>,
    trust_on_restore: bool,
    context: ClientContext,
    state: RwLock<Option<SubAccountSession>>,
}

impl<B, S> SessionManager<B, S>
where
    B: PortalBackend,
    S: ClientStore,
{
    pub fn new(
        backend: Arc<B>,
        store: Arc<S>,
        config: &SessionConfig,
        context: ClientContext,
    ) -> Self {
        SessionManager {
            backend,
            store,
            validator: Arc::new(TrustingValidator),
            trust_on_restore: config.trust_on_restore,
            context,
            state: RwLock::new(None),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SessionValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Credential exchange. On success the token and the serialized record
    /// are written to durable storage before in-memory state is updated; on
    /// any failure nothing is touched and the caller gets one generic
    /// outcome.
    pub async fn login(
        &self,
        main_account_email: &str,
        username: &str,
        password: &str,
    ) -> PortalResult<CredentialOutcome> {
        let input = CredentialInput {
            main_account_email: main_account_email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            ip_address: self.context.ip_address.clone(),
            user_agent: self.context.user_agent.clone(),
        };

        let outcome = self.backend.verify_credentials(&input).await?;
        if let CredentialOutcome::Success(session) = &outcome {
            self.store.put(KEY_SESSION_TOKEN, &session.token).await?;
            let serialized = serde_json::to_string(&session.sub_account)
                .map_err(|e| quillsign_core::PortalError::Decode(e.to_string()))?;
            self.store.put(KEY_SUB_ACCOUNT_DATA, &serialized).await?;
            *self.state.write().await = Some(session.clone());
            tracing::info!(username, "sub-account login");
        }
        Ok(outcome)
    }

    /// Restore a persisted session without any network round trip.
    ///
    /// In-memory state is populated before any validation occurs; a stored
    /// record that fails to parse is treated as corruption — both keys are
    /// cleared and the client is logged out. Returns whether a session was
    /// restored.
    pub async fn restore(&self) -> PortalResult<bool> {
        let token = self.store.get(KEY_SESSION_TOKEN).await?;
        let data = self.store.get(KEY_SUB_ACCOUNT_DATA).await?;

        let (Some(token), Some(data)) = (token, data) else {
            return Ok(false);
        };

        let sub_account: SubAccount = match serde_json::from_str(&data) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("stored sub-account record is corrupt, clearing session: {e}");
                self.store.remove(KEY_SESSION_TOKEN).await?;
                self.store.remove(KEY_SUB_ACCOUNT_DATA).await?;
                return Ok(false);
            }
        };

        *self.state.write().await = Some(SubAccountSession { token, sub_account });
        Ok(true)
    }

    /// Background validation of the current session. The shipped validator
    /// always reports valid; with `trust_on_restore` a negative verdict is
    /// logged and ignored, without it the session is cleared.
    pub async fn validate_current(&self) {
        let Some(session) = self.current().await else {
            return;
        };
        match self.validator.validate(&session.token).await {
            Ok(true) => {}
            Ok(false) => {
                if self.trust_on_restore {
                    tracing::warn!("session validation reported invalid; trusting local session");
                } else {
                    tracing::warn!("session validation reported invalid; logging out");
                    if let Err(e) = self.logout().await {
                        tracing::warn!("failed to clear session: {e}");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("session validation unavailable, keeping session: {e}");
            }
        }
    }

    pub async fn logout(&self) -> PortalResult<()> {
        self.store.remove(KEY_SESSION_TOKEN).await?;
        self.store.remove(KEY_SUB_ACCOUNT_DATA).await?;
        *self.state.write().await = None;
        Ok(())
    }

    pub async fn current(&self) -> Option<SubAccountSession> {
        self.state.read().await.clone()
    }

    /// Presence of a session implies "is a sub-account" for routing,
    /// independent of server-side validity.
    pub async fn is_sub_account(&self) -> bool {
        self.state.read().await.is_some()
    }
}
