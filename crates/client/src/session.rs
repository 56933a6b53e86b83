// crates/client/src/session.rs
//! Logged-in daemon sessions.
//!
//! `SessionRegistry` owns one [`RcClient`] per host plus the notion of a
//! current host, and is itself a [`Dispatch`] that forwards to the current
//! client. It is constructed once by the front end and shared by `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rcview_types::Version;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::client::{Command, Dispatch, RcClient, RcResponse, REQUEST_TIMEOUT};
use crate::error::RcError;

/// Weight-1 limiter that rejects a second submission while one is in flight.
///
/// Guards against duplicate submissions (login, form saves), not data races.
#[derive(Debug, Clone)]
pub struct InFlight {
    permits: Arc<Semaphore>,
    busy_message: String,
}

impl InFlight {
    pub fn new(busy_message: impl Into<String>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            busy_message: busy_message.into(),
        }
    }

    /// Take the slot, or fail immediately with [`RcError::Busy`].
    pub fn try_begin(&self) -> Result<OwnedSemaphorePermit, RcError> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| RcError::Busy(self.busy_message.clone()))
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<RcClient>>>,
    current: RwLock<Option<String>>,
    session_token: Mutex<CancellationToken>,
    version: RwLock<Option<Version>>,
    login_guard: InFlight,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            session_token: Mutex::new(CancellationToken::new()),
            version: RwLock::new(None),
            login_guard: InFlight::new("Attempting to log in"),
            timeout,
        }
    }

    /// Connect to `host`, verify the credentials and switch to it.
    ///
    /// Only one login may run at a time; a concurrent attempt fails with
    /// [`RcError::Busy`]. Calls bound to the previous session token are
    /// cancelled. Returns `user@host` for display.
    pub async fn login(&self, host: &str, user: &str, pass: &str) -> Result<String, RcError> {
        let _permit = self.login_guard.try_begin()?;

        self.renew_session_token();

        let client = self.setup(host, user, pass).await?;
        self.version(true).await?;

        tracing::info!(host = %client.host(), "logged in");
        Ok(client.user_info())
    }

    /// Build (or reuse) the client for `host`, test it and make it current.
    ///
    /// A stored client is reused only when its credentials match; new
    /// credentials replace the session for that host once verified.
    pub async fn setup(&self, host: &str, user: &str, pass: &str) -> Result<Arc<RcClient>, RcError> {
        let candidate = RcClient::with_timeout(host, user, pass, self.timeout)?;
        let client = match self.client(candidate.host()) {
            Some(existing) if existing.has_credentials(user, pass) => existing,
            _ => Arc::new(candidate),
        };

        client
            .send(&Command::new(), "/rc/noopauth", &self.session_token())
            .await?;

        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.insert(client.host().to_string(), Arc::clone(&client));
            }
            Err(e) => tracing::error!("RwLock poisoned writing sessions: {e}"),
        }
        self.set_current(client.host());

        Ok(client)
    }

    pub fn set_current(&self, host: &str) {
        match self.current.write() {
            Ok(mut current) => *current = Some(host.to_string()),
            Err(e) => tracing::error!("RwLock poisoned writing current session: {e}"),
        }
    }

    /// Hosts with an established session, sorted.
    pub fn hosts(&self) -> Vec<String> {
        match self.sessions.read() {
            Ok(sessions) => {
                let mut hosts: Vec<String> = sessions.keys().cloned().collect();
                hosts.sort();
                hosts
            }
            Err(e) => {
                tracing::error!("RwLock poisoned reading sessions: {e}");
                Vec::new()
            }
        }
    }

    pub fn client(&self, host: &str) -> Option<Arc<RcClient>> {
        match self.sessions.read() {
            Ok(sessions) => sessions.get(host).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading sessions: {e}");
                None
            }
        }
    }

    pub fn current(&self) -> Result<Arc<RcClient>, RcError> {
        let host = match self.current.read() {
            Ok(current) => current.clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading current session: {e}");
                None
            }
        };
        host.and_then(|h| self.client(&h)).ok_or(RcError::NoSession)
    }

    /// Token shared by calls that should die with the session.
    pub fn session_token(&self) -> CancellationToken {
        match self.session_token.lock() {
            Ok(token) => token.clone(),
            Err(e) => {
                tracing::error!("Mutex poisoned reading session token: {e}");
                CancellationToken::new()
            }
        }
    }

    /// Cancel everything bound to the current session token and start a new one.
    pub fn renew_session_token(&self) {
        match self.session_token.lock() {
            Ok(mut token) => {
                token.cancel();
                *token = CancellationToken::new();
            }
            Err(e) => tracing::error!("Mutex poisoned renewing session token: {e}"),
        }
    }

    /// Daemon version, cached after the first successful fetch.
    pub async fn version(&self, force: bool) -> Result<Version, RcError> {
        if !force {
            let cached = match self.version.read() {
                Ok(v) => v.clone(),
                Err(e) => {
                    tracing::error!("RwLock poisoned reading version: {e}");
                    None
                }
            };
            if let Some(version) = cached {
                return Ok(version);
            }
        }

        let version: Version = self
            .send(&Command::new(), "/core/version", &self.session_token())
            .await?
            .decode()?;

        match self.version.write() {
            Ok(mut v) => *v = Some(version.clone()),
            Err(e) => tracing::error!("RwLock poisoned writing version: {e}"),
        }
        Ok(version)
    }

    /// Whether the current daemon is reachable over TCP.
    pub async fn dial(&self) -> bool {
        match self.current() {
            Ok(client) => client.dial(Duration::from_secs(1)).await,
            Err(_) => false,
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatch for SessionRegistry {
    async fn send(
        &self,
        command: &Command,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<RcResponse, RcError> {
        let client = self.current()?;
        client.send(command, endpoint, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_rejects_second_submission() {
        let guard = InFlight::new("Saving");
        let permit = guard.try_begin().unwrap();
        let err = guard.try_begin().unwrap_err();
        assert_eq!(err.to_string(), "Saving");

        drop(permit);
        assert!(guard.try_begin().is_ok());
    }

    #[test]
    fn test_registry_without_session() {
        let registry = SessionRegistry::new();
        assert!(matches!(registry.current(), Err(RcError::NoSession)));
        assert!(registry.hosts().is_empty());
    }

    #[test]
    fn test_renew_session_token_cancels_previous() {
        let registry = SessionRegistry::new();
        let old = registry.session_token();
        registry.renew_session_token();
        assert!(old.is_cancelled());
        assert!(!registry.session_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let registry = SessionRegistry::new();
        let err = registry
            .send(&Command::new(), "/core/version", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RcError::NoSession));
    }
}
