//! In-memory portal and push relay for tests and dry runs.
//!
//! - [`ScriptedPortal`]: serves a configurable page per portal username and
//!   records every call made against it
//! - [`RecordingRelay`]: accepts every message and keeps a copy

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use notify_core::{DeliveryResult, DocumentModel, PortalCredentials, PushMessage};

use super::portal::{AckTarget, Portal, PortalError, PortalSession};
use super::push::PushRelay;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A call observed by [`ScriptedPortal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalCall {
    Login(String),
    Fetch { user: String, url: String },
    Ack { user: String, target: AckTarget },
    Close(String),
}

#[derive(Debug, Clone, Default)]
struct Script {
    page: Option<DocumentModel>,
    login_error: Option<PortalError>,
    fetch_error: Option<PortalError>,
    ack_errors: Vec<(AckTarget, PortalError)>,
    fetch_delay: Option<Duration>,
    close_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct PortalState {
    scripts: HashMap<String, Script>,
    calls: Vec<PortalCall>,
}

/// Portal fake keyed by login username. Users without a script log in and
/// see an empty page.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPortal {
    state: Arc<Mutex<PortalState>>,
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, user: &str, f: impl FnOnce(&mut Script)) {
        let mut state = lock(&self.state);
        f(state.scripts.entry(user.to_string()).or_default());
    }

    /// Page served to `user` from now on.
    pub fn set_page(&self, user: &str, page: DocumentModel) {
        self.script(user, |s| s.page = Some(page));
    }

    pub fn reject_login(&self, user: &str) {
        self.script(user, |s| {
            s.login_error = Some(PortalError::LoginRejected("bad credentials".into()))
        });
    }

    pub fn fail_fetch(&self, user: &str, err: PortalError) {
        self.script(user, |s| s.fetch_error = Some(err));
    }

    pub fn fail_ack(&self, user: &str, target: AckTarget) {
        self.script(user, |s| {
            s.ack_errors.push((
                target.clone(),
                PortalError::Status {
                    url: target.to_string(),
                    status: 500,
                },
            ))
        });
    }

    /// Makes page fetches for `user` hang for `delay`.
    pub fn delay_fetch(&self, user: &str, delay: Duration) {
        self.script(user, |s| s.fetch_delay = Some(delay));
    }

    /// Makes session close for `user` hang for `delay`.
    pub fn delay_close(&self, user: &str, delay: Duration) {
        self.script(user, |s| s.close_delay = Some(delay));
    }

    pub fn calls(&self) -> Vec<PortalCall> {
        lock(&self.state).calls.clone()
    }

    pub fn calls_for(&self, user: &str) -> Vec<PortalCall> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                PortalCall::Login(u) | PortalCall::Close(u) => u == user,
                PortalCall::Fetch { user: u, .. } | PortalCall::Ack { user: u, .. } => u == user,
            })
            .collect()
    }

    fn record(&self, call: PortalCall) -> Script {
        let mut state = lock(&self.state);
        let user = match &call {
            PortalCall::Login(u) | PortalCall::Close(u) => u.clone(),
            PortalCall::Fetch { user, .. } | PortalCall::Ack { user, .. } => user.clone(),
        };
        state.calls.push(call);
        state.scripts.get(&user).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Portal for ScriptedPortal {
    async fn authenticate(
        &self,
        credentials: &PortalCredentials,
    ) -> Result<Box<dyn PortalSession>, PortalError> {
        let script = self.record(PortalCall::Login(credentials.username.clone()));
        if let Some(err) = script.login_error {
            return Err(err);
        }
        Ok(Box::new(ScriptedSession {
            portal: self.clone(),
            user: credentials.username.clone(),
        }))
    }
}

struct ScriptedSession {
    portal: ScriptedPortal,
    user: String,
}

#[async_trait]
impl PortalSession for ScriptedSession {
    async fn fetch_page(&self, url: &str) -> Result<DocumentModel, PortalError> {
        let script = self.portal.record(PortalCall::Fetch {
            user: self.user.clone(),
            url: url.to_string(),
        });
        if let Some(delay) = script.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = script.fetch_error {
            return Err(err);
        }
        Ok(script.page.unwrap_or_else(|| DocumentModel::new(url)))
    }

    async fn acknowledge(&self, target: &AckTarget) -> Result<(), PortalError> {
        let script = self.portal.record(PortalCall::Ack {
            user: self.user.clone(),
            target: target.clone(),
        });
        match script.ack_errors.into_iter().find(|(t, _)| t == target) {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&self) {
        let script = self.portal.record(PortalCall::Close(self.user.clone()));
        if let Some(delay) = script.close_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Relay fake that records messages. Tokens registered with
/// [`RecordingRelay::fail_token`] report a failure.
#[derive(Debug, Clone, Default)]
pub struct RecordingRelay {
    sent: Arc<Mutex<Vec<PushMessage>>>,
    failing: Arc<Mutex<HashMap<String, String>>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_token(&self, token: &str, reason: &str) {
        lock(&self.failing).insert(token.to_string(), reason.to_string());
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl PushRelay for RecordingRelay {
    async fn deliver(&self, message: PushMessage) -> DeliveryResult {
        let token = message.to.clone();
        lock(&self.sent).push(message);
        match lock(&self.failing).get(&token) {
            Some(reason) => DeliveryResult::failed(token, reason.clone()),
            None => DeliveryResult::sent(token, Some("ticket".into())),
        }
    }
}
