use std::net::SocketAddr;
use std::time::Duration;

use notify_core::extract::VISIT_ID_PLACEHOLDER;
use notify_core::{ExtractorConfig, MessageTemplates};

use crate::error::HostError;

pub const DEFAULT_PORTAL_URL: &str = "https://megaegyptlabresult.gts-sys.com";
pub const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(key: &str) -> Result<Option<Duration>, HostError> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| HostError::Config(format!("{key}={raw}: {e}"))),
        None => Ok(None),
    }
}

/// Where and how the HTTP portal adapter talks to the patient portal.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub login_path: String,
    pub notifications_path: String,
    pub read_all_path: String,
    /// Detail page of one visit; `{visit_id}` is replaced.
    pub visit_path: String,
    pub username_field: String,
    pub password_field: String,
    pub user_agent: String,
    /// Login and page fetches.
    pub request_timeout: Duration,
    pub visit_timeout: Duration,
    pub read_all_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_URL.into(),
            login_path: "/Patient/Login".into(),
            notifications_path: "/Patient/Notification".into(),
            read_all_path: "/Notification?Area=Configuration".into(),
            visit_path: format!("/Patient/Visit?VisitId={VISIT_ID_PLACEHOLDER}"),
            username_field: "Id".into(),
            password_field: "password".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            request_timeout: Duration::from_secs(60),
            visit_timeout: Duration::from_secs(15),
            read_all_timeout: Duration::from_secs(30),
        }
    }
}

impl PortalConfig {
    /// Defaults overridden by `NOTIFY_PORTAL_URL` and `NOTIFY_PORTAL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, HostError> {
        let mut config = Self::default();
        if let Some(url) = env_string("NOTIFY_PORTAL_URL") {
            config.base_url = url;
        }
        if let Some(timeout) = env_secs("NOTIFY_PORTAL_TIMEOUT_SECS")? {
            config.request_timeout = timeout;
        }
        Ok(config)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.url(&self.login_path)
    }

    pub fn notifications_url(&self) -> String {
        self.url(&self.notifications_path)
    }

    pub fn read_all_url(&self) -> String {
        self.url(&self.read_all_path)
    }

    pub fn visit_url_template(&self) -> String {
        self.url(&self.visit_path)
    }

    pub fn visit_url(&self, visit_id: &str) -> String {
        self.visit_url_template()
            .replace(VISIT_ID_PLACEHOLDER, visit_id)
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Upper bound for any single step of one account's pass.
    pub step_timeout: Duration,
    /// Upper bound for a whole batch; unfinished accounts are abandoned.
    pub batch_timeout: Duration,
    /// Accounts processed at once. `1` keeps the sequential behaviour.
    pub max_concurrency: usize,
    /// Visit detail pages opened per pass to mark items seen.
    pub ack_limit: usize,
    /// Page holding the notification list.
    pub notifications_url: String,
    /// Result link used when neither the item nor the page names a visit.
    pub fallback_result_url: String,
    pub extractor: ExtractorConfig,
    pub templates: MessageTemplates,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::for_portal(&PortalConfig::default())
    }
}

impl ReconcilerConfig {
    pub fn for_portal(portal: &PortalConfig) -> Self {
        let extractor = ExtractorConfig {
            visit_url_template: Some(portal.visit_url_template()),
            ..ExtractorConfig::default()
        };
        Self {
            step_timeout: Duration::from_secs(120),
            batch_timeout: Duration::from_secs(600),
            max_concurrency: 1,
            ack_limit: 5,
            notifications_url: portal.notifications_url(),
            fallback_result_url: portal.notifications_url(),
            extractor,
            templates: MessageTemplates::default(),
        }
    }

    /// Reads `NOTIFY_MAX_CONCURRENCY`, `NOTIFY_STEP_TIMEOUT_SECS` and
    /// `NOTIFY_BATCH_TIMEOUT_SECS` on top of [`ReconcilerConfig::for_portal`].
    pub fn from_env(portal: &PortalConfig) -> Result<Self, HostError> {
        let mut config = Self::for_portal(portal);
        if let Some(raw) = env_string("NOTIFY_MAX_CONCURRENCY") {
            config.max_concurrency = raw
                .trim()
                .parse()
                .map_err(|e| HostError::Config(format!("NOTIFY_MAX_CONCURRENCY={raw}: {e}")))?;
        }
        if let Some(timeout) = env_secs("NOTIFY_STEP_TIMEOUT_SECS")? {
            config.step_timeout = timeout;
        }
        if let Some(timeout) = env_secs("NOTIFY_BATCH_TIMEOUT_SECS")? {
            config.batch_timeout = timeout;
        }
        Ok(config)
    }
}

/// Push relay endpoint and the fixed fields of every outgoing message.
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    pub token_prefix: String,
    /// Applied when a message names no channel.
    pub channel_id: String,
    /// Applied when a message names no priority.
    pub priority: String,
    pub timeout: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PUSH_URL.into(),
            token_prefix: "ExponentPushToken".into(),
            channel_id: "results".into(),
            priority: "high".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PushConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env_string("NOTIFY_PUSH_URL") {
            config.endpoint = url;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind: SocketAddr,
}

impl HttpServerConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }

    /// Listens on all interfaces at `PORT`, or `default_port` when unset.
    pub fn from_env(default_port: u16) -> Result<Self, HostError> {
        let port = match env_string("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| HostError::Config(format!("PORT={raw}: {e}")))?,
            None => default_port,
        };
        Ok(Self {
            bind: SocketAddr::from(([0, 0, 0, 0], port)),
        })
    }
}
