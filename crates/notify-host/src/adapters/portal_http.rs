use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify_core::{DocumentModel, PortalCredentials};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::html::read_document;
use super::portal::{AckTarget, Portal, PortalError, PortalSession};
use crate::config::PortalConfig;
use crate::error::HostError;

static ANTIFORGERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<input\b[^>]*name\s*=\s*["']__RequestVerificationToken["'][^>]*>"#)
        .expect("valid regex")
});
static VALUE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bvalue\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

/// Portal reached over plain HTTP with a cookie jar per session.
pub struct HttpPortal {
    config: Arc<PortalConfig>,
}

impl HttpPortal {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn client(&self) -> Result<Client, HostError> {
        Client::builder()
            .cookie_store(true)
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|e| HostError::Config(format!("build portal client: {e}")))
    }
}

fn map_err(url: &str, err: reqwest::Error) -> PortalError {
    if err.is_timeout() {
        PortalError::Timeout { url: url.to_string() }
    } else {
        PortalError::Network(err.to_string())
    }
}

fn antiforgery_token(html: &str) -> Option<String> {
    let input = ANTIFORGERY.find(html)?;
    VALUE_ATTR
        .captures(input.as_str())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[async_trait]
impl Portal for HttpPortal {
    async fn authenticate(
        &self,
        credentials: &PortalCredentials,
    ) -> Result<Box<dyn PortalSession>, PortalError> {
        let client = self
            .client()
            .map_err(|e| PortalError::Network(e.to_string()))?;
        let session = HttpPortalSession {
            client,
            config: self.config.clone(),
        };
        let login_url = self.config.login_url();

        let login_page = session.get(&login_url, self.config.request_timeout).await?;
        let mut form = vec![
            (self.config.username_field.clone(), credentials.username.clone()),
            (self.config.password_field.clone(), credentials.password.clone()),
        ];
        if let Some(token) = antiforgery_token(&login_page.1) {
            form.push(("__RequestVerificationToken".into(), token));
        }

        let resp = session
            .client
            .post(&login_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| map_err(&login_url, e))?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(PortalError::LoginRejected(format!("status {status}")));
        }
        let landed = resp.url().path().to_ascii_lowercase();
        let login_path = self.config.login_path.to_ascii_lowercase();
        if landed == login_path {
            return Err(PortalError::LoginRejected(
                "portal returned to the login page".into(),
            ));
        }
        debug!(landed = %resp.url(), "portal login accepted");
        Ok(Box::new(session))
    }
}

struct HttpPortalSession {
    client: Client,
    config: Arc<PortalConfig>,
}

impl HttpPortalSession {
    /// Final URL and body of a GET.
    async fn get(&self, url: &str, timeout: Duration) -> Result<(String, String), PortalError> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_err(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| map_err(url, e))?;
        Ok((final_url, body))
    }
}

#[async_trait]
impl PortalSession for HttpPortalSession {
    async fn fetch_page(&self, url: &str) -> Result<DocumentModel, PortalError> {
        let (final_url, body) = self.get(url, self.config.request_timeout).await?;
        Ok(read_document(&final_url, &body))
    }

    async fn acknowledge(&self, target: &AckTarget) -> Result<(), PortalError> {
        let (url, timeout) = match target {
            AckTarget::ReadAll => (self.config.read_all_url(), self.config.read_all_timeout),
            AckTarget::Visit(id) => (self.config.visit_url(id), self.config.visit_timeout),
        };
        self.get(&url, timeout).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_antiforgery_token() {
        let html = r#"<form><input type="hidden" name="__RequestVerificationToken" value="abc123" /></form>"#;
        assert_eq!(antiforgery_token(html).as_deref(), Some("abc123"));
        assert!(antiforgery_token("<form></form>").is_none());
    }
}
