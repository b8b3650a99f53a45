use serde::{Deserialize, Serialize};

/// Login material for one portal identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A configured portal identity the reconciler logs in as.
///
/// The wire shape is the one batch callers already send:
/// `{ id, name, username, password, pushToken? }`. A list of tokens may be
/// supplied as `pushTokens`; both forms are merged by [`Account::device_tokens`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "id")]
    pub account_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(flatten)]
    pub credentials: PortalCredentials,
    #[serde(
        rename = "pushToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub push_token: Option<String>,
    #[serde(rename = "pushTokens", default, skip_serializing_if = "Vec::is_empty")]
    pub push_tokens: Vec<String>,
}

impl Account {
    pub fn new(
        account_id: impl Into<String>,
        display_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            credentials: PortalCredentials {
                username: username.into(),
                password: password.into(),
            },
            push_token: None,
            push_tokens: Vec::new(),
        }
    }

    pub fn with_push_token(mut self, token: impl Into<String>) -> Self {
        self.push_tokens.push(token.into());
        self
    }

    /// Distinct, non-empty device tokens in declaration order.
    pub fn device_tokens(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for token in self.push_token.iter().chain(self.push_tokens.iter()) {
            let token = token.trim();
            if !token.is_empty() && !out.contains(&token) {
                out.push(token);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_batch_user_shape() {
        let account: Account = serde_json::from_value(serde_json::json!({
            "id": "user1",
            "name": "Ahmed",
            "username": "2299",
            "password": "secret",
            "pushToken": "ExponentPushToken[abc]"
        }))
        .expect("decode account");
        assert_eq!(account.account_id, "user1");
        assert_eq!(account.credentials.username, "2299");
        assert_eq!(account.device_tokens(), vec!["ExponentPushToken[abc]"]);
    }

    #[test]
    fn device_tokens_merge_and_dedupe() {
        let mut account = Account::new("a", "A", "u", "p")
            .with_push_token("ExponentPushToken[1]")
            .with_push_token(" ");
        account.push_token = Some("ExponentPushToken[1]".into());
        account.push_tokens.push("ExponentPushToken[2]".into());
        assert_eq!(
            account.device_tokens(),
            vec!["ExponentPushToken[1]", "ExponentPushToken[2]"]
        );
    }

    #[test]
    fn debug_redacts_password() {
        let account = Account::new("a", "A", "u", "hunter2");
        let rendered = format!("{account:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
