//! Shaping new items into user-facing messages.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::account::Account;
use crate::extract::VisitRef;
use crate::item::ObservedItem;

pub const NAME_PLACEHOLDER: &str = "{name}";
pub const INVALID_TOKEN_REASON: &str = "invalid token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedBody {
    #[serde(rename = "primaryLocale")]
    pub primary: String,
    #[serde(rename = "fallbackLocale")]
    pub fallback: String,
}

/// Message wording; `{name}` is replaced by the account's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplates {
    pub title: String,
    pub body: LocalizedBody,
    pub link_text: LocalizedBody,
    pub push_body: String,
    pub push_type: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            title: "🔬 نتائجك جاهزة!".into(),
            body: LocalizedBody {
                primary: "{name} تم الانتهاء من تحاليلكم والنتيجة".into(),
                fallback: "{name} Your test results are ready".into(),
            },
            link_text: LocalizedBody {
                primary: "هنا".into(),
                fallback: "here".into(),
            },
            push_body: "{name} تم الانتهاء من تحاليلكم والنتيجة جاهزة".into(),
            push_type: "results_ready".into(),
        }
    }
}

impl MessageTemplates {
    fn render(template: &str, name: &str) -> String {
        template.replace(NAME_PLACEHOLDER, name)
    }

    pub fn body_for(&self, name: &str) -> LocalizedBody {
        LocalizedBody {
            primary: Self::render(&self.body.primary, name),
            fallback: Self::render(&self.body.fallback, name),
        }
    }

    /// One push per device summarising every candidate of a pass.
    pub fn push_for(
        &self,
        account: &Account,
        token: &str,
        candidates: &[DeliveryCandidate],
    ) -> PushMessage {
        let url = candidates.first().map(|c| c.result_url.clone());
        let mut push = PushMessage::new(
            token,
            self.title.clone(),
            Self::render(&self.push_body, &account.display_name),
            json!({
                "type": self.push_type,
                "url": url,
                "userId": account.account_id,
                "count": candidates.len(),
            }),
        );
        push.sound = Some("default".into());
        push.priority = Some("high".into());
        push
    }
}

/// A new item ready to be handed to the push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCandidate {
    #[serde(flatten)]
    pub item: ObservedItem,
    pub result_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_id: Option<String>,
    pub localized_body: LocalizedBody,
    pub link_text: LocalizedBody,
}

impl DeliveryCandidate {
    /// Promotes `item`. Items without their own detail link point at the
    /// latest visit of the page, then at `fallback_url`.
    pub fn promote(
        item: ObservedItem,
        latest_visit: Option<&VisitRef>,
        fallback_url: &str,
        account: &Account,
        templates: &MessageTemplates,
    ) -> Self {
        let result_url = item
            .detail_url
            .clone()
            .or_else(|| latest_visit.map(|v| v.url.clone()))
            .unwrap_or_else(|| fallback_url.to_string());
        let visit_id = item
            .related_visit_id
            .clone()
            .or_else(|| latest_visit.map(|v| v.visit_id.clone()));
        Self {
            item,
            result_url,
            visit_id,
            localized_body: templates.body_for(&account.display_name),
            link_text: templates.link_text.clone(),
        }
    }
}

/// Vendor-neutral push payload; serializes in the relay's JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl PushMessage {
    pub fn new(
        to: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            to: to.into(),
            title: title.into(),
            body: body.into(),
            data,
            sound: None,
            priority: None,
            channel_id: None,
        }
    }
}

/// Outcome of one delivery attempt to one device token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub token: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

impl DeliveryResult {
    pub fn sent(token: impl Into<String>, ticket_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            reason: None,
            ticket_id,
        }
    }

    pub fn failed(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            reason: Some(reason.into()),
            ticket_id: None,
        }
    }

    pub fn invalid_token(token: impl Into<String>) -> Self {
        Self::failed(token, INVALID_TOKEN_REASON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemCategory;
    use chrono::Utc;

    fn account() -> Account {
        Account::new("user1", "Ahmed", "2299", "pw")
    }

    #[test]
    fn candidate_prefers_own_detail_link() {
        let item = ObservedItem::new(ItemCategory::Dropdown, 0, "Result ready", Utc::now())
            .with_visit("5", Some("https://p/v?VisitId=5".into()));
        let latest = VisitRef {
            visit_id: "9".into(),
            url: "https://p/v?VisitId=9".into(),
        };
        let c = DeliveryCandidate::promote(
            item,
            Some(&latest),
            "https://p/",
            &account(),
            &MessageTemplates::default(),
        );
        assert_eq!(c.result_url, "https://p/v?VisitId=5");
        assert_eq!(c.visit_id.as_deref(), Some("5"));
    }

    #[test]
    fn candidate_falls_back_to_latest_visit_then_default() {
        let templates = MessageTemplates::default();
        let item = ObservedItem::new(ItemCategory::Keyword, 0, "Result Ready", Utc::now());
        let latest = VisitRef {
            visit_id: "9".into(),
            url: "https://p/v?VisitId=9".into(),
        };
        let c = DeliveryCandidate::promote(item.clone(), Some(&latest), "https://p/", &account(), &templates);
        assert_eq!(c.result_url, "https://p/v?VisitId=9");
        assert_eq!(c.visit_id.as_deref(), Some("9"));

        let c = DeliveryCandidate::promote(item, None, "https://p/", &account(), &templates);
        assert_eq!(c.result_url, "https://p/");
        assert!(c.visit_id.is_none());
        assert_eq!(c.localized_body.fallback, "Ahmed Your test results are ready");
    }

    #[test]
    fn push_carries_first_result_url() {
        let templates = MessageTemplates::default();
        let item = ObservedItem::new(ItemCategory::Keyword, 0, "Result Ready", Utc::now());
        let candidate = DeliveryCandidate::promote(item, None, "https://p/r", &account(), &templates);
        let push = templates.push_for(&account(), "ExponentPushToken[x]", &[candidate]);
        assert_eq!(push.to, "ExponentPushToken[x]");
        assert!(push.body.starts_with("Ahmed "));
        assert_eq!(push.data["url"], "https://p/r");
        assert_eq!(push.data["userId"], "user1");
        assert_eq!(push.data["count"], 1);
        assert_eq!(push.sound.as_deref(), Some("default"));
    }

    #[test]
    fn push_message_uses_relay_field_names() {
        let mut msg = PushMessage::new("t", "title", "body", json!({}));
        msg.channel_id = Some("results".into());
        let value = serde_json::to_value(&msg).expect("encode");
        assert_eq!(value["channelId"], "results");
        assert!(value.get("sound").is_none());
    }
}
