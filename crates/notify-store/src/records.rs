//! Stored records and the request shapes that create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text in the two supported locales. A bare JSON string is read as English.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocalizedTextRepr")]
pub struct LocalizedText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocalizedTextRepr {
    Plain(String),
    Localized {
        #[serde(default)]
        ar: Option<String>,
        #[serde(default)]
        en: Option<String>,
    },
}

impl From<LocalizedTextRepr> for LocalizedText {
    fn from(repr: LocalizedTextRepr) -> Self {
        match repr {
            LocalizedTextRepr::Plain(en) => LocalizedText { ar: None, en: Some(en) },
            LocalizedTextRepr::Localized { ar, en } => LocalizedText { ar, en },
        }
    }
}

impl LocalizedText {
    pub fn new(ar: Option<&str>, en: Option<&str>) -> Self {
        Self {
            ar: ar.map(str::to_string),
            en: en.map(str::to_string),
        }
    }

    /// Arabic when present, English otherwise.
    pub fn preferred(&self) -> &str {
        self.ar
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.en.as_deref())
            .unwrap_or_default()
    }

    pub fn is_blank(&self) -> bool {
        self.preferred().trim().is_empty()
    }
}

fn default_kind() -> String {
    "general".into()
}

fn default_priority() -> String {
    "normal".into()
}

/// Fields shared by single, bulk and broadcast writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub title: Option<LocalizedText>,
    #[serde(default)]
    pub message: Option<LocalizedText>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<String>,
}

impl Default for NotificationContent {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            priority: default_priority(),
            title: None,
            message: None,
            data: Map::new(),
            action_url: None,
            image_url: None,
            expires_at: None,
            scheduled_for: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(flatten)]
    pub content: NotificationContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendRequest {
    #[serde(default)]
    pub patient_ids: Option<Vec<String>>,
    #[serde(flatten)]
    pub content: NotificationContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    /// Accepted for compatibility; recipients are every patient with a device.
    #[serde(default)]
    pub target_groups: Option<Value>,
    #[serde(default)]
    pub exclude_patient_ids: Vec<String>,
    #[serde(flatten)]
    pub content: NotificationContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub patient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub title: LocalizedText,
    pub message: LocalizedText,
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub(crate) fn from_content(
        id: String,
        patient_id: &str,
        content: &NotificationContent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id: patient_id.to_string(),
            kind: content.kind.clone(),
            priority: content.priority.clone(),
            title: content.title.clone().unwrap_or_default(),
            message: content.message.clone().unwrap_or_default(),
            data: content.data.clone(),
            action_url: content.action_url.clone(),
            image_url: content.image_url.clone(),
            expires_at: content.expires_at.clone(),
            scheduled_for: content.scheduled_for.clone(),
            read: false,
            read_at: None,
            created_at,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_for.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub patient_id: String,
    pub token: String,
    pub platform: String,
    pub app_version: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub enabled: bool,
    pub result_ready: bool,
    pub appointments: bool,
    pub offers: bool,
    pub promotions: bool,
    pub system: bool,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: String,
    pub quiet_hours_end: String,
    pub sound: bool,
    pub vibration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enabled: true,
            result_ready: true,
            appointments: true,
            offers: true,
            promotions: true,
            system: true,
            quiet_hours_enabled: false,
            quiet_hours_start: "22:00".into(),
            quiet_hours_end: "08:00".into(),
            sound: true,
            vibration: true,
            updated_at: None,
        }
    }
}

impl Preferences {
    /// Flag gating `kind`, if that kind is gated at all.
    pub fn allows_kind(&self, kind: &str) -> Option<bool> {
        match kind {
            "result_ready" => Some(self.result_ready),
            "appointment" => Some(self.appointments),
            "offer" => Some(self.offers),
            "promotion" => Some(self.promotions),
            _ => None,
        }
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub enabled: Option<bool>,
    pub result_ready: Option<bool>,
    pub appointments: Option<bool>,
    pub offers: Option<bool>,
    pub promotions: Option<bool>,
    pub system: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub sound: Option<bool>,
    pub vibration: Option<bool>,
}

impl PreferencesPatch {
    pub fn apply(self, prefs: &mut Preferences) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { prefs.$field = v; })*
            };
        }
        merge!(
            enabled,
            result_ready,
            appointments,
            offers,
            promotions,
            system,
            quiet_hours_enabled,
            quiet_hours_start,
            quiet_hours_end,
            sound,
            vibration
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_text_accepts_plain_and_object() {
        let plain: LocalizedText = serde_json::from_str("\"Hello\"").expect("plain");
        assert_eq!(plain.preferred(), "Hello");
        let both: LocalizedText =
            serde_json::from_str(r#"{"ar":"مرحبا","en":"Hello"}"#).expect("object");
        assert_eq!(both.preferred(), "مرحبا");
        let blank: LocalizedText = serde_json::from_str("{}").expect("empty");
        assert!(blank.is_blank());
    }

    #[test]
    fn content_defaults_kind_and_priority() {
        let req: SendRequest =
            serde_json::from_str(r#"{"patientId":"p1","title":"t","message":"m"}"#).expect("decode");
        assert_eq!(req.content.kind, "general");
        assert_eq!(req.content.priority, "normal");
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut prefs = Preferences::default();
        let patch: PreferencesPatch =
            serde_json::from_str(r#"{"offers":false,"quietHoursStart":"23:00"}"#).expect("decode");
        patch.apply(&mut prefs);
        assert!(!prefs.offers);
        assert!(prefs.enabled);
        assert_eq!(prefs.quiet_hours_start, "23:00");
    }
}
