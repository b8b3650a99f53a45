use notify_core::PushMessage;
use serde_json::{Value, json};

use crate::records::{Device, Notification, Preferences};

pub const PUSH_CHANNEL_ID: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoDevices,
    Disabled,
    KindDisabled,
    Scheduled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::NoDevices => "no registered devices",
            SkipReason::Disabled => "notifications disabled",
            SkipReason::KindDisabled => "notification type disabled",
            SkipReason::Scheduled => "scheduled for later",
        };
        f.write_str(s)
    }
}

/// Whether, and to which devices, a stored notification is pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryDecision {
    Skip(SkipReason),
    Deliver(Vec<PushMessage>),
}

impl DeliveryDecision {
    pub(crate) fn decide(
        notification: &Notification,
        devices: &[&Device],
        prefs: Option<&Preferences>,
    ) -> Self {
        if notification.is_scheduled() {
            return DeliveryDecision::Skip(SkipReason::Scheduled);
        }
        if devices.is_empty() {
            return DeliveryDecision::Skip(SkipReason::NoDevices);
        }
        if let Some(prefs) = prefs {
            if !prefs.enabled {
                return DeliveryDecision::Skip(SkipReason::Disabled);
            }
            if prefs.allows_kind(&notification.kind) == Some(false) {
                return DeliveryDecision::Skip(SkipReason::KindDisabled);
            }
        }
        let sound = prefs.is_none_or(|p| p.sound);
        let messages = devices
            .iter()
            .map(|device| push_for_device(notification, device, sound))
            .collect();
        DeliveryDecision::Deliver(messages)
    }
}

fn push_for_device(notification: &Notification, device: &Device, sound: bool) -> PushMessage {
    let mut data = json!({
        "notificationId": notification.id,
        "type": notification.kind,
        "actionUrl": notification.action_url.clone().unwrap_or_default(),
    });
    if let Value::Object(map) = &mut data {
        for (k, v) in &notification.data {
            map.insert(k.clone(), v.clone());
        }
    }
    let mut msg = PushMessage::new(
        device.token.clone(),
        notification.title.preferred(),
        notification.message.preferred(),
        data,
    );
    msg.sound = sound.then(|| "default".to_string());
    msg.priority = Some(if notification.priority == "urgent" { "high" } else { "normal" }.into());
    msg.channel_id = Some(PUSH_CHANNEL_ID.into());
    msg
}
