use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gating::DeliveryDecision;
use crate::query::{DEFAULT_LIMIT, ListPage, ListQuery, SyncPage, parse_instant};
use crate::records::{
    BroadcastRequest, BulkSendRequest, Device, DeviceRegistration, Notification, Preferences,
    PreferencesPatch, SendRequest,
};
use crate::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Db {
    notifications: Vec<Notification>,
    devices: Vec<Device>,
    preferences: HashMap<String, Preferences>,
}

/// Shared handle to the in-memory notification store.
#[derive(Clone, Default)]
pub struct NotificationStore {
    db: Arc<RwLock<Db>>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let db = self.read();
        f.debug_struct("NotificationStore")
            .field("notifications", &db.notifications.len())
            .field("devices", &db.devices.len())
            .field("preferences", &db.preferences.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub broadcast_id: String,
    pub notifications: Vec<Notification>,
}

fn new_id(prefix: char) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

fn required<'a>(value: Option<&'a str>, message: &str) -> StoreResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StoreError::InvalidData(message.to_string()))
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Db> {
        self.db.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Db> {
        self.db.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn send(&self, req: SendRequest) -> StoreResult<Notification> {
        let missing = "Missing required fields";
        let patient_id = required(req.patient_id.as_deref(), missing)?;
        if req.content.title.as_ref().is_none_or(|t| t.is_blank())
            || req.content.message.as_ref().is_none_or(|m| m.is_blank())
        {
            return Err(StoreError::InvalidData(missing.into()));
        }
        let notification =
            Notification::from_content(new_id('N'), patient_id, &req.content, Utc::now());
        self.write().notifications.push(notification.clone());
        Ok(notification)
    }

    pub fn send_bulk(&self, req: BulkSendRequest) -> StoreResult<Vec<Notification>> {
        let Some(patient_ids) = req.patient_ids else {
            return Err(StoreError::InvalidData(
                "patientIds must be an array".into(),
            ));
        };
        let now = Utc::now();
        let created: Vec<Notification> = patient_ids
            .iter()
            .map(|pid| Notification::from_content(new_id('N'), pid, &req.content, now))
            .collect();
        self.write().notifications.extend(created.iter().cloned());
        Ok(created)
    }

    /// Every patient owning a registered device, minus the exclusions.
    pub fn broadcast(&self, req: BroadcastRequest) -> StoreResult<Broadcast> {
        let broadcast_id = new_id('B');
        let now = Utc::now();
        let mut db = self.write();
        let mut recipients: Vec<String> = Vec::new();
        for device in &db.devices {
            if req.exclude_patient_ids.contains(&device.patient_id)
                || recipients.contains(&device.patient_id)
            {
                continue;
            }
            recipients.push(device.patient_id.clone());
        }
        let created: Vec<Notification> = recipients
            .iter()
            .map(|pid| {
                Notification::from_content(format!("{broadcast_id}_{pid}"), pid, &req.content, now)
            })
            .collect();
        db.notifications.extend(created.iter().cloned());
        Ok(Broadcast {
            broadcast_id,
            notifications: created,
        })
    }

    pub fn list(&self, patient_id: &str, query: &ListQuery) -> StoreResult<ListPage> {
        let since = query.since()?;
        let types = query.type_list();
        let db = self.read();
        let mut matched: Vec<&Notification> = db
            .notifications
            .iter()
            .rev()
            .filter(|n| n.patient_id == patient_id)
            .filter(|n| !query.unread_only() || !n.read)
            .filter(|n| types.as_ref().is_none_or(|t| t.contains(&n.kind.as_str())))
            .filter(|n| since.is_none_or(|s| n.created_at > s))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len();
        let unread_count = matched.iter().filter(|n| !n.read).count();
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
        let notifications = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(ListPage {
            total,
            unread_count,
            notifications,
        })
    }

    pub fn get(&self, notification_id: &str) -> Option<Notification> {
        self.read()
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
    }

    pub fn mark_read(&self, notification_id: &str, patient_id: &str) -> StoreResult<()> {
        let mut db = self.write();
        let notification = db
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.patient_id == patient_id)
            .ok_or_else(|| StoreError::NotFound("Notification not found".into()))?;
        notification.read = true;
        notification.read_at = Some(Utc::now());
        Ok(())
    }

    /// Returns how many notifications flipped to read.
    pub fn mark_all_read(&self, patient_id: &str) -> usize {
        let now = Utc::now();
        let mut db = self.write();
        let mut changed = 0;
        for n in db
            .notifications
            .iter_mut()
            .filter(|n| n.patient_id == patient_id && !n.read)
        {
            n.read = true;
            n.read_at = Some(now);
            changed += 1;
        }
        changed
    }

    pub fn delete(&self, notification_id: &str, patient_id: &str) -> StoreResult<()> {
        let mut db = self.write();
        let idx = db
            .notifications
            .iter()
            .position(|n| n.id == notification_id && n.patient_id == patient_id)
            .ok_or_else(|| StoreError::NotFound("Notification not found".into()))?;
        db.notifications.remove(idx);
        Ok(())
    }

    /// Returns how many notifications were removed.
    pub fn clear_all(&self, patient_id: &str) -> usize {
        let mut db = self.write();
        let before = db.notifications.len();
        db.notifications.retain(|n| n.patient_id != patient_id);
        before - db.notifications.len()
    }

    /// Registers a device token; a token re-registered by anyone replaces its old entry.
    pub fn register_device(&self, reg: DeviceRegistration) -> StoreResult<Device> {
        let missing = "Missing patientId or token";
        let patient_id = required(reg.patient_id.as_deref(), missing)?;
        let token = required(reg.token.as_deref(), missing)?;
        let device = Device {
            patient_id: patient_id.to_string(),
            token: token.to_string(),
            platform: reg.platform.clone().unwrap_or_else(|| "unknown".into()),
            app_version: reg.app_version.clone().unwrap_or_else(|| "1.0.0".into()),
            registered_at: Utc::now(),
        };
        let mut db = self.write();
        db.devices.retain(|d| d.token != device.token);
        db.devices.push(device.clone());
        Ok(device)
    }

    /// Returns whether a registration was removed.
    pub fn unregister_device(&self, patient_id: &str, token: &str) -> bool {
        let mut db = self.write();
        let before = db.devices.len();
        db.devices
            .retain(|d| !(d.patient_id == patient_id && d.token == token));
        before != db.devices.len()
    }

    pub fn devices_for(&self, patient_id: &str) -> Vec<Device> {
        self.read()
            .devices
            .iter()
            .filter(|d| d.patient_id == patient_id)
            .cloned()
            .collect()
    }

    /// Stored preferences, or the defaults when none were saved.
    pub fn preferences(&self, patient_id: &str) -> Preferences {
        self.read()
            .preferences
            .get(patient_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn update_preferences(
        &self,
        patient_id: Option<&str>,
        patch: Option<PreferencesPatch>,
    ) -> StoreResult<Preferences> {
        let missing = "Missing patientId or preferences";
        let patient_id = required(patient_id, missing)?;
        let patch = patch.ok_or_else(|| StoreError::InvalidData(missing.into()))?;
        let mut db = self.write();
        let prefs = db.preferences.entry(patient_id.to_string()).or_default();
        patch.apply(prefs);
        prefs.updated_at = Some(Utc::now());
        Ok(prefs.clone())
    }

    pub fn sync(&self, patient_id: &str, last_sync_time: Option<&str>) -> StoreResult<SyncPage> {
        let since: Option<DateTime<Utc>> = last_sync_time
            .filter(|s| !s.is_empty())
            .map(parse_instant)
            .transpose()?;
        let db = self.read();
        let mut notifications: Vec<Notification> = db
            .notifications
            .iter()
            .rev()
            .filter(|n| n.patient_id == patient_id)
            .filter(|n| since.is_none_or(|s| n.created_at > s))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(SyncPage {
            notifications,
            deleted_ids: Vec::new(),
            sync_time: Utc::now(),
        })
    }

    /// Decides push delivery for a stored notification against devices and preferences.
    pub fn delivery_plan(&self, notification: &Notification) -> DeliveryDecision {
        let db = self.read();
        let devices: Vec<&Device> = db
            .devices
            .iter()
            .filter(|d| d.patient_id == notification.patient_id)
            .collect();
        DeliveryDecision::decide(
            notification,
            &devices,
            db.preferences.get(&notification.patient_id),
        )
    }
}
