// ABOUTME: Message store contract the session calls to record delivery outcomes
// ABOUTME: Includes an in-memory implementation indexed by internal and provider message id

use crate::receipt::DeliveryStatus;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

/// Lifecycle status of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    Pending,
    Submitted,
    Failed,
    Delivered,
    Undelivered,
    Expired,
    Rejected,
    Unknown,
}

impl From<DeliveryStatus> for MessageStatus {
    fn from(status: DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Delivered => MessageStatus::Delivered,
            DeliveryStatus::Undelivered => MessageStatus::Undelivered,
            DeliveryStatus::Expired => MessageStatus::Expired,
            DeliveryStatus::Rejected => MessageStatus::Rejected,
            DeliveryStatus::Unknown => MessageStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub provider: String,
    pub to: String,
    pub from: Option<String>,
    pub text: String,
    pub status: MessageStatus,
    pub provider_message_id: Option<String>,
    pub provider_status: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    /// A freshly accepted message that has not reached a provider yet.
    pub fn pending(
        id: impl Into<String>,
        provider: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            provider: provider.into(),
            to: to.into(),
            from: None,
            text: text.into(),
            status: MessageStatus::Pending,
            provider_message_id: None,
            provider_status: None,
            error: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
        }
    }
}

/// Partial update applied to a stored record. `None` fields are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: MessageStatus,
    pub provider_message_id: Option<String>,
    pub provider_status: Option<String>,
    pub error: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn new(status: MessageStatus) -> Self {
        Self {
            status,
            provider_message_id: None,
            provider_status: None,
            error: None,
            delivered_at: None,
        }
    }

    pub fn with_provider_message_id(mut self, id: impl Into<String>) -> Self {
        self.provider_message_id = Some(id.into());
        self
    }

    pub fn with_provider_status(mut self, status: impl Into<String>) -> Self {
        self.provider_status = Some(status.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_delivered_at(mut self, at: DateTime<Utc>) -> Self {
        self.delivered_at = Some(at);
        self
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message {0} already exists")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence for message lifecycle.
///
/// Updates return `Ok(false)` when no record matches. Delivery receipts can
/// arrive for messages this process never stored, so that is not an error.
pub trait MessageStore: Send + Sync + 'static {
    fn insert(&self, record: MessageRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_by_internal_id(
        &self,
        id: &str,
        update: StatusUpdate,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn update_by_provider_message_id(
        &self,
        provider_message_id: &str,
        update: StatusUpdate,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<String, MessageRecord>,
    // provider message id -> internal id
    by_provider_id: HashMap<String, String>,
}

impl Records {
    fn apply(&mut self, id: &str, update: StatusUpdate) -> bool {
        let Some(record) = self.by_id.get_mut(id) else {
            return false;
        };

        if let Some(provider_id) = &update.provider_message_id {
            if let Some(old) = record.provider_message_id.replace(provider_id.clone()) {
                self.by_provider_id.remove(&old);
            }
            self.by_provider_id.insert(provider_id.clone(), id.to_string());
        }
        record.status = update.status;
        if update.provider_status.is_some() {
            record.provider_status = update.provider_status;
        }
        if update.error.is_some() {
            record.error = update.error;
        }
        if update.delivered_at.is_some() {
            record.delivered_at = update.delivered_at;
        }
        record.updated_at = Utc::now();
        true
    }
}

/// Process-local store. Data is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Records>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<MessageRecord> {
        self.lock().by_id.get(id).cloned()
    }

    pub fn find_by_provider_message_id(&self, provider_message_id: &str) -> Option<MessageRecord> {
        let records = self.lock();
        records
            .by_provider_id
            .get(provider_message_id)
            .and_then(|id| records.by_id.get(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MessageStore for InMemoryStore {
    async fn insert(&self, record: MessageRecord) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.by_id.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        if let Some(provider_id) = &record.provider_message_id {
            records
                .by_provider_id
                .insert(provider_id.clone(), record.id.clone());
        }
        records.by_id.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_by_internal_id(&self, id: &str, update: StatusUpdate) -> Result<bool, StoreError> {
        Ok(self.lock().apply(id, update))
    }

    async fn update_by_provider_message_id(
        &self,
        provider_message_id: &str,
        update: StatusUpdate,
    ) -> Result<bool, StoreError> {
        let mut records = self.lock();
        let Some(id) = records.by_provider_id.get(provider_message_id).cloned() else {
            return Ok(false);
        };
        Ok(records.apply(&id, update))
    }
}
