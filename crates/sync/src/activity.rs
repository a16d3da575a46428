//! Sync activity log: the reconciliation backlog for failed pushes.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ActivityLogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    CreateOutbound,
    UpdateQuantity,
    Pull,
}

impl SyncAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncAction::CreateOutbound => "create_outbound",
            SyncAction::UpdateQuantity => "update_quantity",
            SyncAction::Pull => "pull",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Error,
}

/// One sync operation, however many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub action: SyncAction,
    pub status: ActivityStatus,
    /// Local reference, e.g. `sale:<id>`.
    pub reference: String,
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
    pub attempts: u32,
    pub details: String,
}

impl ActivityEntry {
    pub fn new(action: SyncAction, status: ActivityStatus, reference: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            at: Utc::now(),
            action,
            status,
            reference: reference.into(),
            idempotency_key: None,
            attempts: 0,
            details: String::new(),
        }
    }

    pub fn with_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

pub trait ActivityLog: Send + Sync {
    fn record(&self, entry: ActivityEntry) -> Result<(), ActivityLogError>;

    /// All entries, oldest first.
    fn list(&self) -> Result<Vec<ActivityEntry>, ActivityLogError>;

    fn errors(&self) -> Result<Vec<ActivityEntry>, ActivityLogError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| e.status == ActivityStatus::Error)
            .collect())
    }
}

impl<A> ActivityLog for Arc<A>
where
    A: ActivityLog + ?Sized,
{
    fn record(&self, entry: ActivityEntry) -> Result<(), ActivityLogError> {
        (**self).record(entry)
    }

    fn list(&self) -> Result<Vec<ActivityEntry>, ActivityLogError> {
        (**self).list()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = ActivityEntry>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }
}

fn poisoned() -> ActivityLogError {
    ActivityLogError::Unavailable("lock poisoned".to_string())
}

impl ActivityLog for InMemoryActivityLog {
    fn record(&self, entry: ActivityEntry) -> Result<(), ActivityLogError> {
        self.entries.write().map_err(|_| poisoned())?.push(entry);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ActivityEntry>, ActivityLogError> {
        Ok(self.entries.read().map_err(|_| poisoned())?.clone())
    }
}
