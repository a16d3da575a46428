//! JSON persistence of engine state between runs.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use lotkeeper_events::EventEnvelope;
use lotkeeper_inventory::{InMemoryLotStore, InventoryLot, LotStore, LotStoreError};
use lotkeeper_ledger::{EventLogError, InMemoryLedgerEventLog, LedgerEvent, LedgerEventLog};
use lotkeeper_sync::{ActivityEntry, ActivityLog, ActivityLogError, InMemoryActivityLog};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Lots(#[from] LotStoreError),

    #[error(transparent)]
    Ledger(#[from] EventLogError),

    #[error(transparent)]
    Activity(#[from] ActivityLogError),
}

/// Every persisted collection. Any of them may be empty or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub lots: Vec<InventoryLot>,
    #[serde(default)]
    pub ledger: Vec<EventEnvelope<LedgerEvent>>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

impl Snapshot {
    /// Read a snapshot; a missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(Self::default());
        }
        let bytes = fs::read(path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        info!(
            path = %path.display(),
            lots = snapshot.lots.len(),
            events = snapshot.ledger.len(),
            activity = snapshot.activity.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Write via a sibling temp file and rename, so a crash never leaves a
    /// half-written snapshot.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, self)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Capture the current contents of the in-process stores.
    pub fn capture(
        lots: &impl LotStore,
        ledger: &impl LedgerEventLog,
        activity: &impl ActivityLog,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            lots: lots.list()?,
            ledger: ledger.load_all()?,
            activity: activity.list()?,
        })
    }

    pub fn into_stores(self) -> (InMemoryLotStore, InMemoryLedgerEventLog, InMemoryActivityLog) {
        (
            InMemoryLotStore::with_lots(self.lots),
            InMemoryLedgerEventLog::from_envelopes(self.ledger),
            InMemoryActivityLog::with_entries(self.activity),
        )
    }
}
