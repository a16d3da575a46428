//! External sync adapter.
//!
//! Pushes never fail the caller: the outcome is written to the activity log
//! and returned as a value. Pulls surface the final error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::activity::{ActivityEntry, ActivityLog, ActivityStatus, SyncAction};
use crate::error::{RemoteError, SyncError};
use crate::retry::{RetryFailure, RetryPolicy};
use crate::service::InventoryService;
use crate::types::{OutboundShipment, QuantityUpdate, RemoteItem};

const KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6c6f_746b_6565_7065_725f_7379_6e63_6b79);

/// Stable idempotency key for `action` on a local reference.
pub fn idempotency_key(action: SyncAction, reference: &str) -> Uuid {
    Uuid::new_v5(&KEY_NAMESPACE, format!("{}|{reference}", action.as_str()).as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullOptions {
    pub page_size: u32,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    /// Stop after this many pages even if more remain.
    pub max_pages: Option<u32>,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_delay: Duration::from_millis(250),
            max_pages: None,
        }
    }
}

/// Result of a push. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Synced { remote_id: String, attempts: u32 },
    Failed { error: RemoteError, attempts: u32 },
}

impl PushOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, PushOutcome::Synced { .. })
    }
}

pub struct SyncAdapter<S, A> {
    service: S,
    activity: A,
    policy: RetryPolicy,
}

impl<S, A> SyncAdapter<S, A>
where
    S: InventoryService,
    A: ActivityLog,
{
    pub fn new(service: S, activity: A, policy: RetryPolicy) -> Self {
        Self {
            service,
            activity,
            policy,
        }
    }

    pub fn activity(&self) -> &A {
        &self.activity
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Create the remote outbound-shipment record for a sale.
    pub async fn push_outbound(&self, shipment: &OutboundShipment) -> PushOutcome {
        let reference = shipment.reference();
        let key = idempotency_key(SyncAction::CreateOutbound, &reference);
        let result = self
            .policy
            .run("create_outbound", || self.service.create_outbound(key, shipment))
            .await;
        self.finish_push(SyncAction::CreateOutbound, reference, key, result)
    }

    /// Set the remote on-hand quantity for a lot.
    pub async fn push_quantity(&self, update: &QuantityUpdate) -> PushOutcome {
        let reference = update.reference();
        let key = idempotency_key(SyncAction::UpdateQuantity, &reference);
        let result = self
            .policy
            .run("update_quantity", || self.service.update_quantity(key, update))
            .await;
        self.finish_push(SyncAction::UpdateQuantity, reference, key, result)
    }

    fn finish_push(
        &self,
        action: SyncAction,
        reference: String,
        key: Uuid,
        result: Result<(crate::types::RemoteRecord, u32), RetryFailure>,
    ) -> PushOutcome {
        let (entry, outcome) = match result {
            Ok((record, attempts)) => {
                info!(action = action.as_str(), %reference, remote_id = %record.id, attempts, "sync push succeeded");
                (
                    ActivityEntry::new(action, ActivityStatus::Success, reference)
                        .with_key(key)
                        .with_attempts(attempts)
                        .with_details(format!("remote id {}", record.id)),
                    PushOutcome::Synced {
                        remote_id: record.id,
                        attempts,
                    },
                )
            }
            Err(failure) => {
                error!(
                    action = action.as_str(),
                    %reference,
                    attempts = failure.attempts,
                    exhausted = failure.exhausted,
                    error = %failure.error,
                    "sync push failed"
                );
                (
                    ActivityEntry::new(action, ActivityStatus::Error, reference)
                        .with_key(key)
                        .with_attempts(failure.attempts)
                        .with_details(failure.error.to_string()),
                    PushOutcome::Failed {
                        error: failure.error,
                        attempts: failure.attempts,
                    },
                )
            }
        };
        if let Err(e) = self.activity.record(entry) {
            error!(error = %e, "could not write sync activity");
        }
        outcome
    }

    /// Page through every remote item. Stops on a short page or at
    /// `max_pages`; the last error is returned once retries are spent.
    pub async fn pull(&self, options: PullOptions) -> Result<Vec<RemoteItem>, SyncError> {
        let page_size = options.page_size.max(1);
        let mut items = Vec::new();
        let mut page = 1u32;
        let mut total_attempts = 0u32;

        loop {
            let result = self
                .policy
                .run("list_page", || self.service.list_page(page, page_size))
                .await;
            let batch = match result {
                Ok((batch, attempts)) => {
                    total_attempts += attempts;
                    batch
                }
                Err(failure) => {
                    total_attempts += failure.attempts;
                    error!(page, error = %failure.error, "pull failed");
                    self.activity.record(
                        ActivityEntry::new(SyncAction::Pull, ActivityStatus::Error, format!("pull:page:{page}"))
                            .with_attempts(total_attempts)
                            .with_details(failure.error.to_string()),
                    )?;
                    return Err(if failure.exhausted {
                        SyncError::Exhausted {
                            attempts: failure.attempts,
                            last: failure.error,
                        }
                    } else {
                        SyncError::Remote(failure.error)
                    });
                }
            };

            let short = (batch.len() as u64) < u64::from(page_size);
            items.extend(batch);
            let capped = options.max_pages.is_some_and(|max| page >= max);
            if short || capped {
                break;
            }
            page += 1;
            tokio::time::sleep(options.page_delay).await;
        }

        info!(items = items.len(), pages = page, "pull complete");
        self.activity.record(
            ActivityEntry::new(SyncAction::Pull, ActivityStatus::Success, "pull")
                .with_attempts(total_attempts)
                .with_details(format!("{} items over {page} pages", items.len())),
        )?;
        Ok(items)
    }
}
