//! Sync reconciler.
//!
//! Brings local account/transaction state in line with the aggregator's
//! view for one item: drains the cursor-paginated delta feed, then
//! commits accounts, transaction upserts, removals, and the cursor
//! advance atomically through `Database::apply_sync`.

use crate::models::{Account, Item, ItemStatus};
use crate::services::aggregator::{AggregatorClient, AggregatorError, AggregatorTransaction};
use crate::services::database::Database;
use crate::services::metrics::{ERRORS_TOTAL, SYNC_RUNS_TOTAL, SYNC_TRANSACTIONS_TOTAL};
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Accumulated added/modified/removed deltas across all pages of one
/// sync attempt. The three lists are disjoint by provider contract.
#[derive(Debug, Default)]
pub struct SyncDelta {
    pub added: Vec<AggregatorTransaction>,
    pub modified: Vec<AggregatorTransaction>,
    pub removed: Vec<String>,
}

/// What one reconciliation produced.
#[derive(Debug)]
pub struct SyncOutcome {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub accounts: Vec<Account>,
    /// False when the provider reported zero accounts; the caller should
    /// discard a freshly linked item in that case.
    pub item_live: bool,
}

/// Drain the provider's delta feed starting from `cursor`, accumulating
/// pages until the provider signals no more. Returns the accumulated
/// delta and the final page's cursor.
///
/// Any mid-pagination failure abandons the partial accumulation; nothing
/// is persisted here, so the stored cursor is untouched.
pub async fn collect_deltas(
    client: &AggregatorClient,
    access_token: &str,
    cursor: Option<String>,
) -> Result<(SyncDelta, String), AggregatorError> {
    let mut delta = SyncDelta::default();
    let mut cursor = cursor;

    loop {
        let page = client
            .transactions_sync(access_token, cursor.as_deref())
            .await?;

        delta.added.extend(page.added);
        delta.modified.extend(page.modified);
        delta
            .removed
            .extend(page.removed.into_iter().map(|r| r.transaction_id));

        cursor = Some(page.next_cursor);

        if !page.has_more {
            break;
        }
    }

    // The loop always runs at least once, so the cursor is set.
    let final_cursor = cursor.unwrap_or_default();
    Ok((delta, final_cursor))
}

/// Reconciliation driver. Holds per-item locks so at most one
/// reconciliation per item runs at a time within this process.
pub struct SyncService {
    db: Database,
    aggregator: AggregatorClient,
    item_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl SyncService {
    pub fn new(db: Database, aggregator: AggregatorClient) -> Self {
        Self {
            db,
            aggregator,
            item_locks: DashMap::new(),
        }
    }

    /// Number of items currently holding a sync lock entry.
    pub fn active_lock_count(&self) -> usize {
        self.item_locks.len()
    }

    /// Reconcile one item, identified by its external id.
    ///
    /// All-or-nothing at the commit step: reads are incremental, but a
    /// fetch error anywhere discards the partial result and leaves the
    /// stored cursor at its pre-call value.
    #[instrument(skip(self), fields(external_item_id = %external_item_id))]
    pub async fn sync_item(&self, external_item_id: &str) -> Result<SyncOutcome, AppError> {
        let item = self
            .db
            .get_item_by_external_id(external_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Item not found")))?;

        let lock = self
            .item_locks
            .entry(item.id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;
        let result = self.sync_item_locked(&item).await;
        drop(guard);

        // Count 2 means the map's handle plus ours; anything higher is a
        // waiter, whose entry() call serializes with this removal on the
        // shard lock.
        self.item_locks
            .remove_if(&item.id, |_, l| Arc::strong_count(l) == 2);

        result
    }

    async fn sync_item_locked(&self, item: &Item) -> Result<SyncOutcome, AppError> {
        // Re-read the cursor under the lock; a sync that finished while
        // we waited may have advanced it.
        let cursor = self.db.get_item_cursor(item.id).await?;

        let (delta, next_cursor) =
            match collect_deltas(&self.aggregator, &item.access_token, cursor).await {
                Ok(result) => result,
                Err(e) => return Err(self.upstream_failure(item.id, e).await),
            };

        let accounts = match self.aggregator.get_accounts(&item.access_token).await {
            Ok(response) => response.accounts,
            Err(e) => return Err(self.upstream_failure(item.id, e).await),
        };

        let report = self
            .db
            .apply_sync(item.id, &accounts, &delta, &next_cursor)
            .await
            .inspect_err(|_| {
                SYNC_RUNS_TOTAL.with_label_values(&["error"]).inc();
                ERRORS_TOTAL.with_label_values(&["db_error"]).inc();
            })?;

        if !report.accounts_created && report.accounts.is_empty() {
            SYNC_RUNS_TOTAL.with_label_values(&["empty"]).inc();
            warn!(item_id = %item.id, "Sync produced no accounts; treating as no-op");
            return Ok(SyncOutcome {
                added: 0,
                modified: 0,
                removed: 0,
                skipped: 0,
                accounts: Vec::new(),
                item_live: false,
            });
        }

        SYNC_RUNS_TOTAL.with_label_values(&["ok"]).inc();
        SYNC_TRANSACTIONS_TOTAL
            .with_label_values(&["added"])
            .inc_by(report.added as f64);
        SYNC_TRANSACTIONS_TOTAL
            .with_label_values(&["modified"])
            .inc_by(report.modified as f64);
        SYNC_TRANSACTIONS_TOTAL
            .with_label_values(&["removed"])
            .inc_by(report.removed as f64);
        SYNC_TRANSACTIONS_TOTAL
            .with_label_values(&["skipped"])
            .inc_by(report.skipped as f64);

        info!(
            item_id = %item.id,
            added = report.added,
            modified = report.modified,
            removed = report.removed,
            skipped = report.skipped,
            "Item reconciled"
        );

        Ok(SyncOutcome {
            added: report.added,
            modified: report.modified,
            removed: report.removed,
            skipped: report.skipped,
            accounts: report.accounts,
            item_live: true,
        })
    }

    /// Map an aggregator failure, flipping the item to `bad` when the
    /// provider says the user must re-authenticate.
    async fn upstream_failure(&self, item_id: Uuid, e: AggregatorError) -> AppError {
        SYNC_RUNS_TOTAL.with_label_values(&["error"]).inc();
        ERRORS_TOTAL.with_label_values(&["aggregator_error"]).inc();
        error!(item_id = %item_id, error = %e, "Aggregator call failed; sync aborted");

        if e.is_login_required() {
            if let Err(update_err) = self.db.update_item_status(item_id, ItemStatus::Bad).await {
                error!(item_id = %item_id, error = %update_err, "Failed to mark item bad");
            }
        }

        AppError::BadGateway(e.to_string())
    }
}
