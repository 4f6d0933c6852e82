//! Drives due queue entries to COMPLETED or FAILED.
//!
//! An entry is claimed (PENDING → PROCESSING) in its own transaction before the
//! publisher is called, so two runs racing on the same entry publish it once.
//! Claims that outlive the lease are failed, never republished.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::WorkflowError;
use crate::helper::access_helpers::apply_transition;
use crate::helper::notification_helpers::build_notification;
use crate::helper::publisher::{PublishError, PublishReceipt, PublishRequest, Publisher};
use crate::models::db_operations::content_db_operations;
use crate::models::db_operations::document_store::{Document, DocumentStore, StoreTxn};
use crate::models::db_operations::queue_db_operations;
use crate::models::{
    ContentItem, ContentStatus, NotificationType, QueueEntry, QueueEntryStatus, Recipient,
    Transition,
};

/// What one run did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessReport {
    pub completed: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    /// Entries another run claimed first.
    pub skipped: usize,
    pub not_due: usize,
    /// Expired claims turned into failures at the start of the run.
    pub released: usize,
}

impl ProcessReport {
    pub fn is_noop(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty() && self.released == 0
    }
}

pub struct QueueProcessor {
    store: DocumentStore,
    publisher: Arc<dyn Publisher>,
    publish_timeout: Duration,
    claim_lease: chrono::Duration,
    worker_id: String,
}

impl QueueProcessor {
    pub fn new(store: DocumentStore, publisher: Arc<dyn Publisher>, config: &QueueConfig) -> Self {
        Self::with_limits(store, publisher, config.publish_timeout(), config.claim_lease())
    }

    /// # Panics
    ///
    /// When `claim_lease` is not longer than `publish_timeout`. [`QueueConfig::validate`]
    /// rejects such settings at start-up.
    pub fn with_limits(
        store: DocumentStore,
        publisher: Arc<dyn Publisher>,
        publish_timeout: Duration,
        claim_lease: chrono::Duration,
    ) -> Self {
        assert!(
            claim_lease.to_std().map_or(false, |lease| lease > publish_timeout),
            "claim lease ({}s) must be longer than the publish timeout ({}s)",
            claim_lease.num_seconds(),
            publish_timeout.as_secs()
        );
        QueueProcessor {
            store,
            publisher,
            publish_timeout,
            claim_lease,
            worker_id: format!("worker-{}", Uuid::new_v4().simple()),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// One pass over the PENDING entries of every organization. Per-entry failures are
    /// recorded on the entry and never abort the pass; only a failure to list the queue
    /// is returned.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ProcessReport, WorkflowError> {
        self.run(now, None).await
    }

    /// Same as [`run_once`](Self::run_once), limited to one organization's entries.
    pub async fn run_once_for_organization(
        &self,
        now: DateTime<Utc>,
        organization_id: &str,
    ) -> Result<ProcessReport, WorkflowError> {
        self.run(now, Some(organization_id)).await
    }

    async fn run(
        &self,
        now: DateTime<Utc>,
        organization_id: Option<&str>,
    ) -> Result<ProcessReport, WorkflowError> {
        let mut report = ProcessReport {
            released: self.release_stale_claims(now, organization_id)?,
            ..Default::default()
        };

        let pending = match organization_id {
            Some(org) => {
                queue_db_operations::read_pending_entries_for_organization(&self.store, org)?
            }
            None => queue_db_operations::read_pending_entries(&self.store)?,
        };
        for entry in pending {
            if !entry.is_due(now) {
                report.not_due += 1;
                continue;
            }

            let claimed = match self.claim(&entry.id, now) {
                Ok(claimed) => claimed,
                Err(WorkflowError::Conflict(msg)) => {
                    log::warn!("Skipping queue entry {}: {}", entry.id, msg);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    log::error!("Could not claim queue entry {}: {}", entry.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let outcome = match self.build_request(&claimed) {
                Ok(request) => self.publish_with_timeout(request).await.map_err(|e| e.to_string()),
                Err(msg) => Err(msg),
            };

            let settled = match outcome {
                Ok(receipt) => self.complete(&claimed, receipt, now).map(|_| true),
                Err(msg) => {
                    log::warn!("Publishing queue entry {} failed: {}", claimed.id, msg);
                    self.fail(&claimed, &msg, now).map(|_| false)
                }
            };

            match settled {
                Ok(true) => report.completed.push(claimed.id),
                Ok(false) => report.failed.push(claimed.id),
                Err(e) => log::error!(
                    "Could not record the outcome of queue entry {}: {}",
                    claimed.id,
                    e
                ),
            }
        }

        if !report.is_noop() {
            log::info!(
                "Queue run finished: {} completed, {} failed, {} skipped, {} released",
                report.completed.len(),
                report.failed.len(),
                report.skipped,
                report.released
            );
        }
        Ok(report)
    }

    /// Runs every `poll_interval`, and also as soon as a queue entry is written so
    /// posts scheduled for "now" do not wait a full tick. Never returns.
    pub async fn run_polling(self: Arc<Self>, poll_interval: Duration) {
        let mut changes = self.store.subscribe(Some(QueueEntry::COLLECTION));
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                Some(_) = changes.next() => {}
            }
            if let Err(e) = self.run_once(Utc::now()).await {
                log::error!("Queue run failed: {}", e);
            }
            // The run's own writes are not new work.
            while changes.try_next().is_some() {}
        }
    }

    /// PENDING → PROCESSING for this worker. Anything but PENDING is a conflict.
    pub fn claim(&self, entry_id: &Uuid, now: DateTime<Utc>) -> Result<QueueEntry, WorkflowError> {
        self.store.transact(|txn| {
            let mut entry = txn
                .get::<QueueEntry>(entry_id)?
                .ok_or_else(|| WorkflowError::not_found("Queue entry", entry_id))?;
            if entry.status != QueueEntryStatus::Pending {
                return Err(WorkflowError::Conflict(format!(
                    "queue entry {} is already {:?}",
                    entry.id, entry.status
                )));
            }
            entry.status = QueueEntryStatus::Processing;
            entry.claimed_by = Some(self.worker_id.clone());
            entry.claimed_at = Some(now);
            txn.update(&mut entry)?;
            Ok(entry)
        })
    }

    fn build_request(&self, entry: &QueueEntry) -> Result<PublishRequest, String> {
        let (title, text) = match entry.content_id {
            Some(content_id) => {
                match content_db_operations::read_content(&self.store, &content_id) {
                    Ok(Some(item)) => (Some(item.title), item.body),
                    Ok(None) => return Err(format!("content {} no longer exists", content_id)),
                    Err(e) => return Err(e.to_string()),
                }
            }
            None => (None, entry.text.clone().unwrap_or_default()),
        };
        Ok(PublishRequest {
            queue_entry_id: entry.id,
            content_id: entry.content_id,
            organization_id: entry.organization_id.clone(),
            user_id: entry.user_id.clone(),
            platform: entry.platform,
            title,
            text,
        })
    }

    async fn publish_with_timeout(
        &self,
        request: PublishRequest,
    ) -> Result<PublishReceipt, PublishError> {
        match tokio::time::timeout(self.publish_timeout, self.publisher.publish(request)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::TimedOut(self.publish_timeout)),
        }
    }

    /// Loads the entry and checks this worker still holds the claim.
    fn load_claimed(
        &self,
        txn: &StoreTxn<'_>,
        entry_id: &Uuid,
    ) -> Result<QueueEntry, WorkflowError> {
        let entry = txn
            .get::<QueueEntry>(entry_id)?
            .ok_or_else(|| WorkflowError::not_found("Queue entry", entry_id))?;
        let held_by_us = entry.claimed_by.as_deref() == Some(self.worker_id.as_str());
        if entry.status != QueueEntryStatus::Processing || !held_by_us {
            return Err(WorkflowError::Conflict(format!(
                "claim on queue entry {} was lost",
                entry.id
            )));
        }
        Ok(entry)
    }

    fn complete(
        &self,
        claimed: &QueueEntry,
        receipt: PublishReceipt,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.store.transact(|txn| {
            let mut entry = self.load_claimed(txn, &claimed.id)?;
            entry.status = QueueEntryStatus::Completed;
            entry.published_at = Some(now);
            entry.external_id = Some(receipt.external_id.clone());
            entry.error = None;
            txn.update(&mut entry)?;

            let item = settle_content(txn, &entry, Transition::Publish, now)?;
            let title = item.as_ref().map_or("Your post", |i| i.title.as_str());
            let mut notification = build_notification(
                &entry.organization_id,
                Recipient::User(entry.user_id.clone()),
                NotificationType::Published,
                format!("{} was published to {}", title, entry.platform),
                item.as_ref(),
                None,
                now,
            );
            txn.create(&mut notification)?;
            log::info!("Queue entry {} published as {}", entry.id, receipt.external_id);
            Ok(())
        })
    }

    fn fail(
        &self,
        claimed: &QueueEntry,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.store.transact(|txn| {
            let mut entry = self.load_claimed(txn, &claimed.id)?;
            mark_failed(txn, &mut entry, message, now)
        })
    }

    /// Fails PROCESSING entries whose claim is older than the lease.
    fn release_stale_claims(
        &self,
        now: DateTime<Utc>,
        organization_id: Option<&str>,
    ) -> Result<usize, WorkflowError> {
        let cutoff = now - self.claim_lease;
        let mut released = 0;
        let stale_claims = queue_db_operations::read_stale_claims(&self.store, cutoff)?
            .into_iter()
            .filter(|e| organization_id.map_or(true, |org| e.organization_id == org));
        for stale in stale_claims {
            let result = self.store.transact(|txn| -> Result<bool, WorkflowError> {
                let Some(mut entry) = txn.get::<QueueEntry>(&stale.id)? else {
                    return Ok(false);
                };
                if entry.status != QueueEntryStatus::Processing
                    || entry.claimed_at != stale.claimed_at
                {
                    return Ok(false);
                }
                let message = "claim lease expired before the publish finished";
                mark_failed(txn, &mut entry, message, now)?;
                Ok(true)
            });
            match result {
                Ok(true) => {
                    log::warn!(
                        "Released expired claim on queue entry {} held by {}",
                        stale.id,
                        stale.claimed_by.as_deref().unwrap_or("unknown worker")
                    );
                    released += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("Could not release claim on queue entry {}: {}", stale.id, e)
                }
            }
        }
        Ok(released)
    }
}

fn mark_failed(
    txn: &mut StoreTxn<'_>,
    entry: &mut QueueEntry,
    message: &str,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    entry.status = QueueEntryStatus::Failed;
    entry.error = Some(message.to_string());
    txn.update(entry)?;

    let item = settle_content(txn, entry, Transition::Fail, now)?;
    let title = item.as_ref().map_or("Your post", |i| i.title.as_str());
    let mut notification = build_notification(
        &entry.organization_id,
        Recipient::User(entry.user_id.clone()),
        NotificationType::PublishFailed,
        format!("{} could not be published to {}", title, entry.platform),
        item.as_ref(),
        Some(message.to_string()),
        now,
    );
    txn.create(&mut notification)?;
    Ok(())
}

/// Moves linked content out of SCHEDULED. Content that was edited, rescheduled
/// elsewhere or deleted in the meantime is left alone.
fn settle_content(
    txn: &mut StoreTxn<'_>,
    entry: &QueueEntry,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<Option<ContentItem>, WorkflowError> {
    let Some(content_id) = entry.content_id else {
        return Ok(None);
    };
    let Some(mut item) = txn.get::<ContentItem>(&content_id)? else {
        return Ok(None);
    };
    if item.status == ContentStatus::Scheduled {
        apply_transition(&mut item, transition, now);
        txn.update(&mut item)?;
    } else {
        log::warn!(
            "Content {} is {} instead of SCHEDULED; leaving it as is for queue entry {}",
            item.id,
            item.status,
            entry.id
        );
    }
    Ok(Some(item))
}
