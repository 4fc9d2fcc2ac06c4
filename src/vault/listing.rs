use super::error::VaultError;
use super::lifecycle::{Confirm, DeleteOutcome, Lifecycle};
use crate::events::{Notice, Subscription, UploadBus};
use crate::storage::models::ResumeRecord;

/// One owner's live resume list.
///
/// Subscribes to upload notifications when activated and unsubscribes when
/// dropped. The held list is only ever replaced wholesale by a successful
/// refresh, or shortened by a successful delete.
pub struct ResumeListView {
    lifecycle: Lifecycle,
    owner_id: String,
    records: Vec<ResumeRecord>,
    subscription: Subscription,
}

impl ResumeListView {
    /// Subscribe, then load the initial list.
    pub async fn activate(
        lifecycle: Lifecycle,
        bus: &UploadBus,
        owner_id: impl Into<String>,
    ) -> Result<Self, VaultError> {
        let subscription = bus.subscribe();
        let mut view = Self {
            lifecycle,
            owner_id: owner_id.into(),
            records: Vec::new(),
            subscription,
        };
        view.refresh().await?;
        Ok(view)
    }

    pub fn records(&self) -> &[ResumeRecord] {
        &self.records
    }

    /// Reload from the table. On failure the previous list is kept.
    pub async fn refresh(&mut self) -> Result<&[ResumeRecord], VaultError> {
        self.records = self.lifecycle.list(&self.owner_id).await?;
        Ok(&self.records)
    }

    pub async fn delete(
        &mut self,
        record: &ResumeRecord,
        confirm: impl Confirm,
    ) -> Result<DeleteOutcome, VaultError> {
        let outcome = self.lifecycle.delete(record, confirm).await?;
        if outcome == DeleteOutcome::Deleted {
            self.records.retain(|r| r.id != record.id);
        }
        Ok(outcome)
    }

    /// Wait for this owner's next upload, then refresh.
    ///
    /// Returns `None` once the bus is gone.
    pub async fn next_upload(&mut self) -> Option<Result<&[ResumeRecord], VaultError>> {
        match self.subscription.recv_for(&self.owner_id).await? {
            Notice::Event(_) => {}
            Notice::Missed(n) => {
                tracing::debug!(owner_id = %self.owner_id, missed = n, "Upload notices dropped");
            }
        }
        Some(self.refresh().await)
    }
}
