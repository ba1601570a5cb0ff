//! Draft persistence and debounced autosave.
//!
//! Snapshots are JSON documents stored under a per-user key in a
//! [`DraftStore`]. Pending local files are never part of a snapshot; only
//! metadata of already-uploaded assets survives a reload.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::debounce::Debounce;
use crate::draft::EventDraft;
use crate::steps::StepId;
use crate::types::Timestamp;

/// Key prefix of wizard drafts in the store.
pub const DRAFT_KEY_PREFIX: &str = "event-wizard-draft";

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Store key of `user_id`'s draft.
pub fn draft_key(user_id: &str) -> String {
    format!("{DRAFT_KEY_PREFIX}:{user_id}")
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DraftStoreError {
    #[error("Draft store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Draft serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Draft store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent key-value store scoped to one client profile.
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DraftStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DraftStoreError>;
    fn remove(&self, key: &str) -> Result<(), DraftStoreError>;
}

/// In-process store, used by tests and headless sessions.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    fn poisoned() -> DraftStoreError {
        DraftStoreError::Unavailable("memory store lock poisoned".into())
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        *self.writes.lock().map_err(|_| Self::poisoned())? += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serializable wizard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub version: u32,
    pub user_id: String,
    pub current_step: StepId,
    pub draft: EventDraft,
    pub saved_at: Timestamp,
}

impl DraftSnapshot {
    pub fn new(user_id: &str, current_step: StepId, draft: &EventDraft) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            user_id: user_id.to_string(),
            current_step,
            draft: draft.clone(),
            saved_at: chrono::Utc::now(),
        }
    }
}

/// Write a snapshot of `draft` at `step` for `user_id`.
pub fn save_draft(
    store: &dyn DraftStore,
    user_id: &str,
    step: StepId,
    draft: &EventDraft,
) -> Result<DraftSnapshot, DraftStoreError> {
    let snapshot = DraftSnapshot::new(user_id, step, draft);
    let json = serde_json::to_string(&snapshot)?;
    store.set(&draft_key(user_id), &json)?;
    tracing::debug!(user_id, step = step.as_str(), bytes = json.len(), "Draft saved");
    Ok(snapshot)
}

/// Read `user_id`'s snapshot.
///
/// Snapshots of another layout version, or belonging to another user, are
/// ignored.
pub fn load_draft(
    store: &dyn DraftStore,
    user_id: &str,
) -> Result<Option<DraftSnapshot>, DraftStoreError> {
    let Some(json) = store.get(&draft_key(user_id))? else {
        return Ok(None);
    };
    let snapshot: DraftSnapshot = serde_json::from_str(&json)?;
    if snapshot.version != SNAPSHOT_VERSION {
        tracing::warn!(
            user_id,
            version = snapshot.version,
            "Ignoring draft with unsupported version",
        );
        return Ok(None);
    }
    if snapshot.user_id != user_id {
        tracing::warn!(user_id, owner = %snapshot.user_id, "Ignoring draft of another user");
        return Ok(None);
    }
    Ok(Some(snapshot))
}

pub fn clear_draft(store: &dyn DraftStore, user_id: &str) -> Result<(), DraftStoreError> {
    store.remove(&draft_key(user_id))
}

// ---------------------------------------------------------------------------
// Autosave
// ---------------------------------------------------------------------------

/// Debounced writer of one user's draft.
///
/// Every mutation re-arms a single timer; the write happens once the quiet
/// period after the latest mutation has elapsed.
pub struct DraftAutosave {
    store: Arc<dyn DraftStore>,
    user_id: String,
    timer: Debounce,
}

impl DraftAutosave {
    pub fn new(store: Arc<dyn DraftStore>, user_id: impl Into<String>, quiet: Duration) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            timer: Debounce::new(quiet),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn mark_dirty(&mut self, now: Instant) {
        self.timer.schedule(now);
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Write if the quiet period has elapsed. Returns whether a write happened.
    pub fn poll(
        &mut self,
        now: Instant,
        step: StepId,
        draft: &EventDraft,
    ) -> Result<bool, DraftStoreError> {
        if !self.timer.fire(now) {
            return Ok(false);
        }
        save_draft(self.store.as_ref(), &self.user_id, step, draft)?;
        Ok(true)
    }

    /// Perform the pending write immediately, if any.
    pub fn flush(&mut self, step: StepId, draft: &EventDraft) -> Result<bool, DraftStoreError> {
        if !self.timer.take() {
            return Ok(false);
        }
        save_draft(self.store.as_ref(), &self.user_id, step, draft)?;
        Ok(true)
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn load(&self) -> Result<Option<DraftSnapshot>, DraftStoreError> {
        load_draft(self.store.as_ref(), &self.user_id)
    }

    /// Cancel any pending write and delete the snapshot.
    pub fn clear(&mut self) -> Result<(), DraftStoreError> {
        self.timer.cancel();
        clear_draft(self.store.as_ref(), &self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::draft::{ImageRef, PendingFile, Visibility};
    use crate::test_support::valid_draft;

    fn autosave(store: &Arc<MemoryDraftStore>) -> DraftAutosave {
        DraftAutosave::new(store.clone(), "user_1", Duration::from_secs(2))
    }

    #[test]
    fn draft_key_is_user_scoped() {
        assert_eq!(draft_key("u_42"), "event-wizard-draft:u_42");
        assert_ne!(draft_key("a"), draft_key("b"));
    }

    // -- save_draft / load_draft --

    #[test]
    fn save_then_load_restores_step_and_record() {
        let store = MemoryDraftStore::new();
        let mut draft = valid_draft();
        draft.visibility = Visibility::normalize("private", vec!["u_2".into()]);
        save_draft(&store, "user_1", StepId::Tickets, &draft).unwrap();

        let snapshot = load_draft(&store, "user_1").unwrap().unwrap();
        assert_eq!(snapshot.current_step, StepId::Tickets);
        assert_eq!(snapshot.draft, draft);
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn pending_files_are_not_persisted() {
        let store = MemoryDraftStore::new();
        let mut draft = valid_draft();
        draft
            .images
            .push(ImageRef::pending(PendingFile::new("b.png", "image/png", vec![9; 16])));
        save_draft(&store, "user_1", StepId::Media, &draft).unwrap();

        let raw = store.get(&draft_key("user_1")).unwrap().unwrap();
        assert!(!raw.contains("pending_file"));
        let snapshot = load_draft(&store, "user_1").unwrap().unwrap();
        assert_eq!(snapshot.draft.images.len(), 2);
        assert!(!snapshot.draft.has_pending_files());
        assert_eq!(snapshot.draft.images[0].storage_id, "img_1");
    }

    #[test]
    fn load_missing_returns_none() {
        let store = MemoryDraftStore::new();
        assert_matches!(load_draft(&store, "nobody"), Ok(None));
    }

    #[test]
    fn load_corrupt_snapshot_is_an_error() {
        let store = MemoryDraftStore::new();
        store.set(&draft_key("user_1"), "{not json").unwrap();
        assert_matches!(
            load_draft(&store, "user_1"),
            Err(DraftStoreError::Serialization(_))
        );
    }

    #[test]
    fn load_ignores_other_versions_and_owners() {
        let store = MemoryDraftStore::new();
        let mut snapshot = DraftSnapshot::new("user_1", StepId::Location, &valid_draft());
        snapshot.version = 99;
        store
            .set(&draft_key("user_1"), &serde_json::to_string(&snapshot).unwrap())
            .unwrap();
        assert_matches!(load_draft(&store, "user_1"), Ok(None));

        snapshot.version = SNAPSHOT_VERSION;
        snapshot.user_id = "intruder".into();
        store
            .set(&draft_key("user_1"), &serde_json::to_string(&snapshot).unwrap())
            .unwrap();
        assert_matches!(load_draft(&store, "user_1"), Ok(None));
    }

    #[test]
    fn clear_removes_snapshot() {
        let store = MemoryDraftStore::new();
        save_draft(&store, "user_1", StepId::BasicInfo, &valid_draft()).unwrap();
        clear_draft(&store, "user_1").unwrap();
        assert!(!store.contains(&draft_key("user_1")));
    }

    // -- DraftAutosave --

    #[test]
    fn second_edit_resets_the_quiet_period() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut autosave = autosave(&store);
        let draft = valid_draft();
        let t0 = Instant::now();

        autosave.mark_dirty(t0);
        autosave.mark_dirty(t0 + Duration::from_secs(1));

        assert!(!autosave
            .poll(t0 + Duration::from_secs(2), StepId::BasicInfo, &draft)
            .unwrap());
        assert_eq!(store.writes(), 0);

        assert!(autosave
            .poll(t0 + Duration::from_secs(3), StepId::BasicInfo, &draft)
            .unwrap());
        assert!(!autosave
            .poll(t0 + Duration::from_secs(10), StepId::BasicInfo, &draft)
            .unwrap());
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn flush_writes_pending_immediately() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut autosave = autosave(&store);
        assert!(!autosave.flush(StepId::BasicInfo, &valid_draft()).unwrap());

        autosave.mark_dirty(Instant::now());
        assert!(autosave.flush(StepId::DateTime, &valid_draft()).unwrap());
        assert_eq!(store.writes(), 1);
        assert!(!autosave.is_pending());
        assert_eq!(
            autosave.load().unwrap().map(|s| s.current_step),
            Some(StepId::DateTime)
        );
    }

    #[test]
    fn clear_cancels_pending_write() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut autosave = autosave(&store);
        let t0 = Instant::now();
        autosave.mark_dirty(t0);
        autosave.clear().unwrap();
        assert!(!autosave
            .poll(t0 + Duration::from_secs(5), StepId::BasicInfo, &valid_draft())
            .unwrap());
        assert_eq!(store.writes(), 0);
    }
}
