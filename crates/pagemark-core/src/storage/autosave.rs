//! Periodic snapshot saving driven by the host.

use super::{FileStorage, SnapshotStorage, StorageResult};
use crate::config::{DEFAULT_AUTOSAVE_INTERVAL_SECS, SessionConfig};
use crate::session::EditingSession;
use crate::snapshot::SessionSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key the most recent save is also written under, for restore-on-launch.
pub const LAST_SESSION_KEY: &str = "__last_session__";

/// Tracks unsaved changes and saves at most once per interval.
///
/// The host calls [`maybe_save`](Self::maybe_save) at its own cadence
/// (every frame, on a timer, on blur); nothing runs in the background.
pub struct AutoSaveManager<S: SnapshotStorage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    /// Whether there are unsaved changes.
    dirty: bool,
    session_id: String,
}

impl<S: SnapshotStorage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>, session_id: impl Into<String>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            session_id: session_id.into(),
        }
    }

    /// Use the interval from a session config.
    pub fn with_config(mut self, config: &SessionConfig) -> Self {
        self.interval = config.autosave_interval();
        self
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Dirty and the interval has elapsed (or nothing was saved yet).
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Pick up the session's changes and save if due.
    /// Returns true if a save was performed.
    pub async fn maybe_save(&mut self, session: &mut EditingSession) -> StorageResult<bool> {
        if session.take_dirty() {
            self.dirty = true;
        }
        if !self.should_save() {
            return Ok(false);
        }
        self.save(&session.snapshot()).await?;
        Ok(true)
    }

    /// Save immediately.
    pub async fn save(&mut self, snapshot: &SessionSnapshot) -> StorageResult<()> {
        self.storage.save(&self.session_id, snapshot).await?;
        self.storage.save(LAST_SESSION_KEY, snapshot).await?;
        self.last_save = Some(Instant::now());
        self.dirty = false;
        log::debug!("auto-saved session {}", self.session_id);
        Ok(())
    }

    /// Load this manager's session.
    pub async fn load(&mut self) -> StorageResult<SessionSnapshot> {
        let snapshot = self.storage.load(&self.session_id).await?;
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Ok(snapshot)
    }

    /// The most recently saved snapshot of any session.
    pub async fn load_last(&self) -> Option<SessionSnapshot> {
        self.storage.load(LAST_SESSION_KEY).await.ok()
    }

    /// Saved session ids, excluding the last-session alias.
    pub async fn list_sessions(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list().await?;
        ids.retain(|id| id != LAST_SESSION_KEY);
        Ok(ids)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// Auto-save manager backed by [`FileStorage::default_location`].
pub fn create_autosave_manager(
    session_id: impl Into<String>,
    config: &SessionConfig,
) -> StorageResult<AutoSaveManager<FileStorage>> {
    let storage = Arc::new(FileStorage::default_location()?);
    Ok(AutoSaveManager::new(storage, session_id).with_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PeerId;
    use crate::element::{EditableElement, ElementPayload, ShapePayload};
    use crate::storage::MemoryStorage;
    use kurbo::Rect;
    use pollster::block_on;

    fn session() -> EditingSession {
        EditingSession::open(SessionConfig::default(), PeerId::from("me"), 1)
    }

    #[test]
    fn test_clean_session_is_not_saved() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()), "s1");
        let mut session = session();
        assert!(!block_on(manager.maybe_save(&mut session)).unwrap());
    }

    #[test]
    fn test_edit_triggers_save_once() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone(), "s1");
        manager.set_interval(Duration::from_secs(3600));
        let mut session = session();
        session
            .add(EditableElement::new(
                0,
                Rect::new(0.0, 0.0, 5.0, 5.0),
                ElementPayload::Rectangle(ShapePayload::default()),
            ))
            .unwrap();

        assert!(block_on(manager.maybe_save(&mut session)).unwrap());
        assert!(!manager.is_dirty());
        assert!(!block_on(manager.maybe_save(&mut session)).unwrap());
        assert_eq!(block_on(storage.load("s1")).unwrap().elements.len(), 1);
    }

    #[test]
    fn test_interval_throttles_saves() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()), "s1");
        manager.set_interval(Duration::from_secs(3600));
        manager.mark_dirty();
        block_on(manager.save(&SessionSnapshot::new(1, Vec::new(), 0))).unwrap();
        manager.mark_dirty();
        assert!(!manager.should_save());
    }

    #[test]
    fn test_list_excludes_last_session_key() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()), "s1");
        block_on(manager.save(&SessionSnapshot::new(1, Vec::new(), 0))).unwrap();
        let ids = block_on(manager.list_sessions()).unwrap();
        assert_eq!(ids, vec!["s1".to_string()]);
        assert!(block_on(manager.load_last()).is_some());
    }
}
