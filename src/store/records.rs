// Notification Record Store
//
// Owns the persisted notification history and its deletion markers.
// Three slots in the preferences map, kept byte-compatible with prior
// installs:
// - "notifications": JSON array of NotificationRecord
// - "deleted_notification_ids": JSON array of record ids
// - "deleted_notification_title_body": JSON array of {title, body} pairs
//
// The marker slots are append-only and never pruned. The slots persist
// independently; there is no cross-slot transaction.

use crate::store::prefs::Preferences;
use crate::types::PushMessage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

const KEY_NOTIFICATIONS: &str = "notifications";
const KEY_DELETED_IDS: &str = "deleted_notification_ids";
const KEY_DELETED_TITLE_BODY: &str = "deleted_notification_title_body";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage write failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single entry of the saved notification history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub timestamp: u64,
}

/// A deleted `(title, body)` pair. Suppresses future records with the
/// same content regardless of their data map or id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMarker {
    pub title: String,
    pub body: String,
}

/// Result of a `save` call. Both variants expose the resolved title/body
/// so the tray text always matches what the store computed.
#[derive(Debug)]
pub enum SaveOutcome {
    Stored(NotificationRecord),
    Suppressed { title: String, body: String },
}

impl SaveOutcome {
    pub fn title(&self) -> &str {
        match self {
            SaveOutcome::Stored(record) => &record.title,
            SaveOutcome::Suppressed { title, .. } => title,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            SaveOutcome::Stored(record) => &record.body,
            SaveOutcome::Suppressed { body, .. } => body,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_stored(&self) -> bool {
        matches!(self, SaveOutcome::Stored(_))
    }
}

/// Persisted notification history with duplicate suppression.
///
/// Every public operation is a read-modify-write cycle over the
/// preferences file, serialized by the interior mutex (single logical
/// writer: the push receiver thread plus the bridge command handlers).
pub struct NotificationStore {
    prefs: Mutex<Preferences>,
}

impl NotificationStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            prefs: Mutex::new(Preferences::new(path)),
        }
    }

    /// Open the store at its platform-default location.
    pub fn open_default() -> Self {
        let dir = dirs::data_dir()
            .expect("Failed to get app data directory")
            .join("pushbridge");
        Self::new(dir.join("notifications.json"))
    }

    /// Save an incoming push message unless it is a duplicate of an
    /// active record or matches a deletion marker.
    pub fn save(&self, msg: &PushMessage) -> Result<SaveOutcome, StoreError> {
        let prefs = self.prefs.lock().unwrap();

        let mut records: Vec<NotificationRecord> = read_slot(&prefs, KEY_NOTIFICATIONS);
        let deleted_ids: Vec<String> = read_slot(&prefs, KEY_DELETED_IDS);
        let deleted_content: Vec<ContentMarker> = read_slot(&prefs, KEY_DELETED_TITLE_BODY);

        let (title, body) = msg.resolve_content();
        let data = msg.data.clone();

        let millis = current_millis();
        let id = millis.to_string();

        // Duplicate detection is content-only; the freshly minted id
        // never participates.
        let is_duplicate = records
            .iter()
            .any(|r| r.title == title && r.body == body && r.data == data);

        let is_deleted = deleted_ids.iter().any(|d| *d == id)
            || deleted_content
                .iter()
                .any(|m| m.title == title && m.body == body);

        if is_duplicate || is_deleted {
            println!(
                "[RecordStore] Duplicate or deleted notification not saved: {} | {}",
                title, body
            );
            return Ok(SaveOutcome::Suppressed { title, body });
        }

        let record = NotificationRecord {
            id,
            title,
            body,
            data,
            timestamp: millis,
        };

        records.push(record.clone());
        prefs.put_strings(&[(KEY_NOTIFICATIONS, serde_json::to_string(&records)?)])?;

        println!("[RecordStore] Notification saved with id: {}", record.id);
        Ok(SaveOutcome::Stored(record))
    }

    /// Active records in insertion order (oldest first).
    /// Malformed slot content reads as an empty history.
    pub fn list(&self) -> Vec<NotificationRecord> {
        let prefs = self.prefs.lock().unwrap();
        read_slot(&prefs, KEY_NOTIFICATIONS)
    }

    /// Remove records matching the given criteria and record the matching
    /// deletion markers.
    ///
    /// Criteria are evaluated per record, id first: an id match removes
    /// the record and appends its id to the deleted-id slot (one entry per
    /// removed record); otherwise a title+body match removes it and the
    /// call appends a single `(title, body)` marker on the first such
    /// match. A call with both criteria may therefore remove several
    /// distinct records in one pass. Zero matches, or no criteria at all,
    /// is a no-op success.
    pub fn delete(
        &self,
        id: Option<&str>,
        title: Option<&str>,
        body: Option<&str>,
    ) -> Result<(), StoreError> {
        let prefs = self.prefs.lock().unwrap();

        let records: Vec<NotificationRecord> = read_slot(&prefs, KEY_NOTIFICATIONS);
        let mut deleted_ids: Vec<String> = read_slot(&prefs, KEY_DELETED_IDS);
        let mut deleted_content: Vec<ContentMarker> = read_slot(&prefs, KEY_DELETED_TITLE_BODY);

        let mut kept = Vec::with_capacity(records.len());
        let mut content_marked = false;

        for record in records {
            if let Some(id) = id {
                if record.id == id {
                    deleted_ids.push(record.id);
                    continue;
                }
            }

            if let (Some(title), Some(body)) = (title, body) {
                if record.title == title && record.body == body {
                    if !content_marked {
                        deleted_content.push(ContentMarker {
                            title: title.to_string(),
                            body: body.to_string(),
                        });
                        content_marked = true;
                    }
                    continue;
                }
            }

            kept.push(record);
        }

        prefs.put_strings(&[
            (KEY_NOTIFICATIONS, serde_json::to_string(&kept)?),
            (KEY_DELETED_IDS, serde_json::to_string(&deleted_ids)?),
            (KEY_DELETED_TITLE_BODY, serde_json::to_string(&deleted_content)?),
        ])?;

        Ok(())
    }

    /// Empty the active history. Deletion markers are left untouched, so
    /// previously deleted content stays suppressed.
    pub fn clear(&self) -> Result<(), StoreError> {
        let prefs = self.prefs.lock().unwrap();
        prefs.put_strings(&[(KEY_NOTIFICATIONS, "[]".to_string())])?;
        println!("[RecordStore] Cleared saved notifications");
        Ok(())
    }
}

/// Read one slot as a typed vector. Missing or unparseable content reads
/// as empty, never as an error.
fn read_slot<T: DeserializeOwned>(prefs: &Preferences, key: &str) -> Vec<T> {
    let raw = prefs.get_string(key, "[]");
    serde_json::from_str(&raw).unwrap_or_default()
}

/// Current Unix time in milliseconds. Record ids are minted from this.
fn current_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationBlock;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> NotificationStore {
        NotificationStore::new(dir.path().join("notifications.json"))
    }

    fn data_msg(title: &str, body: &str) -> PushMessage {
        let mut data = BTreeMap::new();
        data.insert("title".to_string(), title.to_string());
        data.insert("body".to_string(), body.to_string());
        PushMessage {
            notification: None,
            data,
        }
    }

    // Record ids are minted from the millisecond clock; back-to-back
    // saves can otherwise collide on the same id.
    fn next_tick() {
        thread::sleep(Duration::from_millis(2));
    }

    #[test]
    fn test_save_stores_record_with_resolved_content() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let outcome = store.save(&data_msg("Fee Due", "Pay by 5th")).unwrap();
        assert!(outcome.is_stored());
        assert_eq!(outcome.title(), "Fee Due");
        assert_eq!(outcome.body(), "Pay by 5th");

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert!(!records[0].id.is_empty());
        assert_eq!(records[0].id, records[0].timestamp.to_string());
    }

    #[test]
    fn test_duplicate_save_is_suppressed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.save(&data_msg("A", "B")).unwrap().is_stored());
        next_tick();
        let second = store.save(&data_msg("A", "B")).unwrap();

        assert!(!second.is_stored());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_same_title_body_different_data_is_not_a_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut first = data_msg("A", "B");
        first.data.insert("route".to_string(), "/fees".to_string());
        let second = data_msg("A", "B");

        assert!(store.save(&first).unwrap().is_stored());
        next_tick();
        assert!(store.save(&second).unwrap().is_stored());
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (title, body) in [("A", "1"), ("B", "2"), ("C", "3")] {
            assert!(store.save(&data_msg(title, body)).unwrap().is_stored());
            next_tick();
        }

        let titles: Vec<String> = store.list().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_delete_by_id_records_id_marker_only() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&data_msg("A", "B")).unwrap();
        let id = store.list()[0].id.clone();

        store.delete(Some(&id), None, None).unwrap();
        assert!(store.list().is_empty());

        // Id markers match by id only: the re-delivery mints a fresh id,
        // so the same content is stored again.
        next_tick();
        assert!(store.save(&data_msg("A", "B")).unwrap().is_stored());
    }

    #[test]
    fn test_delete_by_content_tombstones_future_saves() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&data_msg("X", "Y")).unwrap();
        store.delete(None, Some("X"), Some("Y")).unwrap();
        assert!(store.list().is_empty());

        // Suppressed even though this (title, body, data) triple was
        // never stored before.
        next_tick();
        let mut other_data = data_msg("X", "Y");
        other_data
            .data
            .insert("route".to_string(), "/fees".to_string());
        assert!(!store.save(&other_data).unwrap().is_stored());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_delete_with_both_criteria_removes_independent_matches() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&data_msg("A", "1")).unwrap();
        next_tick();
        store.save(&data_msg("B", "2")).unwrap();
        next_tick();
        store.save(&data_msg("C", "3")).unwrap();

        let id_of_a = store.list()[0].id.clone();
        store.delete(Some(&id_of_a), Some("C"), Some("3")).unwrap();

        let titles: Vec<String> = store.list().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["B"]);
    }

    #[test]
    fn test_delete_with_no_criteria_is_a_noop_success() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&data_msg("A", "B")).unwrap();
        store.delete(None, None, None).unwrap();

        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_delete_of_unknown_id_succeeds() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&data_msg("A", "B")).unwrap();
        store.delete(Some("does-not-exist"), None, None).unwrap();

        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_clear_empties_history_but_keeps_markers() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&data_msg("X", "Y")).unwrap();
        store.delete(None, Some("X"), Some("Y")).unwrap();
        next_tick();
        store.save(&data_msg("A", "B")).unwrap();

        store.clear().unwrap();
        assert!(store.list().is_empty());

        // Content markers survive clear.
        next_tick();
        assert!(!store.save(&data_msg("X", "Y")).unwrap().is_stored());

        // Clearing again is fine.
        store.clear().unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_malformed_slot_reads_as_empty_and_recovers() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        {
            let prefs = store.prefs.lock().unwrap();
            prefs
                .put_strings(&[(KEY_NOTIFICATIONS, "{{{not valid json".to_string())])
                .unwrap();
        }

        assert!(store.list().is_empty());

        // A save re-initializes the slot to a single-element array.
        assert!(store.save(&data_msg("A", "B")).unwrap().is_stored());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_notification_block_is_used_when_data_has_no_text() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let msg = PushMessage {
            notification: Some(NotificationBlock {
                title: Some("Console Title".to_string()),
                body: Some("Console Body".to_string()),
            }),
            data: BTreeMap::new(),
        };

        let outcome = store.save(&msg).unwrap();
        assert_eq!(outcome.title(), "Console Title");
        assert_eq!(outcome.body(), "Console Body");
    }

    #[test]
    fn test_fee_due_scenario() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let outcome = store.save(&data_msg("Fee Due", "Pay by 5th")).unwrap();
        assert!(outcome.is_stored());

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Fee Due");
        assert_eq!(records[0].body, "Pay by 5th");

        // The webview deletes provider entries by content, which also
        // tombstones any re-delivery of the same text.
        store
            .delete(None, Some("Fee Due"), Some("Pay by 5th"))
            .unwrap();
        assert!(store.list().is_empty());

        next_tick();
        assert!(!store.save(&data_msg("Fee Due", "Pay by 5th")).unwrap().is_stored());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notifications.json");

        {
            let store = NotificationStore::new(path.clone());
            store.save(&data_msg("A", "B")).unwrap();
        }

        let reopened = NotificationStore::new(path);
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].title, "A");
    }
}
