//! Processed-email ledger and its file store.
//! Saved as a pretty JSON array.
//! Writes go to a sibling temp file that is fsynced and renamed into place.

use rsvp_core::error::{Result, RsvpError};
use rsvp_core::types::RecipientId;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Every identity that has been sent a reply. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeSet<RecipientId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &RecipientId) -> bool {
        self.entries.contains(id)
    }

    /// Record a successful send. Returns `false` if it was already there.
    pub fn insert(&mut self, id: RecipientId) -> bool {
        self.entries.insert(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &RecipientId> {
        self.entries.iter()
    }
}

impl FromIterator<RecipientId> for Ledger {
    fn from_iter<I: IntoIterator<Item = RecipientId>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// File-backed ledger persistence.
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger. Never fails: a missing file is a fresh start, and an
    /// unreadable or corrupt one is logged and treated as empty.
    pub fn load(&self) -> Ledger {
        match self.try_load() {
            Ok(Some(ledger)) => {
                tracing::info!(
                    "📁 Loaded {} processed emails from {}",
                    ledger.len(),
                    self.path.display()
                );
                ledger
            }
            Ok(None) => {
                tracing::info!(
                    "📁 No ledger at {}, starting with an empty one",
                    self.path.display()
                );
                Ledger::new()
            }
            Err(e) => {
                tracing::warn!("⚠️ {e}; already-notified guests may be emailed again");
                Ledger::new()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Ledger>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RsvpError::LoadDegraded(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let raw: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            RsvpError::LoadDegraded(format!("Failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(
            raw.iter().filter_map(|s| RecipientId::normalize(s)).collect(),
        ))
    }

    /// Overwrite the file with the full ledger.
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        self.write_atomic(ledger)
            .map_err(|e| RsvpError::PersistFailed(format!("{}: {e}", self.path.display())))?;
        tracing::info!(
            "💾 Saved {} processed emails to {}",
            ledger.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_atomic(&self, ledger: &Ledger) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let entries: Vec<&str> = ledger.iter().map(RecipientId::as_str).collect();
        let json = serde_json::to_string_pretty(&entries)?;

        let tmp = self.temp_path();
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RecipientId {
        RecipientId::normalize(s).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("processed_emails.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_emails.json");
        std::fs::write(&path, "[\"a@x.com\", ").unwrap();
        assert!(LedgerStore::new(&path).load().is_empty());

        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(LedgerStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("nested").join("processed_emails.json"));

        let ledger: Ledger = [id("c@x.com"), id("a@x.com")].into_iter().collect();
        store.save(&ledger).unwrap();

        let reloaded = store.load();
        assert_eq!(reloaded, ledger);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_file_is_sorted_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_emails.json");
        let store = LedgerStore::new(&path);

        let ledger: Ledger = [id("c@x.com"), id("a@x.com")].into_iter().collect();
        store.save(&ledger).unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["a@x.com", "c@x.com"]);
    }

    #[test]
    fn test_load_normalizes_hand_edited_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_emails.json");
        std::fs::write(&path, r#"[" Alice@X.com", "", "alice@x.com", "b@x.com"]"#).unwrap();

        let ledger = LedgerStore::new(&path).load();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&id("alice@x.com")));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("processed_emails.json"));
        store.save(&[id("a@x.com")].into_iter().collect()).unwrap();
        store
            .save(&[id("a@x.com"), id("b@x.com")].into_iter().collect())
            .unwrap();
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // parent "directory" is a regular file
        let store = LedgerStore::new(blocker.join("processed_emails.json"));
        assert!(matches!(
            store.save(&Ledger::new()),
            Err(RsvpError::PersistFailed(_))
        ));
    }

    #[test]
    fn test_insert_reports_novelty() {
        let mut ledger = Ledger::new();
        assert!(ledger.insert(id("a@x.com")));
        assert!(!ledger.insert(id("A@X.com ")));
        assert_eq!(ledger.len(), 1);
    }
}
