use crate::domain::symbol::Symbol;
use crate::storage::KeyValueStore;
use std::sync::Arc;

pub const RECENTS_KEY: &str = "pioni.recent_tickers";
pub const MAX_RECENTS: usize = 6;

/// Most-recent-first list of looked-up symbols, mirrored to a [`KeyValueStore`].
///
/// Persistence problems never surface to callers: a record that cannot be read
/// or parsed loads as an empty list, and failed writes only log.
///
/// Mutations apply to the in-memory list immediately and hand back a
/// [`PendingWrite`], so the blocking store IO can run outside any lock.
pub struct RecentsStore {
    backend: Arc<dyn KeyValueStore>,
    items: Vec<Symbol>,
}

impl RecentsStore {
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let items = match backend.read(RECENTS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Symbol>>(&raw) {
                Ok(mut items) => {
                    dedup_in_order(&mut items);
                    items.truncate(MAX_RECENTS);
                    items
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recents record is corrupt; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "recents record unreadable; starting empty");
                Vec::new()
            }
        };

        Self { backend, items }
    }

    pub fn list(&self) -> &[Symbol] {
        &self.items
    }

    pub fn push(&mut self, symbol: Symbol) -> PendingWrite {
        self.items.retain(|s| s != &symbol);
        self.items.insert(0, symbol);
        self.items.truncate(MAX_RECENTS);

        let op = match serde_json::to_string(&self.items) {
            Ok(json) => WriteOp::Replace(json),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode recents");
                WriteOp::Skip
            }
        };
        self.pending(op)
    }

    pub fn clear(&mut self) -> PendingWrite {
        self.items.clear();
        self.pending(WriteOp::Remove)
    }

    fn pending(&self, op: WriteOp) -> PendingWrite {
        PendingWrite {
            backend: self.backend.clone(),
            op,
        }
    }
}

enum WriteOp {
    Replace(String),
    Remove,
    Skip,
}

/// A recents change that has not reached the backing store yet.
#[must_use = "recents changes are only persisted once committed"]
pub struct PendingWrite {
    backend: Arc<dyn KeyValueStore>,
    op: WriteOp,
}

impl PendingWrite {
    /// Blocking: performs the store IO. Failures are logged and dropped.
    pub fn commit(self) {
        let res = match &self.op {
            WriteOp::Replace(json) => self.backend.write(RECENTS_KEY, json),
            WriteOp::Remove => self.backend.remove(RECENTS_KEY),
            WriteOp::Skip => Ok(()),
        };
        if let Err(e) = res {
            tracing::warn!(error = %e, "failed to persist recents");
        }
    }
}

fn dedup_in_order(items: &mut Vec<Symbol>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|s| seen.insert(s.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use tempfile::tempdir;

    fn sym(s: &str) -> Symbol {
        Symbol::admit(s).unwrap()
    }

    fn names(store: &RecentsStore) -> Vec<&str> {
        store.list().iter().map(Symbol::as_str).collect()
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }

        fn write(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn push_dedups_most_recent_first() {
        let mut store = RecentsStore::load(Arc::new(MemoryStore::new()));
        store.push(sym("AAPL")).commit();
        store.push(sym("AAPL")).commit();
        store.push(sym("MSFT")).commit();
        assert_eq!(names(&store), ["MSFT", "AAPL"]);

        store.push(sym("AAPL")).commit();
        assert_eq!(names(&store), ["AAPL", "MSFT"]);
    }

    #[test]
    fn seventh_symbol_drops_oldest() {
        let mut store = RecentsStore::load(Arc::new(MemoryStore::new()));
        for s in ["A", "B", "C", "D", "E", "F", "G"] {
            store.push(sym(s)).commit();
        }
        assert_eq!(names(&store), ["G", "F", "E", "D", "C", "B"]);
    }

    #[test]
    fn push_persists_and_reload_restores() {
        let backend = Arc::new(MemoryStore::new());
        let mut store = RecentsStore::load(backend.clone());
        store.push(sym("TSLA")).commit();
        store.push(sym("NVDA")).commit();

        assert_eq!(
            backend.read(RECENTS_KEY).unwrap().as_deref(),
            Some(r#"["NVDA","TSLA"]"#)
        );

        let reloaded = RecentsStore::load(backend);
        assert_eq!(names(&reloaded), ["NVDA", "TSLA"]);
    }

    #[test]
    fn store_is_untouched_until_commit() {
        let backend = Arc::new(MemoryStore::new());
        let mut store = RecentsStore::load(backend.clone());

        let write = store.push(sym("AAPL"));
        assert_eq!(names(&store), ["AAPL"]);
        assert_eq!(backend.read(RECENTS_KEY).unwrap(), None);

        write.commit();
        assert_eq!(backend.read(RECENTS_KEY).unwrap().as_deref(), Some(r#"["AAPL"]"#));
    }

    #[test]
    fn clear_empties_and_removes_record() {
        let backend = Arc::new(MemoryStore::new());
        let mut store = RecentsStore::load(backend.clone());
        store.push(sym("TSLA")).commit();
        store.clear().commit();

        assert!(store.list().is_empty());
        assert_eq!(backend.read(RECENTS_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_record_loads_empty() {
        for raw in ["not json {{{", r#"{"a":1}"#, r#"["aapl"]"#, r#"["TOOLONG"]"#] {
            let store = RecentsStore::load(Arc::new(MemoryStore::with_record(RECENTS_KEY, raw)));
            assert!(store.list().is_empty(), "{raw} should load empty");
        }
    }

    #[test]
    fn oversized_record_is_capped_and_deduped() {
        let raw = r#"["A","B","A","C","D","E","F","G","H"]"#;
        let store = RecentsStore::load(Arc::new(MemoryStore::with_record(RECENTS_KEY, raw)));
        assert_eq!(names(&store), ["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn backend_failures_degrade_silently() {
        let mut store = RecentsStore::load(Arc::new(BrokenStore));
        assert!(store.list().is_empty());

        store.push(sym("AAPL")).commit();
        assert_eq!(names(&store), ["AAPL"]);

        store.clear().commit();
        assert!(store.list().is_empty());
    }

    #[test]
    fn survives_restart_on_disk() {
        let dir = tempdir().unwrap();
        {
            let mut store = RecentsStore::load(Arc::new(FileStore::new(dir.path())));
            store.push(sym("AMD")).commit();
            store.push(sym("LIMIT")).commit();
        }
        let store = RecentsStore::load(Arc::new(FileStore::new(dir.path())));
        assert_eq!(names(&store), ["LIMIT", "AMD"]);
    }
}
