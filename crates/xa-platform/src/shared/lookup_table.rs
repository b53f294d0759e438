//! Snapshot Lookup Table
//!
//! Read-mostly map from id to entity, rebuilt wholesale from its backing
//! store. A refresh builds the complete map first and then swaps it in, so
//! readers only ever see a whole snapshot. Entries are shared `Arc`s and never
//! mutated in place.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::shared::error::Result;

/// Entity that can be indexed by a string key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Backing store a table is rebuilt from.
#[async_trait]
pub trait TableSource<T>: Send + Sync {
    async fn load_all(&self) -> Result<Vec<T>>;
}

type Snapshot<T> = Arc<HashMap<String, Arc<T>>>;

pub struct LookupTable<T> {
    name: &'static str,
    source: Arc<dyn TableSource<T>>,
    snapshot: RwLock<Snapshot<T>>,
}

impl<T> LookupTable<T>
where
    T: Keyed + Send + Sync + 'static,
{
    /// Create an empty table. Nothing is loaded until the first miss or refresh.
    pub fn new(name: &'static str, source: Arc<dyn TableSource<T>>) -> Self {
        Self {
            name,
            source,
            snapshot: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Look up by key. A miss triggers exactly one refresh before giving up.
    /// Misses are not remembered, so the next miss refreshes again.
    pub async fn get(&self, key: &str) -> Result<Option<Arc<T>>> {
        if let Some(hit) = self.current().get(key) {
            return Ok(Some(hit.clone()));
        }

        debug!(table = self.name, key, "Lookup miss, refreshing");
        self.refresh().await?;
        Ok(self.current().get(key).cloned())
    }

    /// First entry matching `predicate`: scan, refresh on a miss, scan again.
    pub async fn find<P>(&self, predicate: P) -> Result<Option<Arc<T>>>
    where
        P: Fn(&T) -> bool + Send,
    {
        if let Some(hit) = scan(&self.current(), &predicate) {
            return Ok(Some(hit));
        }

        debug!(table = self.name, "Scan miss, refreshing");
        self.refresh().await?;
        Ok(scan(&self.current(), &predicate))
    }

    /// Reload every record from the source and swap the snapshot.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<usize> {
        let records = self.source.load_all().await?;

        let table: HashMap<String, Arc<T>> = records
            .into_iter()
            .map(|record| (record.key().to_string(), Arc::new(record)))
            .collect();
        let count = table.len();

        *self.snapshot.write() = Arc::new(table);

        info!(table = self.name, count, "Lookup table refreshed");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    fn current(&self) -> Snapshot<T> {
        self.snapshot.read().clone()
    }
}

fn scan<T, P>(snapshot: &HashMap<String, Arc<T>>, predicate: &P) -> Option<Arc<T>>
where
    P: Fn(&T) -> bool,
{
    snapshot.values().find(|entry| predicate(entry)).cloned()
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory table source that counts loads.

    use super::*;
    use crate::shared::error::PlatformError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct VecSource<T> {
        records: Mutex<Vec<T>>,
        loads: AtomicUsize,
        fail: Mutex<Option<String>>,
    }

    impl<T: Clone> VecSource<T> {
        pub fn new(records: Vec<T>) -> Self {
            Self {
                records: Mutex::new(records),
                loads: AtomicUsize::new(0),
                fail: Mutex::new(None),
            }
        }

        pub fn set(&self, records: Vec<T>) {
            *self.records.lock() = records;
        }

        pub fn fail_with(&self, message: &str) {
            *self.fail.lock() = Some(message.to_string());
        }

        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<T: Clone + Send + Sync> TableSource<T> for VecSource<T> {
        async fn load_all(&self) -> Result<Vec<T>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = self.fail.lock().clone() {
                return Err(PlatformError::internal(message));
            }
            Ok(self.records.lock().clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::VecSource;
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: String,
        group: u32,
    }

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str, group: u32) -> Item {
        Item { id: id.to_string(), group }
    }

    #[tokio::test]
    async fn test_cold_miss_refreshes_once() {
        let source = Arc::new(VecSource::new(vec![item("a", 1)]));
        let table = LookupTable::new("items", source.clone());

        assert!(table.get("missing").await.unwrap().is_none());
        assert_eq!(source.loads(), 1);

        // No negative caching
        assert!(table.get("missing").await.unwrap().is_none());
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn test_hit_does_not_refresh() {
        let source = Arc::new(VecSource::new(vec![item("a", 1)]));
        let table = LookupTable::new("items", source.clone());
        table.refresh().await.unwrap();

        let hit = table.get("a").await.unwrap().unwrap();
        assert_eq!(hit.group, 1);
        assert_eq!(source.loads(), 1);
    }

    #[tokio::test]
    async fn test_find_picks_up_new_records_after_refresh() {
        let source = Arc::new(VecSource::new(vec![item("a", 1)]));
        let table = LookupTable::new("items", source.clone());
        table.refresh().await.unwrap();

        source.set(vec![item("a", 1), item("b", 2)]);
        let found = table.find(|i| i.group == 2).await.unwrap();
        assert_eq!(found.map(|i| i.id.clone()), Some("b".to_string()));
        assert_eq!(source.loads(), 2);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_whole_snapshot() {
        let source = Arc::new(VecSource::new(vec![item("a", 1), item("b", 1)]));
        let table = LookupTable::new("items", source.clone());
        assert_eq!(table.refresh().await.unwrap(), 2);

        source.set(vec![item("c", 3)]);
        assert_eq!(table.refresh().await.unwrap(), 1);
        assert!(table.find(|i| i.id == "a").await.unwrap().is_none());
        assert!(!table.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let source = Arc::new(VecSource::new(vec![item("a", 1)]));
        let table = LookupTable::new("items", source.clone());
        table.refresh().await.unwrap();

        source.fail_with("store down");
        assert!(table.refresh().await.is_err());
        assert_eq!(table.len(), 1);
        assert!(table.get("missing").await.is_err());
    }
}
