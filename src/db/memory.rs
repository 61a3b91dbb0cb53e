//! Volatile in-memory basket store.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::model::{
    BasketConfig, BasketNamesPage, BasketNamesQueryPage, DatabaseStats,
};

use super::basket::{Basket, BasketSnapshot};
use super::{mint_token, valid_basket_name, BasketsDatabase, StoreError};

/// Memory driver: a name-to-basket map behind a store-level lock.
///
/// The store lock is held only for lookup, insert and remove; per-basket
/// work happens on the basket's own lock after the store lock is dropped.
pub struct MemoryDatabase {
    baskets: RwLock<BTreeMap<String, Arc<Basket>>>,
    reserved: HashSet<String>,
    max_capacity: usize,
    default_capacity: usize,
    closed: AtomicBool,
}

impl MemoryDatabase {
    pub fn new(reserved: Vec<String>, max_capacity: usize, default_capacity: usize) -> Self {
        Self {
            baskets: RwLock::new(BTreeMap::new()),
            reserved: reserved.into_iter().collect(),
            max_capacity,
            default_capacity,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl BasketsDatabase for MemoryDatabase {
    fn create(&self, name: &str, mut config: BasketConfig) -> Result<String, StoreError> {
        self.ensure_open()?;

        if !valid_basket_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if self.reserved.contains(name) {
            return Err(StoreError::ReservedName(name.to_string()));
        }
        if config.capacity == 0 {
            config.capacity = self.default_capacity;
        }
        config.validate(self.max_capacity)?;

        let token = mint_token();
        let basket = Arc::new(Basket::new(name.to_string(), token.clone(), config));

        let mut baskets = self.baskets.write();
        if baskets.contains_key(name) {
            return Err(StoreError::Conflict(name.to_string()));
        }
        baskets.insert(name.to_string(), basket);
        drop(baskets);

        info!(
            component = "db",
            driver = "memory",
            event = "basket_created",
            basket = name,
            "basket created"
        );
        Ok(token)
    }

    fn get(&self, name: &str) -> Result<Option<Arc<Basket>>, StoreError> {
        self.ensure_open()?;
        Ok(self.baskets.read().get(name).cloned())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let removed = self.baskets.write().remove(name);
        if removed.is_some() {
            info!(
                component = "db",
                driver = "memory",
                event = "basket_deleted",
                basket = name,
                "basket deleted"
            );
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.baskets.read().len()
    }

    fn get_names(&self, max: usize, skip: usize) -> Result<BasketNamesPage, StoreError> {
        self.ensure_open()?;
        let baskets = self.baskets.read();
        let count = baskets.len();
        let names: Vec<String> = baskets.keys().skip(skip).take(max).cloned().collect();
        let has_more = skip + names.len() < count;
        Ok(BasketNamesPage {
            names,
            count,
            has_more,
        })
    }

    fn find_names(
        &self,
        query: &str,
        max: usize,
        skip: usize,
    ) -> Result<BasketNamesQueryPage, StoreError> {
        self.ensure_open()?;
        let baskets = self.baskets.read();
        let mut names = Vec::new();
        let mut has_more = false;
        let mut skipped = 0usize;

        for name in baskets.keys() {
            if !name.contains(query) {
                continue;
            }
            if skipped < skip {
                skipped += 1;
                continue;
            }
            if names.len() == max {
                has_more = true;
                break;
            }
            names.push(name.clone());
        }

        Ok(BasketNamesQueryPage { names, has_more })
    }

    fn get_stats(&self, max: usize) -> Result<DatabaseStats, StoreError> {
        self.ensure_open()?;

        // Snapshot the handles first so no per-basket lock is taken while
        // the store lock is held.
        let handles: Vec<Arc<Basket>> = self.baskets.read().values().cloned().collect();

        let mut stats = DatabaseStats::new(max);
        for basket in handles {
            stats.collect(basket.info());
        }
        stats.finish();
        Ok(stats)
    }

    fn snapshot(&self) -> Result<Vec<BasketSnapshot>, StoreError> {
        self.ensure_open()?;
        let handles: Vec<Arc<Basket>> = self.baskets.read().values().cloned().collect();
        Ok(handles.iter().map(|b| b.snapshot()).collect())
    }

    fn restore(&self, snapshots: Vec<BasketSnapshot>) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut baskets = self.baskets.write();
        for snapshot in snapshots {
            let basket = Basket::from_snapshot(snapshot);
            baskets.insert(basket.name().to_string(), Arc::new(basket));
        }
        Ok(())
    }

    fn release(&self) -> Result<(), StoreError> {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        if !was_closed {
            self.baskets.write().clear();
            info!(
                component = "db",
                driver = "memory",
                event = "released",
                "store released"
            );
        }
        Ok(())
    }
}
