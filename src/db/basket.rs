//! A single basket: bounded request ring, response map and auth token
//! behind one per-basket lock.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::model::{
    BasketConfig, BasketInfo, RequestRecord, RequestsPage, RequestsQueryPage, ResponseSpec,
};

use super::{constant_time_eq, StoreError};

/// Serialized form of a basket, used by the shutdown flush and restore path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketSnapshot {
    pub name: String,
    pub token: String,
    pub config: BasketConfig,
    pub responses: HashMap<String, ResponseSpec>,
    /// Ring contents, newest-first.
    pub requests: Vec<RequestRecord>,
    #[serde(rename = "total_count")]
    pub total_count: u64,
}

struct BasketInner {
    config: BasketConfig,
    responses: HashMap<String, ResponseSpec>,
    /// Front is the newest record.
    requests: VecDeque<RequestRecord>,
    total_count: u64,
}

/// A named collection of captured requests.
///
/// All operations serialize on the per-basket lock; `total_count` moves
/// together with ring inserts under that lock, which makes the lock release
/// in `add` the linearization point for ingest.
pub struct Basket {
    name: String,
    token: String,
    inner: RwLock<BasketInner>,
}

impl Basket {
    pub fn new(name: String, token: String, config: BasketConfig) -> Self {
        Self {
            name,
            token,
            inner: RwLock::new(BasketInner {
                config,
                responses: HashMap::new(),
                requests: VecDeque::new(),
                total_count: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> BasketConfig {
        self.inner.read().config.clone()
    }

    /// Replaces the configuration. Shrinking the capacity truncates the
    /// ring from the tail, dropping the oldest records.
    pub fn update(&self, config: BasketConfig, max_capacity: usize) -> Result<(), StoreError> {
        config.validate(max_capacity)?;
        let mut inner = self.inner.write();
        inner.config = config;
        let capacity = inner.config.capacity;
        while inner.requests.len() > capacity {
            inner.requests.pop_back();
        }
        Ok(())
    }

    /// Compares a presented token against the basket's own in constant time.
    pub fn authorize(&self, token: &str) -> bool {
        constant_time_eq(token, &self.token)
    }

    pub fn get_response(&self, method: &str) -> Option<ResponseSpec> {
        self.inner.read().responses.get(method).cloned()
    }

    pub fn set_response(&self, method: &str, spec: ResponseSpec) -> Result<(), StoreError> {
        spec.validate()?;
        self.inner
            .write()
            .responses
            .insert(method.to_uppercase(), spec);
        Ok(())
    }

    pub fn delete_response(&self, method: &str) {
        self.inner.write().responses.remove(method);
    }

    /// Prepends a record, evicting the oldest when the ring is full.
    /// Returns the stored record.
    pub fn add(&self, record: RequestRecord) -> RequestRecord {
        let mut inner = self.inner.write();
        inner.requests.push_front(record.clone());
        let capacity = inner.config.capacity;
        while inner.requests.len() > capacity {
            inner.requests.pop_back();
        }
        inner.total_count += 1;
        record
    }

    /// Empties the ring. The total count is a lifetime figure and stays.
    pub fn clear(&self) {
        self.inner.write().requests.clear();
    }

    pub fn size(&self) -> usize {
        self.inner.read().requests.len()
    }

    pub fn total_count(&self) -> u64 {
        self.inner.read().total_count
    }

    /// Returns up to `max` records starting at offset `skip`, newest-first.
    pub fn get_requests(&self, max: usize, skip: usize) -> RequestsPage {
        let inner = self.inner.read();
        let count = inner.requests.len();
        let requests: Vec<RequestRecord> =
            inner.requests.iter().skip(skip).take(max).cloned().collect();
        let has_more = skip + requests.len() < count;
        RequestsPage {
            requests,
            count,
            total_count: inner.total_count,
            has_more,
        }
    }

    /// Scans the ring newest-first for records matching `query` in `scope`,
    /// skipping the first `skip` matches and returning up to `max`.
    /// The scan runs one match past the page end so `has_more` is truthful.
    pub fn find_requests(
        &self,
        query: &str,
        scope: &str,
        max: usize,
        skip: usize,
    ) -> RequestsQueryPage {
        let inner = self.inner.read();
        let mut requests = Vec::new();
        let mut has_more = false;
        let mut skipped = 0usize;

        for record in inner.requests.iter() {
            if !record.matches(query, scope) {
                continue;
            }
            if skipped < skip {
                skipped += 1;
                continue;
            }
            if requests.len() == max {
                has_more = true;
                break;
            }
            requests.push(record.clone());
        }

        RequestsQueryPage { requests, has_more }
    }

    /// Point-in-time snapshot for the stats reducer.
    pub fn info(&self) -> BasketInfo {
        let inner = self.inner.read();
        BasketInfo {
            name: self.name.clone(),
            requests_count: inner.requests.len(),
            requests_total_count: inner.total_count,
            last_request_date: inner.requests.front().map(|r| r.date).unwrap_or(0),
        }
    }

    /// Serializes the full basket state for the flush path.
    pub fn snapshot(&self) -> BasketSnapshot {
        let inner = self.inner.read();
        BasketSnapshot {
            name: self.name.clone(),
            token: self.token.clone(),
            config: inner.config.clone(),
            responses: inner.responses.clone(),
            requests: inner.requests.iter().cloned().collect(),
            total_count: inner.total_count,
        }
    }

    /// Rebuilds a basket from a snapshot, preserving token, responses,
    /// ring order and the lifetime counter.
    pub fn from_snapshot(snapshot: BasketSnapshot) -> Self {
        let capacity = snapshot.config.capacity;
        let mut requests: VecDeque<RequestRecord> = snapshot.requests.into();
        requests.truncate(capacity);
        Self {
            name: snapshot.name,
            token: snapshot.token,
            inner: RwLock::new(BasketInner {
                config: snapshot.config,
                responses: snapshot.responses,
                requests,
                total_count: snapshot.total_count,
            }),
        }
    }
}
