// Package db provides the basket store abstraction and its drivers.

pub mod basket;
pub mod dumper;
pub mod memory;

#[cfg(test)]
mod basket_test;

use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::sync::Arc;

use crate::model::{
    BasketConfig, BasketNamesPage, BasketNamesQueryPage, DatabaseStats,
};

pub use basket::{Basket, BasketSnapshot};
pub use dumper::Dumper;
pub use memory::MemoryDatabase;

/// Number of characters in a freshly minted basket token.
/// 24 alphanumeric characters carry ~142 bits of entropy.
pub const TOKEN_CHARS: usize = 24;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,250}$").expect("name pattern is well-formed"));

/// Store-level error kinds surfaced to admin callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid basket name: {0}")]
    InvalidName(String),
    #[error("basket name is reserved: {0}")]
    ReservedName(String),
    #[error("basket already exists: {0}")]
    Conflict(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("basket not found: {0}")]
    NotFound(String),
    #[error("store is closed")]
    Closed,
}

/// Named collection of baskets, polymorphic over persistence.
///
/// Conforming drivers present identical observable semantics whether backed
/// by volatile memory or a persisted snapshot: after a successful
/// `create(n, c)` and before a concurrent `delete(n)`, `get(n)` returns a
/// basket whose config equals `c`; listings are stable and lexicographic
/// within one store instance.
pub trait BasketsDatabase: Send + Sync {
    /// Allocates a basket under a unique name and returns its freshly
    /// minted authorization token. The token is never readable again.
    fn create(&self, name: &str, config: BasketConfig) -> Result<String, StoreError>;

    fn get(&self, name: &str) -> Result<Option<Arc<Basket>>, StoreError>;

    /// Removes a basket and releases its storage. Unknown names are a no-op.
    fn delete(&self, name: &str) -> Result<(), StoreError>;

    fn size(&self) -> usize;

    /// Basket names in stable lexicographic order.
    fn get_names(&self, max: usize, skip: usize) -> Result<BasketNamesPage, StoreError>;

    /// Basket names containing `query` as a substring, same stable order.
    fn find_names(&self, query: &str, max: usize, skip: usize)
        -> Result<BasketNamesQueryPage, StoreError>;

    /// Rolls all baskets up into aggregate statistics with top-K lists
    /// bounded at `max` entries.
    fn get_stats(&self, max: usize) -> Result<DatabaseStats, StoreError>;

    /// Serializes every basket for a best-effort flush.
    fn snapshot(&self) -> Result<Vec<BasketSnapshot>, StoreError>;

    /// Rebuilds baskets from a previously taken snapshot.
    fn restore(&self, snapshots: Vec<BasketSnapshot>) -> Result<(), StoreError>;

    /// Closes backing resources; subsequent operations fail with `Closed`.
    fn release(&self) -> Result<(), StoreError>;
}

/// Validates a basket name against `[A-Za-z0-9_-]{1,250}`.
pub fn valid_basket_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Mints a high-entropy URL-safe basket token.
pub fn mint_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_CHARS)
        .map(char::from)
        .collect()
}

/// Compares two tokens without leaking the mismatch position through timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
