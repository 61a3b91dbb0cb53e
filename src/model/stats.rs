//! Service-level statistics with bounded top-K tracking.

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of one basket, as fed to the stats reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketInfo {
    pub name: String,
    /// Current ring length.
    #[serde(rename = "requests_count")]
    pub requests_count: usize,
    /// Requests ever accepted.
    #[serde(rename = "requests_total_count")]
    pub requests_total_count: u64,
    /// Capture time of the newest request, milliseconds since epoch; 0 when empty.
    #[serde(rename = "last_request_date")]
    pub last_request_date: i64,
}

/// Aggregated statistics over all baskets in a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    #[serde(rename = "baskets_count")]
    pub baskets_count: usize,
    #[serde(rename = "empty_baskets_count")]
    pub empty_baskets_count: usize,
    #[serde(rename = "requests_count")]
    pub requests_count: usize,
    #[serde(rename = "requests_total_count")]
    pub requests_total_count: u64,
    #[serde(rename = "max_basket_size")]
    pub max_basket_size: u64,
    #[serde(rename = "avg_basket_size")]
    pub avg_basket_size: u64,
    /// The K snapshots with the largest total count, descending.
    #[serde(rename = "top_baskets_size")]
    pub top_baskets_size: Vec<BasketInfo>,
    /// The K snapshots with the most recent last request, descending.
    #[serde(rename = "top_baskets_recent")]
    pub top_baskets_recent: Vec<BasketInfo>,

    #[serde(skip)]
    top_k: usize,
}

impl DatabaseStats {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    /// Folds one basket snapshot into the aggregate.
    pub fn collect(&mut self, info: BasketInfo) {
        self.baskets_count += 1;
        if info.requests_total_count == 0 {
            self.empty_baskets_count += 1;
        }
        self.requests_count += info.requests_count;
        self.requests_total_count += info.requests_total_count;
        if info.requests_total_count > self.max_basket_size {
            self.max_basket_size = info.requests_total_count;
        }

        insert_top(&mut self.top_baskets_size, self.top_k, &info, |new, old| {
            new.requests_total_count > old.requests_total_count
        });
        insert_top(&mut self.top_baskets_recent, self.top_k, &info, |new, old| {
            new.last_request_date > old.last_request_date
        });
    }

    /// Computes derived values after the last `collect` call.
    /// The average is integer division over non-empty baskets.
    pub fn finish(&mut self) {
        let populated = self.baskets_count - self.empty_baskets_count;
        self.avg_basket_size = if populated > 0 {
            self.requests_total_count / populated as u64
        } else {
            0
        };
    }
}

/// Insertion-sorts `item` into a list bounded at `cap` entries.
///
/// The comparator must be a strict preference so that ties keep the
/// earlier-seen entry. A full list with no preferred position drops the item;
/// an insertion into a full list discards the old tail.
fn insert_top<F>(list: &mut Vec<BasketInfo>, cap: usize, item: &BasketInfo, prefer: F)
where
    F: Fn(&BasketInfo, &BasketInfo) -> bool,
{
    if cap == 0 {
        return;
    }

    match list.iter().position(|old| prefer(item, old)) {
        Some(pos) => {
            list.insert(pos, item.clone());
            if list.len() > cap {
                list.pop();
            }
        }
        None => {
            if list.len() < cap {
                list.push(item.clone());
            }
        }
    }
}
