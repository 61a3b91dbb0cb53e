//! Tests for the bounded request ring and per-basket operations.

#[cfg(test)]
mod tests {
    use crate::db::Basket;
    use crate::model::{BasketConfig, RequestRecord, ResponseSpec};

    const MAX_CAPACITY: usize = 2000;

    fn make_basket(capacity: usize) -> Basket {
        let config = BasketConfig {
            capacity,
            ..BasketConfig::default()
        };
        Basket::new("b1".to_string(), "secret-token".to_string(), config)
    }

    fn make_record(body: &str) -> RequestRecord {
        RequestRecord {
            date: 1700000000000,
            method: "POST".to_string(),
            path: "/b1".to_string(),
            query: String::new(),
            headers: Default::default(),
            content_length: body.len() as i64,
            body: body.to_string(),
            truncated: false,
        }
    }

    fn page_bodies(basket: &Basket, max: usize, skip: usize) -> Vec<String> {
        basket
            .get_requests(max, skip)
            .requests
            .into_iter()
            .map(|r| r.body)
            .collect()
    }

    #[test]
    fn test_add_keeps_newest_first_and_evicts_tail() {
        let basket = make_basket(3);
        for body in ["a", "b", "c", "d"] {
            basket.add(make_record(body));
        }

        let page = basket.get_requests(10, 0);
        let bodies: Vec<&str> = page.requests.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["d", "c", "b"]);
        assert_eq!(page.count, 3);
        assert_eq!(page.total_count, 4);
        assert!(!page.has_more);
    }

    #[test]
    fn test_clear_empties_ring_but_keeps_total() {
        let basket = make_basket(5);
        for body in ["a", "b", "c"] {
            basket.add(make_record(body));
        }

        basket.clear();

        assert_eq!(basket.size(), 0);
        assert_eq!(basket.total_count(), 3);
    }

    #[test]
    fn test_capacity_shrink_truncates_oldest() {
        let basket = make_basket(5);
        for body in ["a", "b", "c", "d", "e"] {
            basket.add(make_record(body));
        }

        let config = BasketConfig {
            capacity: 2,
            ..BasketConfig::default()
        };
        basket.update(config, MAX_CAPACITY).expect("shrink must succeed");

        assert_eq!(page_bodies(&basket, 10, 0), vec!["e", "d"]);
        assert_eq!(basket.total_count(), 5);
    }

    #[test]
    fn test_update_rejects_invalid_config() {
        let basket = make_basket(5);
        let config = BasketConfig {
            capacity: 0,
            ..BasketConfig::default()
        };
        assert!(basket.update(config, MAX_CAPACITY).is_err());
        // The old config survives a failed update.
        assert_eq!(basket.config().capacity, 5);
    }

    #[test]
    fn test_pagination_walks_the_full_ring() {
        let basket = make_basket(10);
        for i in 0..7 {
            basket.add(make_record(&format!("r{}", i)));
        }

        let mut collected = Vec::new();
        let mut skip = 0;
        loop {
            let page = basket.get_requests(3, skip);
            skip += page.requests.len();
            let done = !page.has_more;
            collected.extend(page.requests.into_iter().map(|r| r.body));
            if done {
                break;
            }
        }

        let expected: Vec<String> = (0..7).rev().map(|i| format!("r{}", i)).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_get_requests_has_more_is_offset_aware() {
        let basket = make_basket(10);
        for i in 0..5 {
            basket.add(make_record(&format!("r{}", i)));
        }

        assert!(basket.get_requests(2, 0).has_more);
        assert!(basket.get_requests(2, 2).has_more);
        assert!(!basket.get_requests(2, 4).has_more);
        assert!(!basket.get_requests(10, 0).has_more);
    }

    #[test]
    fn test_find_requests_filters_in_ring_order() {
        let basket = make_basket(10);
        basket.add(make_record("alpha one"));
        basket.add(make_record("beta"));
        basket.add(make_record("alpha two"));

        let page = basket.find_requests("alpha", "", 10, 0);
        let bodies: Vec<&str> = page.requests.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["alpha two", "alpha one"]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_find_requests_scans_one_past_the_page() {
        let basket = make_basket(10);
        for i in 0..4 {
            basket.add(make_record(&format!("match {}", i)));
        }
        basket.add(make_record("other"));

        let page = basket.find_requests("match", "", 2, 0);
        assert_eq!(page.requests.len(), 2);
        assert!(page.has_more);

        let page = basket.find_requests("match", "", 2, 2);
        assert_eq!(page.requests.len(), 2);
        assert!(!page.has_more);

        let page = basket.find_requests("match", "", 10, 4);
        assert!(page.requests.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_authorize_accepts_only_the_exact_token() {
        let basket = make_basket(3);
        assert!(basket.authorize("secret-token"));
        assert!(!basket.authorize("secret-toke"));
        assert!(!basket.authorize("secret-tokeN"));
        assert!(!basket.authorize(""));
    }

    #[test]
    fn test_set_response_validates_and_uppercases() {
        let basket = make_basket(3);
        let spec = ResponseSpec {
            status: 42,
            ..ResponseSpec::default()
        };
        assert!(basket.set_response("get", spec).is_err());

        let spec = ResponseSpec {
            status: 201,
            body: "created".to_string(),
            ..ResponseSpec::default()
        };
        basket.set_response("get", spec).expect("valid response spec");

        let stored = basket.get_response("GET").expect("stored under GET");
        assert_eq!(stored.status, 201);
        assert_eq!(stored.body, "created");
    }

    #[test]
    fn test_wildcard_response_entry() {
        let basket = make_basket(3);
        let spec = ResponseSpec {
            status: 418,
            body: "any method".to_string(),
            ..ResponseSpec::default()
        };
        basket.set_response("", spec).expect("valid response spec");

        assert_eq!(basket.get_response("").map(|s| s.status), Some(418));
        // No method-specific entry was created along the way.
        assert!(basket.get_response("GET").is_none());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_state() {
        let basket = make_basket(3);
        for body in ["a", "b", "c", "d"] {
            basket.add(make_record(body));
        }
        basket
            .set_response(
                "POST",
                ResponseSpec {
                    status: 202,
                    ..ResponseSpec::default()
                },
            )
            .expect("valid response spec");

        let restored = Basket::from_snapshot(basket.snapshot());

        assert_eq!(restored.name(), "b1");
        assert!(restored.authorize("secret-token"));
        assert_eq!(restored.total_count(), 4);
        assert_eq!(page_bodies(&restored, 10, 0), vec!["d", "c", "b"]);
        assert_eq!(restored.get_response("POST").map(|s| s.status), Some(202));
    }

    #[test]
    fn test_info_reflects_ring_state() {
        let basket = make_basket(2);
        assert_eq!(basket.info().requests_total_count, 0);
        assert_eq!(basket.info().last_request_date, 0);

        for body in ["a", "b", "c"] {
            basket.add(make_record(body));
        }

        let info = basket.info();
        assert_eq!(info.name, "b1");
        assert_eq!(info.requests_count, 2);
        assert_eq!(info.requests_total_count, 3);
        assert_eq!(info.last_request_date, 1700000000000);
    }
}
