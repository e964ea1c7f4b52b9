//! Query Executor
//!
//! Issues `Count` and `Search` against the record store. The row limit is
//! clamped here no matter what the action asked for.

pub mod fallback;
pub mod store;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::HARD_LIMIT_CAP;
use crate::error::BackendResult;
use crate::predicate::NativePredicate;

pub use fallback::{FallbackController, QueryResult, SearchStage, MAX_FALLBACK_LIMIT};
pub use store::{Record, RecordStore, SearchRequest};

/// Runs bounded queries against a [`RecordStore`]
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn RecordStore>,
    max_limit: u32,
}

impl QueryExecutor {
    /// `max_limit` is itself capped at [`HARD_LIMIT_CAP`]
    pub fn new(store: Arc<dyn RecordStore>, max_limit: u32) -> Self {
        Self {
            store,
            max_limit: max_limit.clamp(1, HARD_LIMIT_CAP),
        }
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn store_name(&self) -> &str {
        self.store.store_name()
    }

    pub async fn count(&self, entity: &str, predicates: &[NativePredicate]) -> BackendResult<u64> {
        debug!(
            "Counting {} on {} with {} predicate(s)",
            entity,
            self.store.store_name(),
            predicates.len()
        );
        let result = self.store.count(entity, predicates).await;
        match &result {
            Ok(count) => info!("Count {} = {}", entity, count),
            Err(e) => warn!("Count on {} failed: {}", entity, e),
        }
        result
    }

    pub async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<Record>> {
        let limit = request.limit.clamp(1, self.max_limit);
        if limit != request.limit {
            debug!("Clamped limit {} -> {}", request.limit, limit);
        }
        let bounded = SearchRequest {
            limit,
            ..request.clone()
        };

        debug!(
            "Searching {} on {}: {} predicate(s), fields={:?}, limit={}, order={:?}",
            bounded.entity,
            self.store.store_name(),
            bounded.predicates.len(),
            bounded.fields,
            bounded.limit,
            bounded.order
        );
        let result = self.store.search(&bounded).await;
        match &result {
            Ok(rows) => info!("Search {} returned {} row(s)", bounded.entity, rows.len()),
            Err(e) => warn!("Search on {} failed: {}", bounded.entity, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        limits: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl RecordStore for RecordingStore {
        async fn count(&self, _entity: &str, _predicates: &[NativePredicate]) -> BackendResult<u64> {
            Ok(3)
        }

        async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<Record>> {
            self.limits.lock().unwrap().push(request.limit);
            Ok(Vec::new())
        }

        fn store_name(&self) -> &str {
            "recording"
        }
    }

    fn request(limit: u32) -> SearchRequest {
        SearchRequest {
            entity: "res.partner".to_string(),
            predicates: vec![],
            fields: vec![],
            limit,
            order: None,
        }
    }

    #[tokio::test]
    async fn test_limit_clamped_to_ceiling() {
        let store = Arc::new(RecordingStore::default());
        let executor = QueryExecutor::new(store.clone(), 50);
        executor.search(&request(1000)).await.unwrap();
        executor.search(&request(0)).await.unwrap();
        executor.search(&request(20)).await.unwrap();
        assert_eq!(*store.limits.lock().unwrap(), vec![50, 1, 20]);
    }

    #[test]
    fn test_configured_ceiling_never_exceeds_hard_cap() {
        let executor = QueryExecutor::new(Arc::new(RecordingStore::default()), 10_000);
        assert_eq!(executor.max_limit(), HARD_LIMIT_CAP);
    }

    #[tokio::test]
    async fn test_count_passes_through() {
        let executor = QueryExecutor::new(Arc::new(RecordingStore::default()), 100);
        assert_eq!(executor.count("res.partner", &[]).await.unwrap(), 3);
    }
}
