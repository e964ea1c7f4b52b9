//! Record store seam
//!
//! The executor only needs two remote operations. Anything that can count and
//! search records by native predicates can back the assistant.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::BackendResult;
use crate::predicate::NativePredicate;

/// One record as returned by the store, field name to JSON value
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A bounded search against one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub entity: String,
    pub predicates: Vec<NativePredicate>,
    /// Empty means all fields
    pub fields: Vec<String>,
    pub limit: u32,
    pub order: Option<String>,
}

/// Read-only access to the remote record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Number of records of `entity` matching all predicates
    async fn count(&self, entity: &str, predicates: &[NativePredicate]) -> BackendResult<u64>;

    /// Records of `entity` matching all predicates, at most `request.limit`
    async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<Record>>;

    /// Store name for logging
    fn store_name(&self) -> &str;
}
