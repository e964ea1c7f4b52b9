//! Fallback Controller
//!
//! A filtered search that finds nothing is retried once with every predicate
//! dropped and a small limit, so the user sees something plausible instead of
//! a bare "not found". Rows from that retry are flagged `is_fallback`.

use serde::Serialize;
use tracing::info;

use super::{QueryExecutor, Record, SearchRequest};
use crate::error::BackendResult;

/// Upper bound on rows returned by the unfiltered retry
pub const MAX_FALLBACK_LIMIT: u32 = 5;

/// Which search produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStage {
    Primary,
    Fallback,
}

/// Rows from a search, possibly approximate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Record>,
    pub is_fallback: bool,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stage(&self) -> SearchStage {
        if self.is_fallback {
            SearchStage::Fallback
        } else {
            SearchStage::Primary
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FallbackController {
    limit: u32,
}

impl Default for FallbackController {
    fn default() -> Self {
        Self::new(MAX_FALLBACK_LIMIT)
    }
}

impl FallbackController {
    /// `limit` is clamped to `1..=MAX_FALLBACK_LIMIT`
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_FALLBACK_LIMIT),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Primary search, then at most one unfiltered retry
    pub async fn search(
        &self,
        executor: &QueryExecutor,
        request: &SearchRequest,
    ) -> BackendResult<QueryResult> {
        let rows = executor.search(request).await?;
        if !rows.is_empty() || request.predicates.is_empty() {
            return Ok(QueryResult {
                rows,
                is_fallback: false,
            });
        }

        info!(
            "No {} rows matched {} predicate(s); retrying unfiltered",
            request.entity,
            request.predicates.len()
        );
        let retry = SearchRequest {
            predicates: Vec::new(),
            limit: self.limit.min(request.limit.max(1)),
            ..request.clone()
        };
        let rows = executor.search(&retry).await?;
        Ok(QueryResult {
            is_fallback: !rows.is_empty(),
            rows,
        })
    }
}
