//! In-memory collaborators for pipeline scenarios
//!
//! `ScriptedLlm` replays canned replies and records every call;
//! `ScriptedStore` replays canned counts and row batches and records every
//! request that reaches it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use erp_assistant::agentic::{ConversationTurn, LlmClient};
use erp_assistant::config::PipelineConfig;
use erp_assistant::error::{BackendError, BackendResult, ServiceError, ServiceResult};
use erp_assistant::executor::{Record, RecordStore, SearchRequest};
use erp_assistant::pipeline::AssistantPipeline;
use erp_assistant::predicate::NativePredicate;
use erp_assistant::schema::{RoleContext, RoleDirectory, SchemaCatalog};

#[derive(Debug, Clone)]
pub struct LlmCall {
    pub system_prompt: String,
    pub history_len: usize,
    pub message: String,
}

pub enum LlmReply {
    Text(String),
    Unavailable,
}

#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<LlmReply>>,
    calls: Mutex<Vec<LlmCall>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<LlmReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| LlmReply::Text(r.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> ServiceResult<String> {
        self.calls.lock().unwrap().push(LlmCall {
            system_prompt: system_prompt.to_string(),
            history_len: history.len(),
            message: message.to_string(),
        });
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(LlmReply::Text(text)) => Ok(text),
            Some(LlmReply::Unavailable) | None => Err(ServiceError::Status {
                provider: "Scripted",
                status: 503,
                message: "service unavailable".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Count {
        entity: String,
        predicates: Vec<NativePredicate>,
    },
    Search(SearchRequest),
}

#[derive(Default)]
pub struct ScriptedStore {
    counts: Mutex<VecDeque<BackendResult<u64>>>,
    searches: Mutex<VecDeque<BackendResult<Vec<Record>>>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_count(self: Arc<Self>, count: u64) -> Arc<Self> {
        self.counts.lock().unwrap().push_back(Ok(count));
        self
    }

    pub fn with_rows(self: Arc<Self>, rows: Vec<Record>) -> Arc<Self> {
        self.searches.lock().unwrap().push_back(Ok(rows));
        self
    }

    pub fn with_count_error(self: Arc<Self>, error: BackendError) -> Arc<Self> {
        self.counts.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_search_error(self: Arc<Self>, error: BackendError) -> Arc<Self> {
        self.searches.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Search(request) => Some(request),
                StoreCall::Count { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn count(&self, entity: &str, predicates: &[NativePredicate]) -> BackendResult<u64> {
        self.calls.lock().unwrap().push(StoreCall::Count {
            entity: entity.to_string(),
            predicates: predicates.to_vec(),
        });
        let next = self.counts.lock().unwrap().pop_front();
        next.unwrap_or(Ok(0))
    }

    async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Search(request.clone()));
        let next = self.searches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn store_name(&self) -> &str {
        "scripted"
    }
}

pub fn pipeline(llm: Arc<ScriptedLlm>, store: Arc<ScriptedStore>) -> AssistantPipeline {
    AssistantPipeline::new(
        llm,
        store,
        Arc::new(SchemaCatalog::builtin().unwrap()),
        &PipelineConfig::default(),
    )
}

pub fn role(name: &str) -> RoleContext {
    RoleDirectory::builtin().unwrap().resolve(name)
}

pub fn partner(id: i64, name: &str) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), serde_json::json!(id));
    record.insert("name".to_string(), serde_json::json!(name));
    record
}
