//! Assistant Pipeline
//!
//! One request runs: scope schema, build prompt, translate, extract action,
//! authorize, then count or search (with fallback) and summarize. Every stage
//! failure ends in a user-facing answer; nothing here returns an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::action::{
    extract_action_with, ActionDescriptor, ActionLimits, CountAction, DisplayHint, QueryAction,
};
use crate::agentic::{ConversationTurn, LlmClient};
use crate::config::PipelineConfig;
use crate::error::{AccessError, BackendError};
use crate::executor::{FallbackController, QueryExecutor, Record, RecordStore, SearchRequest};
use crate::predicate::translate;
use crate::prompt::build_prompt;
use crate::schema::{AccessGate, RoleContext, SchemaCatalog};
use crate::summarizer::Summarizer;

const TRANSLATION_APOLOGY: &str =
    "Üzgünüm, şu anda yapay zeka servisine ulaşamıyorum. Lütfen biraz sonra tekrar deneyin.";
const SUMMARY_APOLOGY: &str =
    "Veriler getirildi ancak özet oluşturulamadı. Sonuçları aşağıda görebilirsiniz.";
const NO_DATA: &str = "Aradığınız kriterlere uygun veri bulunamadı.";
const BACKEND_UNREACHABLE: &str =
    "ERP sistemine şu anda ulaşılamıyor. Lütfen biraz sonra tekrar deneyin.";
const BACKEND_LOGIN_FAILED: &str =
    "ERP sistemine giriş yapılamadı. Lütfen sistem yöneticinizle iletişime geçin.";
const BACKEND_REJECTED: &str =
    "ERP sistemi bu sorguyu işleyemedi. Sorunuzu farklı bir şekilde sormayı deneyin.";

/// Data attached to an answer for the UI to render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerData {
    Count {
        entity: String,
        count: u64,
    },
    Rows {
        entity: String,
        rows: Vec<Record>,
        is_fallback: bool,
    },
}

impl AnswerData {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AnswerData::Rows { is_fallback: true, .. })
    }
}

/// What the user gets back for one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantAnswer {
    pub content: String,
    pub data: Option<AnswerData>,
    pub display_hint: Option<DisplayHint>,
}

impl AssistantAnswer {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
            display_hint: None,
        }
    }
}

/// The translation-and-execution pipeline
#[derive(Clone)]
pub struct AssistantPipeline {
    llm: Arc<dyn LlmClient>,
    gate: AccessGate,
    executor: QueryExecutor,
    fallback: FallbackController,
    summarizer: Summarizer,
    limits: ActionLimits,
}

impl AssistantPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn RecordStore>,
        catalog: Arc<SchemaCatalog>,
        config: &PipelineConfig,
    ) -> Self {
        let limits = ActionLimits::new(config.default_limit, config.max_limit);
        Self {
            gate: AccessGate::new(catalog),
            executor: QueryExecutor::new(store, limits.max_limit()),
            fallback: FallbackController::new(config.fallback_limit),
            summarizer: Summarizer::new(llm.clone(), config.summary_max_chars),
            llm,
            limits,
        }
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub async fn answer(
        &self,
        message: &str,
        history: &[ConversationTurn],
        role: &RoleContext,
    ) -> AssistantAnswer {
        self.answer_at(message, history, role, Utc::now()).await
    }

    /// [`answer`](Self::answer) with an explicit clock for the prompt
    pub async fn answer_at(
        &self,
        message: &str,
        history: &[ConversationTurn],
        role: &RoleContext,
        now: DateTime<Utc>,
    ) -> AssistantAnswer {
        let request_id = Uuid::new_v4();
        let span = info_span!("answer", %request_id, role = %role.role);
        async move {
            info!(
                "Received message ({} chars, {} prior turns)",
                message.chars().count(),
                history.len()
            );
            let answer = self.run(message, history, role, now).await;
            info!(
                "Answered with {} data",
                match &answer.data {
                    Some(AnswerData::Count { .. }) => "count",
                    Some(AnswerData::Rows { .. }) => "row",
                    None => "no",
                }
            );
            answer
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        message: &str,
        history: &[ConversationTurn],
        role: &RoleContext,
        now: DateTime<Utc>,
    ) -> AssistantAnswer {
        let scoped = self.gate.scoped_schema(role);
        info!("Scoped schema: {} entities", scoped.entities().len());
        let prompt = build_prompt(&scoped, &role.role, now);

        let raw = match self.llm.complete(&prompt, history, message).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Translation call to {} failed: {}", self.llm.provider_name(), e);
                return AssistantAnswer::text(TRANSLATION_APOLOGY);
            }
        };
        debug!("Translation reply: {}", raw);

        let action = extract_action_with(&raw, self.limits);
        if let Err(denied) = scoped.authorize(&action) {
            warn!("Rejected action: {}", denied);
            return AssistantAnswer::text(refusal(&denied));
        }

        match action {
            ActionDescriptor::NoAction { text } => {
                info!("No action; returning model reply");
                AssistantAnswer::text(text)
            }
            ActionDescriptor::Count(count) => self.run_count(count).await,
            ActionDescriptor::Query(query) => self.run_query(query, message).await,
        }
    }

    async fn run_count(&self, action: CountAction) -> AssistantAnswer {
        let predicates = translate(&action.filters);
        match self.executor.count(&action.entity, &predicates).await {
            Ok(count) => AssistantAnswer {
                content: format!(
                    "**{}** tablosunda toplam **{}** kayıt bulundu.",
                    action.entity, count
                ),
                data: Some(AnswerData::Count {
                    entity: action.entity,
                    count,
                }),
                display_hint: Some(DisplayHint::Stat),
            },
            Err(e) => {
                warn!("Count on {} failed: {}", action.entity, e);
                AssistantAnswer::text(backend_failure(&e))
            }
        }
    }

    async fn run_query(&self, action: QueryAction, question: &str) -> AssistantAnswer {
        let request = SearchRequest {
            predicates: translate(&action.filters),
            entity: action.entity,
            fields: action.fields,
            limit: action.limit,
            order: action.order,
        };

        let result = match self.fallback.search(&self.executor, &request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Search on {} failed: {}", request.entity, e);
                return AssistantAnswer::text(backend_failure(&e));
            }
        };
        info!(
            stage = ?result.stage(),
            rows = result.rows.len(),
            "Search finished on {}",
            request.entity
        );
        if result.is_empty() {
            return AssistantAnswer::text(NO_DATA);
        }

        let content = match self.summarizer.summarize(&result, action.display, question).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Summary call to {} failed: {}", self.llm.provider_name(), e);
                SUMMARY_APOLOGY.to_string()
            }
        };

        AssistantAnswer {
            content,
            data: Some(AnswerData::Rows {
                entity: request.entity,
                rows: result.rows,
                is_fallback: result.is_fallback,
            }),
            display_hint: Some(action.display),
        }
    }
}

/// User-facing wording for a record store failure; details stay in the logs
fn backend_failure(error: &BackendError) -> &'static str {
    match error {
        BackendError::Authentication { .. } => BACKEND_LOGIN_FAILED,
        BackendError::Fault { .. } => BACKEND_REJECTED,
        BackendError::Transport(_)
        | BackendError::Status { .. }
        | BackendError::Protocol(_)
        | BackendError::InvalidUrl { .. } => BACKEND_UNREACHABLE,
    }
}

fn refusal(denied: &AccessError) -> String {
    match denied {
        AccessError::EntityNotPermitted { role, entity } => format!(
            "'{}' rolünün **{}** verilerine erişim yetkisi yok.",
            role, entity
        ),
        AccessError::FieldNotPermitted { entity, field } => format!(
            "**{}** tablosunda '{}' alanı sorgulanamaz.",
            entity, field
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_wording() {
        let text = refusal(&AccessError::EntityNotPermitted {
            role: "Personel".to_string(),
            entity: "res.partner".to_string(),
        });
        assert!(text.contains("Personel"));
        assert!(text.contains("res.partner"));
    }

    #[test]
    fn test_backend_failure_hides_connection_details() {
        let auth = BackendError::Authentication {
            username: "admin@example.com".to_string(),
            database: "prod_db".to_string(),
        };
        let text = backend_failure(&auth);
        assert_eq!(text, BACKEND_LOGIN_FAILED);
        assert!(!text.contains("admin@example.com"));
        assert!(!text.contains("prod_db"));

        let bad_url = BackendError::InvalidUrl {
            url: "ftp://erp.internal:8069".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        assert_eq!(backend_failure(&bad_url), BACKEND_UNREACHABLE);
        assert_eq!(
            backend_failure(&BackendError::Status { status: 502 }),
            BACKEND_UNREACHABLE
        );
    }

    #[test]
    fn test_answer_serialization() {
        let answer = AssistantAnswer {
            content: "42".to_string(),
            data: Some(AnswerData::Count {
                entity: "res.partner".to_string(),
                count: 42,
            }),
            display_hint: Some(DisplayHint::Stat),
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["data"]["count"], 42);
        assert_eq!(json["display_hint"], "stat");

        let plain = serde_json::to_value(AssistantAnswer::text("Merhaba")).unwrap();
        assert!(plain["data"].is_null());
    }
}
