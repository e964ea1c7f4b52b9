//! Summarizer
//!
//! Second model call: narrates retrieved rows for the user.

use std::sync::Arc;

use tracing::debug;

use crate::action::DisplayHint;
use crate::agentic::LlmClient;
use crate::error::ServiceResult;
use crate::executor::QueryResult;
use crate::prompt::{build_summary_message, build_summary_prompt};

#[derive(Clone)]
pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
    max_chars: usize,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>, max_chars: usize) -> Self {
        Self { llm, max_chars }
    }

    pub async fn summarize(
        &self,
        result: &QueryResult,
        display: DisplayHint,
        question: &str,
    ) -> ServiceResult<String> {
        let system_prompt = build_summary_prompt(display, result.is_fallback);
        let message =
            build_summary_message(&result.rows, result.is_fallback, question, self.max_chars);
        debug!(
            "Summarizing {} row(s) ({} chars) with {}",
            result.rows.len(),
            message.len(),
            self.llm.model_name()
        );
        self.llm.complete(&system_prompt, &[], &message).await
    }
}
