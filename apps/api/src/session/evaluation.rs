//! Overall rating and feedback for a finished attempt.
//!
//! Evaluation never blocks the flow: any failure degrades to a zero rating
//! with a generic message.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::json::parse_json_object;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmError, TextGenerator};
use crate::session::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM};

pub const FALLBACK_FEEDBACK: &str =
    "We couldn't generate feedback for this interview right now. Your answers were still recorded.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallResult {
    pub ratings: f64,
    pub feedback: String,
}

impl OverallResult {
    pub fn fallback() -> Self {
        Self {
            ratings: 0.0,
            feedback: FALLBACK_FEEDBACK.to_string(),
        }
    }
}

/// One question as the evaluator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationItem {
    pub question: String,
    pub reference_answer: String,
    pub candidate_answer: Option<String>,
}

pub fn build_evaluation_prompt(items: &[EvaluationItem]) -> String {
    let transcript = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "Question {}: {}\nReference answer: {}\nCandidate answer: {}",
                i + 1,
                item.question,
                item.reference_answer,
                item.candidate_answer
                    .as_deref()
                    .unwrap_or("(not answered)")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    EVALUATION_PROMPT_TEMPLATE.replace("{transcript}", &transcript)
}

/// Single evaluation call; no retry.
pub async fn evaluate_overall(llm: &dyn TextGenerator, items: &[EvaluationItem]) -> OverallResult {
    match request_evaluation(llm, items).await {
        Ok(result) => {
            info!("Overall evaluation: rating {}", result.ratings);
            result
        }
        Err(e) => {
            warn!("Overall evaluation failed, using fallback: {e}");
            OverallResult::fallback()
        }
    }
}

async fn request_evaluation(
    llm: &dyn TextGenerator,
    items: &[EvaluationItem],
) -> Result<OverallResult, LlmError> {
    let prompt = build_evaluation_prompt(items);
    let system = format!("{EVALUATION_SYSTEM} {JSON_ONLY_SYSTEM}");
    let raw = llm.generate(&prompt, &system).await?;
    parse_overall(&raw)
}

pub fn parse_overall(raw: &str) -> Result<OverallResult, LlmError> {
    let result: OverallResult = parse_json_object(raw)?;
    if !result.ratings.is_finite() {
        return Err(LlmError::MissingJson("a finite rating"));
    }
    Ok(result)
}
