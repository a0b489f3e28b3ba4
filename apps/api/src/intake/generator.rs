//! Question generation: prompt building, AI call with retry, tolerant parsing.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::intake::form::InterviewForm;
use crate::intake::prompts::{QUESTION_GEN_PROMPT_TEMPLATE, QUESTION_GEN_SYSTEM};
use crate::llm_client::json::parse_json_array;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::retry::{generate_with_retry, RetryPolicy};
use crate::llm_client::TextGenerator;
use crate::models::interview::QuestionAnswer;

/// Fills the generation template from the validated form and optional résumé text.
pub fn build_question_prompt(
    form: &InterviewForm,
    resume_text: Option<&str>,
    question_count: u32,
) -> String {
    QUESTION_GEN_PROMPT_TEMPLATE
        .replace("{position}", &form.position)
        .replace("{description}", &form.description)
        .replace("{experience}", &form.experience.to_string())
        .replace("{tech_stack}", &form.tech_stack)
        .replace("{question_count}", &question_count.to_string())
        .replace("{resume_text}", resume_text.unwrap_or(""))
}

/// Asks the model for interview questions and parses its reply.
///
/// Busy responses are retried per `policy`; everything else fails fast.
pub async fn generate_questions(
    llm: &dyn TextGenerator,
    form: &InterviewForm,
    resume_text: Option<&str>,
    question_count: u32,
    policy: &RetryPolicy,
) -> Result<Vec<QuestionAnswer>, AppError> {
    let prompt = build_question_prompt(form, resume_text, question_count);
    let system = format!("{QUESTION_GEN_SYSTEM} {JSON_ONLY_SYSTEM}");

    let raw = generate_with_retry(llm, &prompt, &system, policy)
        .await
        .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;

    let questions = parse_questions(&raw)?;
    if questions.len() != question_count as usize {
        warn!(
            "Asked for {} questions, model returned {}",
            question_count,
            questions.len()
        );
    }
    info!("Generated {} interview questions", questions.len());
    Ok(questions)
}

/// Bracket-extraction parse plus sanity checks on the pairs.
pub fn parse_questions(raw: &str) -> Result<Vec<QuestionAnswer>, AppError> {
    let questions: Vec<QuestionAnswer> = parse_json_array(raw).map_err(|e| {
        warn!("Unparseable question list from model: {e}");
        AppError::UnprocessableEntity("The AI returned questions in an unexpected format".to_string())
    })?;

    if questions.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "The AI returned no interview questions".to_string(),
        ));
    }
    if questions.iter().any(|q| q.question.trim().is_empty()) {
        return Err(AppError::UnprocessableEntity(
            "The AI returned a blank interview question".to_string(),
        ));
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::LlmError;

    struct FlakyGenerator {
        failures_left: AtomicU32,
        reply: String,
        last_prompt: Mutex<String>,
    }

    impl FlakyGenerator {
        fn new(failures: u32, reply: &str) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                reply: reply.to_string(),
                last_prompt: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn generate(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(LlmError::Api {
                    status: 529,
                    message: "Overloaded".to_string(),
                });
            }
            Ok(self.reply.clone())
        }
    }

    fn form() -> InterviewForm {
        InterviewForm {
            position: "Site Reliability Engineer".to_string(),
            description: "Keep our Kubernetes fleet healthy".to_string(),
            experience: 4,
            tech_stack: "Go, Kubernetes, Terraform".to_string(),
        }
    }

    const REPLY: &str = "Here you go:\n```json\n[{\"question\":\"Q\",\"answer\":\"A\"}]\n```";

    #[test]
    fn test_prompt_embeds_every_field() {
        let prompt = build_question_prompt(&form(), Some("Ran on-call for 40 services"), 5);
        assert!(prompt.contains("Site Reliability Engineer"));
        assert!(prompt.contains("Keep our Kubernetes fleet healthy"));
        assert!(prompt.contains("Years of experience: 4"));
        assert!(prompt.contains("Go, Kubernetes, Terraform"));
        assert!(prompt.contains("Ran on-call for 40 services"));
        assert!(prompt.contains("exactly 5 interview questions"));
        assert!(!prompt.contains("{position}"));
    }

    #[test]
    fn test_prompt_without_resume_leaves_no_placeholder() {
        let prompt = build_question_prompt(&form(), None, 3);
        assert!(!prompt.contains("{resume_text}"));
    }

    #[test]
    fn test_parse_questions_tolerates_prose() {
        let questions = parse_questions(REPLY).unwrap();
        assert_eq!(
            questions,
            vec![QuestionAnswer {
                question: "Q".to_string(),
                answer: "A".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_questions_rejects_empty_and_blank() {
        assert!(matches!(
            parse_questions("[]"),
            Err(AppError::UnprocessableEntity(_))
        ));
        assert!(parse_questions(r#"[{"question": "  ", "answer": "A"}]"#).is_err());
        assert!(parse_questions("I cannot help with that").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_survives_two_busy_responses() {
        let llm = FlakyGenerator::new(2, REPLY);
        let questions = generate_questions(&llm, &form(), None, 1, &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);
        assert!(llm.last_prompt.lock().unwrap().contains("Site Reliability"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_gives_up_when_service_stays_busy() {
        let llm = FlakyGenerator::new(3, REPLY);
        let err = generate_questions(&llm, &form(), None, 1, &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
