// Prompt constants for interview question generation.

/// System prompt for question generation.
pub const QUESTION_GEN_SYSTEM: &str = "You are an experienced technical interviewer. \
    You write realistic interview questions tailored to a specific role and candidate, \
    each paired with a concise model answer. \
    Respond with a JSON array only.";

/// Replace every `{placeholder}` before sending.
pub const QUESTION_GEN_PROMPT_TEMPLATE: &str = r#"Prepare a mock interview for the following role.

Job position: {position}
Job description: {description}
Years of experience: {experience}
Tech stack: {tech_stack}

Candidate résumé (may be empty):
{resume_text}

Write exactly {question_count} interview questions that fit this role, the stated experience level
and, when the résumé is present, the candidate's actual background. Each question must come with
a reference answer a strong candidate would give, in 3 to 6 sentences.

Return a strict JSON array with this EXACT shape and nothing else:
[
  {"question": "string", "answer": "string"}
]"#;
