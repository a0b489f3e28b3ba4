// Prompt constants for the overall interview evaluation.

pub const EVALUATION_SYSTEM: &str = "You are a fair but demanding interview coach. \
    You compare a candidate's spoken answers with reference answers and give an honest overall assessment.";

/// Replace `{transcript}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Below is the transcript of a mock interview. For every question you get the
reference answer and what the candidate said (speech-to-text output, so expect small
transcription errors).

{transcript}

Rate the candidate's overall performance from 1 to 10 and write 3 to 5 sentences of feedback
covering strengths and the most important areas to improve.

Return a JSON object with this EXACT shape and nothing else:
{"ratings": number, "feedback": "string"}"#;
