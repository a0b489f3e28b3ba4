//! Intake form fields and their client-visible constraints.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Structured intake input. The résumé file travels alongside it, not inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewForm {
    pub position: String,
    pub description: String,
    pub experience: i32,
    pub tech_stack: String,
}

impl InterviewForm {
    /// Checks every field, returning the first violation.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.position.trim().is_empty() {
            return Err(AppError::Validation("Job position is required".to_string()));
        }
        if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "Job description must be at least {MIN_DESCRIPTION_CHARS} characters"
            )));
        }
        if self.experience < 0 {
            return Err(AppError::Validation(
                "Years of experience cannot be negative".to_string(),
            ));
        }
        if self.tech_stack.trim().is_empty() {
            return Err(AppError::Validation("Tech stack is required".to_string()));
        }
        Ok(())
    }

    /// Copy with surrounding whitespace removed from every text field.
    pub fn trimmed(&self) -> Self {
        Self {
            position: self.position.trim().to_string(),
            description: self.description.trim().to_string(),
            experience: self.experience,
            tech_stack: self.tech_stack.trim().to_string(),
        }
    }
}

/// Parses the experience field as sent by a form: a whole number of years.
pub fn parse_experience(raw: &str) -> Result<i32, AppError> {
    raw.trim().parse::<i32>().map_err(|_| {
        AppError::Validation(format!(
            "Years of experience must be a whole number, got '{}'",
            raw.trim()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> InterviewForm {
        InterviewForm {
            position: "Backend Engineer".to_string(),
            description: "Build and operate payment APIs".to_string(),
            experience: 3,
            tech_stack: "Rust, Postgres, Kafka".to_string(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_short_description_rejected() {
        let form = InterviewForm {
            description: "  too short ".to_string(),
            ..valid_form()
        };
        // "too short" is 9 characters once trimmed
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_description_of_exactly_ten_chars_passes() {
        let form = InterviewForm {
            description: "0123456789".to_string(),
            ..valid_form()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_negative_experience_rejected() {
        let form = InterviewForm {
            experience: -1,
            ..valid_form()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_zero_experience_allowed() {
        let form = InterviewForm {
            experience: 0,
            ..valid_form()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_blank_position_and_stack_rejected() {
        let no_position = InterviewForm {
            position: "   ".to_string(),
            ..valid_form()
        };
        let no_stack = InterviewForm {
            tech_stack: String::new(),
            ..valid_form()
        };
        assert!(no_position.validate().is_err());
        assert!(no_stack.validate().is_err());
    }

    #[test]
    fn test_parse_experience() {
        assert_eq!(parse_experience(" 4 ").unwrap(), 4);
        assert!(parse_experience("four").is_err());
        assert!(parse_experience("2.5").is_err());
    }
}
