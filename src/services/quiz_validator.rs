use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::models::domain::{question::CorrectAnswer, AdvancedQuestion, QuizConfig};

pub const MIN_QUESTION_COUNT: u8 = 1;
pub const MAX_QUESTION_COUNT: u8 = 50;
pub const MAX_CATEGORIES: usize = 10;
pub const MAX_KEYWORDS: usize = 20;
pub const MAX_TAG_CHARS: usize = 50;
pub const MIN_CONTENT_CHARS: usize = 50;
pub const MIN_QUESTION_CHARS: usize = 10;
pub const MIN_EXPLANATION_CHARS: usize = 10;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn message(&self) -> String {
        self.errors.join("; ")
    }
}

pub struct QuizValidator;

impl QuizValidator {
    pub fn validate_config(config: &QuizConfig) -> ValidationReport {
        let mut errors = Vec::new();

        if !(MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&config.question_count) {
            errors.push(format!(
                "question_count must be between {} and {}",
                MIN_QUESTION_COUNT, MAX_QUESTION_COUNT
            ));
        }
        if config.question_types.is_empty() {
            errors.push("At least one question type is required".to_string());
        }
        if config.categories.len() > MAX_CATEGORIES {
            errors.push(format!("At most {} categories are allowed", MAX_CATEGORIES));
        }
        if config.custom_keywords.len() > MAX_KEYWORDS {
            errors.push(format!("At most {} keywords are allowed", MAX_KEYWORDS));
        }

        for (label, items) in [
            ("category", &config.categories),
            ("keyword", &config.custom_keywords),
        ] {
            for item in items {
                let len = item.trim().chars().count();
                if len == 0 {
                    errors.push(format!("Each {} must be non-empty", label));
                } else if len > MAX_TAG_CHARS {
                    errors.push(format!(
                        "{} '{}' exceeds {} characters",
                        label, item, MAX_TAG_CHARS
                    ));
                }
            }
        }

        ValidationReport::from_errors(errors)
    }

    pub fn validate_content(content: &str) -> ValidationReport {
        let len = content.trim().chars().count();
        let errors = if len < MIN_CONTENT_CHARS {
            vec![format!(
                "Content must be at least {} characters (got {})",
                MIN_CONTENT_CHARS, len
            )]
        } else {
            Vec::new()
        };
        ValidationReport::from_errors(errors)
    }

    pub fn validate_question(question: &AdvancedQuestion) -> ValidationReport {
        let mut errors = Vec::new();
        let qtype = question.question_type;

        if question.question.trim().chars().count() < MIN_QUESTION_CHARS {
            errors.push(format!(
                "Question text must be at least {} characters",
                MIN_QUESTION_CHARS
            ));
        }
        if question.explanation.trim().chars().count() < MIN_EXPLANATION_CHARS {
            errors.push(format!(
                "Explanation must be at least {} characters",
                MIN_EXPLANATION_CHARS
            ));
        }
        if !(1..=5).contains(&question.metadata.difficulty) {
            errors.push("Difficulty must be between 1 and 5".to_string());
        }

        if qtype.is_choice() {
            let count = question.options.len();
            if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
                errors.push(format!(
                    "Multiple choice needs {}-{} options (got {})",
                    MIN_OPTIONS, MAX_OPTIONS, count
                ));
            }
            match choice_index(&question.correct_answer) {
                Some(index) if index < count => {}
                Some(_) => errors.push("Correct answer is outside the option range".to_string()),
                None => errors.push("Correct answer must be an option letter".to_string()),
            }
        } else if qtype.is_boolean() {
            if !matches!(question.correct_answer, CorrectAnswer::Boolean(_)) {
                errors.push("True/false answer must be a boolean".to_string());
            }
        } else if qtype.is_multi_part() {
            if question.sub_questions.is_empty() {
                errors.push("Multi-part question needs sub-questions".to_string());
            }
            if question
                .sub_questions
                .iter()
                .any(|sq| sq.question.trim().is_empty() || sq.correct_answer.trim().is_empty())
            {
                errors.push("Every sub-question needs text and an answer".to_string());
            }
        } else {
            let has_text = match &question.correct_answer {
                CorrectAnswer::Text(s) => !s.trim().is_empty(),
                CorrectAnswer::List(items) => items.iter().any(|s| !s.trim().is_empty()),
                _ => false,
            };
            if !has_text {
                errors.push("Answer must be non-empty text".to_string());
            }
        }

        if let Some(image) = question.visual.as_ref().and_then(|v| v.image_base64.as_deref()) {
            if !is_valid_base64(image) {
                errors.push("Embedded image is not valid base64".to_string());
            }
        }

        ValidationReport::from_errors(errors)
    }
}

fn choice_index(answer: &CorrectAnswer) -> Option<usize> {
    match answer {
        CorrectAnswer::Index(i) => usize::try_from(*i).ok(),
        CorrectAnswer::Text(s) => {
            let s = s.trim();
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Accepts raw base64 or a `data:<mime>;base64,` URL.
pub fn is_valid_base64(payload: &str) -> bool {
    let data = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    let data = data.trim();
    !data.is_empty() && STANDARD.decode(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{question::VisualContent, QuestionType};
    use crate::test_utils::fixtures::{sample_config, sample_question};

    #[test]
    fn default_config_is_valid() {
        assert!(QuizValidator::validate_config(&sample_config()).valid);
    }

    #[test]
    fn config_limits_are_enforced() {
        let mut config = sample_config();
        config.question_count = 0;
        config.question_types.clear();
        config.categories = (0..11).map(|i| format!("cat{}", i)).collect();
        config.custom_keywords = vec!["  ".into(), "k".repeat(51)];

        let report = QuizValidator::validate_config(&config);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 5);

        config = sample_config();
        config.question_count = 51;
        assert!(!QuizValidator::validate_config(&config).valid);
        config.question_count = 50;
        assert!(QuizValidator::validate_config(&config).valid);
    }

    #[test]
    fn short_content_is_rejected() {
        assert!(!QuizValidator::validate_content("   too short   ").valid);
        assert!(QuizValidator::validate_content(&"a".repeat(50)).valid);
    }

    #[test]
    fn sample_questions_of_every_type_are_valid() {
        for question_type in QuestionType::ALL {
            let report = QuizValidator::validate_question(&sample_question(question_type));
            assert!(report.valid, "{}: {:?}", question_type, report.errors);
        }
    }

    #[test]
    fn choice_answer_must_fall_inside_options() {
        let mut question = sample_question(QuestionType::MultipleChoice);
        question.correct_answer = CorrectAnswer::Text("F".into());
        let report = QuizValidator::validate_question(&question);
        assert!(report.errors.iter().any(|e| e.contains("outside")));

        question.correct_answer = CorrectAnswer::Text("Paris".into());
        assert!(!QuizValidator::validate_question(&question).valid);

        question.correct_answer = CorrectAnswer::Index(1);
        assert!(QuizValidator::validate_question(&question).valid);

        question.options.truncate(1);
        assert!(!QuizValidator::validate_question(&question).valid);
    }

    #[test]
    fn choice_options_stop_at_d() {
        let mut question = sample_question(QuestionType::MultipleChoice);
        question.options.push("E) Vacuole".to_string());
        question.correct_answer = CorrectAnswer::Text("E".into());
        let report = QuizValidator::validate_question(&question);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("2-4 options (got 5)")));

        question.options.truncate(4);
        question.correct_answer = CorrectAnswer::Text("D".into());
        assert!(QuizValidator::validate_question(&question).valid);
    }

    #[test]
    fn true_false_requires_boolean() {
        let mut question = sample_question(QuestionType::TrueFalseExplained);
        question.correct_answer = CorrectAnswer::Text("maybe".into());
        assert!(!QuizValidator::validate_question(&question).valid);
    }

    #[test]
    fn short_text_and_bad_difficulty_are_reported() {
        let mut question = sample_question(QuestionType::ShortEssay);
        question.question = "Why?".into();
        question.explanation = "".into();
        question.metadata.difficulty = 0;
        let report = QuizValidator::validate_question(&question);
        assert_eq!(report.errors.len(), 3);
        assert!(report.message().contains("Difficulty"));
    }

    #[test]
    fn multi_part_needs_sub_questions() {
        let mut question = sample_question(QuestionType::MultiPart);
        question.sub_questions.clear();
        assert!(!QuizValidator::validate_question(&question).valid);
    }

    #[test]
    fn embedded_images_must_be_base64() {
        let mut question = sample_question(QuestionType::DiagramLabeling);
        question.visual = Some(VisualContent {
            image_base64: Some("data:image/png;base64,aGVsbG8=".into()),
            description: "A labelled cell".into(),
        });
        assert!(QuizValidator::validate_question(&question).valid);

        question.visual = Some(VisualContent {
            image_base64: Some("not base64!!".into()),
            description: "A labelled cell".into(),
        });
        assert!(!QuizValidator::validate_question(&question).valid);
    }

    #[test]
    fn base64_helper_handles_prefixes() {
        assert!(is_valid_base64("aGVsbG8="));
        assert!(is_valid_base64("data:image/png;base64,aGVsbG8="));
        assert!(!is_valid_base64("data:image/png;base64,"));
        assert!(!is_valid_base64("%%%"));
    }
}
