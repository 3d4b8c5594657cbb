pub mod fixtures {
    use crate::models::domain::{
        question::{CorrectAnswer, QuestionMetadata, SubQuestion, VisualContent},
        AdvancedQuestion, QuestionType, QuizConfig,
    };

    pub const TEST_USER_ID: &str = "user-123";

    /// Multiple choice, intermediate, ten questions.
    pub fn sample_config() -> QuizConfig {
        QuizConfig::default()
    }

    pub fn config_for(question_types: Vec<QuestionType>, question_count: u8) -> QuizConfig {
        QuizConfig {
            question_types,
            question_count,
            ..QuizConfig::default()
        }
    }

    /// Roughly 3000 characters of study material.
    pub fn sample_content() -> String {
        let paragraph = "Photosynthesis converts light energy into chemical energy stored in glucose. \
            It takes place in the chloroplasts of plant cells, where chlorophyll absorbs light. \
            The light reactions split water and release oxygen, while the Calvin cycle fixes carbon dioxide. ";
        paragraph.repeat(3000 / paragraph.len() + 1)
    }

    /// A valid question of the given type.
    pub fn sample_question(question_type: QuestionType) -> AdvancedQuestion {
        let (question, options, correct_answer, sub_questions) = match question_type {
            QuestionType::MultipleChoice => (
                "Which organelle carries out photosynthesis?",
                vec![
                    "A) Mitochondrion".to_string(),
                    "B) Chloroplast".to_string(),
                    "C) Ribosome".to_string(),
                    "D) Nucleus".to_string(),
                ],
                CorrectAnswer::Text("B".into()),
                Vec::new(),
            ),
            QuestionType::TrueFalseExplained => (
                "The light reactions of photosynthesis release oxygen.",
                Vec::new(),
                CorrectAnswer::Boolean(true),
                Vec::new(),
            ),
            QuestionType::MultiPart => (
                "Consider the stages of photosynthesis.",
                Vec::new(),
                CorrectAnswer::List(vec!["In the chloroplasts".into(), "Oxygen".into()]),
                vec![
                    SubQuestion {
                        question: "Where does it take place?".into(),
                        correct_answer: "In the chloroplasts".into(),
                    },
                    SubQuestion {
                        question: "Which gas is released?".into(),
                        correct_answer: "Oxygen".into(),
                    },
                ],
            ),
            _ => (
                "Explain how the Calvin cycle uses carbon dioxide.",
                Vec::new(),
                CorrectAnswer::Text("It fixes carbon dioxide into sugars".into()),
                Vec::new(),
            ),
        };

        AdvancedQuestion {
            id: format!("q-{}", question_type),
            question_type,
            question: question.to_string(),
            options,
            correct_answer,
            explanation: "Supported directly by the study material.".to_string(),
            sub_questions,
            visual: question_type.is_visual().then(|| VisualContent {
                image_base64: None,
                description: "A labelled diagram of a chloroplast".to_string(),
            }),
            metadata: QuestionMetadata {
                difficulty: 3,
                categories: vec!["biology".to_string()],
                estimated_time_seconds: 60,
                learning_objective: "Describe photosynthesis".to_string(),
            },
            is_fallback: false,
        }
    }

    pub fn sample_questions(count: usize) -> Vec<AdvancedQuestion> {
        (0..count)
            .map(|i| {
                let mut q = sample_question(QuestionType::MultipleChoice);
                q.id = format!("q-{}", i);
                q.question = format!("{} (variant {})", q.question, i);
                q
            })
            .collect()
    }
}

pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn sample_content_is_long_enough_for_generation() {
        assert!(sample_content().len() >= 3000);
    }

    #[test]
    fn sample_questions_have_distinct_text() {
        let questions = sample_questions(3);
        assert_ne!(questions[0].question, questions[1].question);
        assert_eq!(questions[2].id, "q-2");
    }
}
