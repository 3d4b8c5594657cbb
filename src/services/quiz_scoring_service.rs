use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{quiz_session::CategoryScore, AdvancedQuestion},
    services::answer_normalizer::{answers_match, partial_credit},
};

pub const GENERAL_CATEGORY: &str = "general";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    pub credit: f64,
    pub user_answer: Option<Value>,
    pub correct_answer: Value,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizScore {
    pub score: u32,
    pub total_scored: u32,
    pub percentage: f64,
    pub category_scores: BTreeMap<String, CategoryScore>,
    pub fallback_count: u32,
    pub results: Vec<QuestionResult>,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Score answers against their questions. Fallback questions are reported
/// but never counted.
pub fn score_quiz(questions: &[AdvancedQuestion], answers: &[Option<Value>]) -> AppResult<QuizScore> {
    if questions.len() != answers.len() {
        return Err(AppError::ValidationError(format!(
            "Expected {} answers but received {}",
            questions.len(),
            answers.len()
        )));
    }

    let mut score = 0;
    let mut total_scored = 0;
    let mut fallback_count = 0;
    let mut category_scores: BTreeMap<String, CategoryScore> = BTreeMap::new();
    let mut results = Vec::with_capacity(questions.len());

    for (question, answer) in questions.iter().zip(answers) {
        let correct_answer = question.correct_value();
        let (correct, credit) = match answer {
            Some(user) => (
                answers_match(question.question_type, user, &correct_answer),
                partial_credit(question.question_type, user, &correct_answer),
            ),
            None => (false, 0.0),
        };

        results.push(QuestionResult {
            question_id: question.id.clone(),
            correct,
            credit,
            user_answer: answer.clone(),
            correct_answer,
            is_fallback: question.is_fallback,
        });

        if question.is_fallback {
            fallback_count += 1;
            continue;
        }

        total_scored += 1;
        if correct {
            score += 1;
        }

        let categories: Vec<&str> = question
            .metadata
            .categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        let categories = if categories.is_empty() {
            vec![GENERAL_CATEGORY]
        } else {
            categories
        };

        for category in categories {
            let entry = category_scores.entry(category.to_lowercase()).or_default();
            entry.total += 1;
            if correct {
                entry.correct += 1;
            }
        }
    }

    let percentage = if total_scored == 0 {
        0.0
    } else {
        round_one_decimal(100.0 * score as f64 / total_scored as f64)
    };

    Ok(QuizScore {
        score,
        total_scored,
        percentage,
        category_scores,
        fallback_count,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::QuestionType;
    use crate::test_utils::fixtures::sample_question;
    use serde_json::json;

    #[test]
    fn mismatched_lengths_are_rejected() {
        let questions = vec![sample_question(QuestionType::MultipleChoice)];
        let result = score_quiz(&questions, &[]);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn scores_each_type_with_normalized_answers() {
        let questions = vec![
            sample_question(QuestionType::MultipleChoice),
            sample_question(QuestionType::TrueFalseExplained),
            sample_question(QuestionType::ShortEssay),
        ];
        let answers = vec![
            Some(json!("B) Chloroplast")),
            Some(json!("false")),
            Some(json!("it fixes carbon dioxide into sugar")),
        ];

        let result = score_quiz(&questions, &answers).unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.total_scored, 3);
        assert_eq!(result.percentage, 66.7);
        assert_eq!(
            result.category_scores.get("biology"),
            Some(&CategoryScore { correct: 2, total: 3 })
        );
        assert!(result.results[0].correct);
        assert!(!result.results[1].correct);
    }

    #[test]
    fn unanswered_questions_are_incorrect() {
        let questions = vec![sample_question(QuestionType::MultipleChoice)];
        let result = score_quiz(&questions, &[None]).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.total_scored, 1);
        assert_eq!(result.percentage, 0.0);
    }

    #[test]
    fn fallback_questions_are_excluded_from_score() {
        let mut fallback = sample_question(QuestionType::TrueFalseExplained);
        fallback.is_fallback = true;
        let questions = vec![sample_question(QuestionType::MultipleChoice), fallback];

        let result = score_quiz(&questions, &[Some(json!("B")), Some(json!("false"))]).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_scored, 1);
        assert_eq!(result.fallback_count, 1);
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.category_scores["biology"].total, 1);
        assert_eq!(result.results.len(), 2);
    }

    #[test]
    fn uncategorized_questions_count_as_general() {
        let mut question = sample_question(QuestionType::MultipleChoice);
        question.metadata.categories.clear();
        let result = score_quiz(&[question], &[Some(json!(1))]).unwrap();
        assert_eq!(
            result.category_scores.get(GENERAL_CATEGORY),
            Some(&CategoryScore { correct: 1, total: 1 })
        );
    }

    #[test]
    fn all_fallback_quiz_scores_zero_percent() {
        let mut question = sample_question(QuestionType::MultipleChoice);
        question.is_fallback = true;
        let result = score_quiz(&[question], &[Some(json!("B"))]).unwrap();
        assert_eq!(result.total_scored, 0);
        assert_eq!(result.percentage, 0.0);
    }
}
