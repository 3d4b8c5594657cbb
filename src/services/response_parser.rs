use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        question::{CorrectAnswer, QuestionMetadata, SubQuestion, VisualContent},
        AdvancedQuestion, QuestionType, QuizConfig,
    },
    services::answer_normalizer::{extract_letter, index_to_letter},
};

/// Generated items after coercion; `skipped` counts items that could not be
/// read at all (unknown type, missing text).
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub questions: Vec<AdvancedQuestion>,
    pub skipped: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSubQuestion {
    question: String,
    correct_answer: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuestion {
    #[serde(rename = "type", alias = "question_type")]
    kind: Option<String>,
    question: String,
    options: Vec<Value>,
    correct_answer: Value,
    explanation: String,
    difficulty: Option<Value>,
    categories: Vec<String>,
    estimated_time_seconds: Option<Value>,
    learning_objective: String,
    sub_questions: Vec<RawSubQuestion>,
    visual_description: Option<String>,
}

/// Pull the JSON payload out of untrusted model output.
pub fn extract_json(text: &str) -> AppResult<Value> {
    let trimmed = strip_code_fences(text.trim());

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| AppError::ProviderError(format!("Malformed JSON in AI response: {}", e))),
        _ => Err(AppError::ProviderError(
            "AI response did not contain JSON".to_string(),
        )),
    }
}

fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Accepts `{"questions": [...]}` or a bare array.
pub fn question_items(value: Value) -> AppResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AppError::ProviderError(
                "AI response has no \"questions\" array".to_string(),
            )),
        },
        _ => Err(AppError::ProviderError(
            "AI response is not a JSON object or array".to_string(),
        )),
    }
}

pub fn parse_questions(text: &str, config: &QuizConfig) -> AppResult<ParsedBatch> {
    let items = question_items(extract_json(text)?)?;
    let mut batch = ParsedBatch::default();

    for item in items {
        match coerce_question(item, config) {
            Some(question) => batch.questions.push(question),
            None => batch.skipped += 1,
        }
    }

    Ok(batch)
}

fn coerce_question(item: Value, config: &QuizConfig) -> Option<AdvancedQuestion> {
    let raw: RawQuestion = serde_json::from_value(item).ok()?;

    let question_type = match raw.kind.as_deref() {
        Some(kind) => kind.parse::<QuestionType>().ok()?,
        None => config.primary_type(),
    };

    let question = raw.question.trim().to_string();
    if question.is_empty() {
        return None;
    }

    let options: Vec<String> = raw
        .options
        .iter()
        .map(value_text)
        .filter(|o| !o.is_empty())
        .collect();

    let sub_questions: Vec<SubQuestion> = raw
        .sub_questions
        .into_iter()
        .map(|sq| SubQuestion {
            question: sq.question.trim().to_string(),
            correct_answer: value_text(&sq.correct_answer),
        })
        .collect();

    let correct_answer = coerce_answer(question_type, &raw.correct_answer, &options, &sub_questions);

    let visual = question_type.is_visual().then(|| VisualContent {
        image_base64: None,
        description: raw
            .visual_description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| question.clone()),
    });

    let difficulty = raw
        .difficulty
        .as_ref()
        .and_then(Value::as_f64)
        .map(|d| d.round().clamp(1.0, 5.0) as u8)
        .unwrap_or_else(|| config.difficulty.level());

    let categories = if raw.categories.is_empty() {
        config.categories.clone()
    } else {
        raw.categories
    };

    Some(AdvancedQuestion {
        id: Uuid::new_v4().to_string(),
        question_type,
        question,
        options: if question_type.is_choice() { options } else { Vec::new() },
        correct_answer,
        explanation: raw.explanation.trim().to_string(),
        sub_questions: if question_type.is_multi_part() {
            sub_questions
        } else {
            Vec::new()
        },
        visual,
        metadata: QuestionMetadata {
            difficulty,
            categories,
            estimated_time_seconds: raw
                .estimated_time_seconds
                .as_ref()
                .and_then(Value::as_f64)
                .filter(|t| *t > 0.0)
                .map(|t| t.round() as u32)
                .unwrap_or_else(|| default_time_seconds(question_type)),
            learning_objective: raw.learning_objective.trim().to_string(),
        },
        is_fallback: false,
    })
}

fn coerce_answer(
    question_type: QuestionType,
    raw: &Value,
    options: &[String],
    sub_questions: &[SubQuestion],
) -> CorrectAnswer {
    if question_type.is_choice() {
        if let Some(letter) = extract_letter(raw) {
            return CorrectAnswer::Text(letter.to_string());
        }
        // Some models answer with the option text rather than its letter.
        let text = value_text(raw);
        let position = options
            .iter()
            .position(|o| strip_option_prefix(o).eq_ignore_ascii_case(strip_option_prefix(&text)));
        return match position.and_then(|p| index_to_letter(p as i64)) {
            Some(letter) => CorrectAnswer::Text(letter.to_string()),
            None => CorrectAnswer::Text(text),
        };
    }

    if question_type.is_boolean() {
        return match raw {
            Value::Bool(b) => CorrectAnswer::Boolean(*b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" => CorrectAnswer::Boolean(true),
                "false" | "f" => CorrectAnswer::Boolean(false),
                _ => CorrectAnswer::Text(s.trim().to_string()),
            },
            other => CorrectAnswer::Text(value_text(other)),
        };
    }

    if question_type.is_multi_part() && !sub_questions.is_empty() {
        return CorrectAnswer::List(
            sub_questions
                .iter()
                .map(|sq| sq.correct_answer.clone())
                .collect(),
        );
    }

    CorrectAnswer::Text(value_text(raw))
}

fn strip_option_prefix(option: &str) -> &str {
    let trimmed = option.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), Some(')' | '.' | ':')) if c.is_ascii_alphabetic() => chars.as_str().trim(),
        _ => trimmed,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

fn default_time_seconds(question_type: QuestionType) -> u32 {
    match question_type {
        QuestionType::TrueFalseExplained => 30,
        QuestionType::MultipleChoice => 45,
        QuestionType::MultiPart | QuestionType::ShortEssay => 180,
        _ => 90,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::sample_config;

    #[test]
    fn extracts_json_from_fenced_and_chatty_output() {
        let fenced = "```json\n{\"questions\": []}\n```";
        assert!(extract_json(fenced).unwrap().get("questions").is_some());

        let chatty = "Sure! Here is your quiz:\n{\"questions\": [{\"question\": \"x\"}]}\nGood luck.";
        assert!(extract_json(chatty).unwrap().get("questions").is_some());

        let bare = "[{\"question\": \"x\"}]";
        assert!(extract_json(bare).unwrap().is_array());
    }

    #[test]
    fn refusal_text_is_a_provider_error() {
        let result = extract_json("I'm sorry, I can't help with that.");
        assert!(matches!(result, Err(AppError::ProviderError(_))));
    }

    #[test]
    fn object_without_questions_is_rejected() {
        let result = question_items(serde_json::json!({"items": []}));
        assert!(matches!(result, Err(AppError::ProviderError(_))));
    }

    #[test]
    fn multiple_choice_answers_become_letters() {
        let text = r#"{"questions": [
            {"type": "mcq", "question": "Capital of France?", "options": ["A) Berlin", "B) Paris"], "correct_answer": "B) Paris", "explanation": "Paris is the capital."},
            {"type": "multiple_choice", "question": "Capital of Spain?", "options": ["A) Madrid", "B) Rome"], "correct_answer": 0, "explanation": "Madrid is the capital."},
            {"type": "multiple_choice", "question": "Capital of Italy?", "options": ["A) Madrid", "B) Rome"], "correct_answer": "Rome", "explanation": "Rome is the capital."}
        ]}"#;
        let batch = parse_questions(text, &sample_config()).unwrap();

        let letters: Vec<_> = batch
            .questions
            .iter()
            .map(|q| q.correct_answer.clone())
            .collect();
        assert_eq!(
            letters,
            vec![
                CorrectAnswer::Text("B".into()),
                CorrectAnswer::Text("A".into()),
                CorrectAnswer::Text("B".into()),
            ]
        );
        assert_eq!(batch.questions[0].question_type, QuestionType::MultipleChoice);
    }

    #[test]
    fn true_false_strings_become_booleans() {
        let text = r#"[{"type": "true_false", "question": "Water boils at 100C at sea level.", "correct_answer": "True", "explanation": "Standard pressure."}]"#;
        let batch = parse_questions(text, &sample_config()).unwrap();
        assert_eq!(batch.questions[0].correct_answer, CorrectAnswer::Boolean(true));
        assert_eq!(batch.questions[0].metadata.estimated_time_seconds, 30);
    }

    #[test]
    fn multi_part_answers_come_from_sub_questions() {
        let text = r#"[{"type": "multi_part", "question": "About photosynthesis.",
            "sub_questions": [{"question": "Where?", "correct_answer": "Chloroplasts"}, {"question": "Gas?", "correct_answer": "Oxygen"}],
            "explanation": "Light reactions."}]"#;
        let batch = parse_questions(text, &sample_config()).unwrap();
        let q = &batch.questions[0];
        assert_eq!(q.sub_questions.len(), 2);
        assert_eq!(
            q.correct_answer,
            CorrectAnswer::List(vec!["Chloroplasts".into(), "Oxygen".into()])
        );
    }

    #[test]
    fn visual_types_carry_a_description() {
        let text = r#"[{"type": "chart_analysis", "question": "What trend is shown?", "visual_description": "Rising line", "correct_answer": "Increase", "explanation": "It goes up."}]"#;
        let batch = parse_questions(text, &sample_config()).unwrap();
        let visual = batch.questions[0].visual.as_ref().unwrap();
        assert_eq!(visual.description, "Rising line");
        assert!(visual.image_base64.is_none());
    }

    #[test]
    fn metadata_defaults_follow_config() {
        let mut config = sample_config();
        config.categories = vec!["genetics".into()];
        let text = r#"[{"question": "What is an allele?", "options": ["A) x", "B) y"], "correct_answer": "A", "explanation": "Definition.", "difficulty": 9}]"#;
        let batch = parse_questions(text, &config).unwrap();
        let q = &batch.questions[0];
        assert_eq!(q.question_type, config.primary_type());
        assert_eq!(q.metadata.difficulty, 5);
        assert_eq!(q.metadata.categories, vec!["genetics".to_string()]);
    }

    #[test]
    fn unreadable_items_are_counted_as_skipped() {
        let text = r#"[{"type": "crossword", "question": "?"}, {"type": "short_essay", "question": "  "}, 42,
            {"type": "essay", "question": "Explain osmosis.", "correct_answer": "Water moves across a membrane", "explanation": "Definition of osmosis."}]"#;
        let batch = parse_questions(text, &sample_config()).unwrap();
        assert_eq!(batch.questions.len(), 1);
        assert_eq!(batch.skipped, 3);
        assert_eq!(batch.questions[0].question_type, QuestionType::ShortEssay);
    }
}
