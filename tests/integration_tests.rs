use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use studyforge_server::{
    errors::{AppError, AppResult},
    models::domain::{question::CorrectAnswer, usage::TokenUsage, QuestionType, QuizConfig},
    services::{
        answer_normalizer::{answers_match, index_to_letter, letter_to_index, normalize},
        llm_client::{ChunkReceiver, Completion, CompletionRequest, LlmClient},
        quiz_generation_service::{GenerationOutcome, FALLBACK_MARKER},
        quiz_scoring_service::score_quiz,
        QuizGenerationService,
    },
};

/// Replies with queued completions, then fails once the script runs out.
struct ScriptedLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> String {
        "scripted".to_string()
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }

    async fn complete(&self, request: CompletionRequest) -> AppResult<Completion> {
        self.requests.lock().await.push(request);
        let content = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AppError::ProviderError("No scripted reply left".to_string())))?;
        Ok(Completion {
            content,
            model: "scripted-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 200,
                completion_tokens: 80,
            },
        })
    }

    async fn stream_chat(&self, _request: CompletionRequest) -> AppResult<ChunkReceiver> {
        Err(AppError::ProviderError("Streaming is not scripted".to_string()))
    }

    async fn generate_image(&self, _prompt: &str) -> AppResult<String> {
        Ok("aGVsbG8gd29ybGQ=".to_string())
    }
}

fn study_material() -> String {
    let paragraph = "The water cycle moves water between oceans, the atmosphere and land. \
        Evaporation lifts water vapour from warm surfaces, condensation forms clouds, \
        and precipitation returns water to the ground where it collects in rivers. ";
    paragraph.repeat(3000 / paragraph.len() + 1).chars().take(3000).collect()
}

fn config(types: Vec<QuestionType>, count: u8) -> QuizConfig {
    QuizConfig {
        question_types: types,
        question_count: count,
        ..QuizConfig::default()
    }
}

fn multiple_choice_items(range: std::ops::Range<usize>) -> String {
    let items: Vec<Value> = range
        .map(|i| {
            json!({
                "type": "multiple_choice",
                "question": format!("Which stage of the water cycle is described in fact {}?", i),
                "options": ["A) Evaporation", "B) Condensation", "C) Precipitation", "D) Collection"],
                "correct_answer": "B",
                "explanation": "Clouds form when water vapour condenses."
            })
        })
        .collect();
    json!({ "questions": items }).to_string()
}

async fn generate(llm: ScriptedLlm, config: &QuizConfig) -> AppResult<GenerationOutcome> {
    QuizGenerationService::new(3)
        .generate("learner-1", &study_material(), config, Arc::new(llm), None)
        .await
}

#[tokio::test]
async fn five_true_false_questions_have_boolean_answers() {
    let items: Vec<Value> = (0..5)
        .map(|i| {
            json!({
                "type": "true_false",
                "question": format!("Statement {}: condensation forms clouds.", i),
                "correct_answer": if i % 2 == 0 { "True" } else { "false" },
                "explanation": "The material explains how clouds form."
            })
        })
        .collect();
    let llm = ScriptedLlm::new(vec![Ok(json!(items).to_string())]);

    let outcome = generate(llm, &config(vec![QuestionType::TrueFalseExplained], 5))
        .await
        .unwrap();

    assert_eq!(outcome.questions.len(), 5);
    assert_eq!(outcome.fallback_count, 0);
    for (i, question) in outcome.questions.iter().enumerate() {
        assert_eq!(question.question_type, QuestionType::TrueFalseExplained);
        assert_eq!(question.correct_answer, CorrectAnswer::Boolean(i % 2 == 0));
    }
}

#[tokio::test]
async fn half_generated_is_backfilled_to_exact_count() {
    for count in [1u8, 7, 12, 50] {
        let generated = (count as usize).div_ceil(2);
        let llm = ScriptedLlm::new(vec![Ok(multiple_choice_items(0..generated))]);

        let outcome = generate(llm, &config(vec![QuestionType::MultipleChoice], count))
            .await
            .unwrap();

        assert_eq!(outcome.questions.len(), count as usize, "count {}", count);
        assert_eq!(outcome.generated_count, generated);
        assert_eq!(outcome.fallback_count, count as usize - generated);

        let fallbacks: Vec<_> = outcome.questions.iter().filter(|q| q.is_fallback).collect();
        assert_eq!(fallbacks.len(), outcome.fallback_count);
        assert!(fallbacks.iter().all(|q| q.explanation.starts_with(FALLBACK_MARKER)));
    }
}

#[tokio::test]
async fn retries_ask_only_for_the_missing_questions() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(multiple_choice_items(0..2)),
        Ok("I'm sorry, I can't help with that.".to_string()),
        Ok(multiple_choice_items(2..4)),
    ]));

    let outcome = QuizGenerationService::new(3)
        .generate(
            "learner-1",
            &study_material(),
            &config(vec![QuestionType::MultipleChoice], 4),
            llm.clone(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.generated_count, 4);
    assert_eq!(outcome.fallback_count, 0);

    let requests = llm.requests.lock().await;
    assert_eq!(requests.len(), 3);
    let budgets: Vec<_> = requests.iter().map(|r| r.max_tokens).collect();
    assert_eq!(budgets, vec![Some(4096), Some(3072), Some(2048)]);
    assert!(requests.iter().all(|r| r.json_mode));
}

#[tokio::test]
async fn less_than_half_generated_is_an_error() {
    let llm = ScriptedLlm::new(vec![Ok(multiple_choice_items(0..4))]);

    let result = generate(llm, &config(vec![QuestionType::MultipleChoice], 10)).await;

    match result {
        Err(AppError::GenerationError(msg)) => assert!(msg.contains("4 of 10"), "{}", msg),
        other => panic!("Expected GenerationError, got {:?}", other.map(|o| o.questions.len())),
    }
}

#[tokio::test]
async fn fallback_questions_are_never_scored() {
    let llm = ScriptedLlm::new(vec![Ok(multiple_choice_items(0..3))]);
    let outcome = generate(llm, &config(vec![QuestionType::MultipleChoice], 5))
        .await
        .unwrap();

    let answers: Vec<Option<Value>> = outcome
        .questions
        .iter()
        .map(|q| Some(q.correct_value()))
        .collect();
    let score = score_quiz(&outcome.questions, &answers).unwrap();

    assert_eq!(score.total_scored, 3);
    assert_eq!(score.score, 3);
    assert_eq!(score.fallback_count, 2);
    assert_eq!(score.percentage, 100.0);
}

#[tokio::test]
async fn visual_questions_carry_generated_images() {
    let item = json!([{
        "type": "chart_analysis",
        "question": "What trend does the rainfall chart show across the seasons?",
        "correct_answer": "Rainfall peaks in the wet season",
        "explanation": "The chart rises sharply in the wet months.",
        "visual_description": "Bar chart of monthly rainfall"
    }]);
    let llm = ScriptedLlm::new(vec![Ok(item.to_string())]);

    let outcome = generate(llm, &config(vec![QuestionType::ChartAnalysis], 1))
        .await
        .unwrap();

    let visual = outcome.questions[0].visual.as_ref().unwrap();
    assert_eq!(visual.image_base64.as_deref(), Some("aGVsbG8gd29ybGQ="));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn letter_answer_matches_full_option_text() {
    assert!(answers_match(
        QuestionType::MultipleChoice,
        &json!("B"),
        &json!("B) Paris")
    ));
    assert!(answers_match(QuestionType::MultipleChoice, &json!(1), &json!("B")));
    assert!(!answers_match(QuestionType::MultipleChoice, &json!("C"), &json!("B) Paris")));
}

#[test]
fn paraphrased_answer_matches() {
    assert!(answers_match(
        QuestionType::ScenarioBased,
        &json!("it helps reduce cost"),
        &json!("reduces operational cost significantly")
    ));
}

#[test]
fn index_and_letter_mapping_agree() {
    for index in 0..4i64 {
        let letter = index_to_letter(index).unwrap();
        assert_eq!(letter_to_index(letter), Some(index as usize));
    }
    assert_eq!(index_to_letter(4), None);
    assert_eq!(letter_to_index('e'), None);
}

#[test]
fn normalization_is_idempotent_for_every_type() {
    let samples = [
        json!("b) Paris"),
        json!(2),
        json!("TRUE"),
        json!(false),
        json!("  Photosynthesis   makes sugar "),
        json!(["In the chloroplasts", " Oxygen "]),
        json!(""),
        Value::Null,
    ];

    for question_type in QuestionType::ALL {
        for raw in &samples {
            let once = normalize(question_type, raw);
            let twice = normalize(question_type, &once.to_value());
            assert_eq!(once, twice, "{} on {}", question_type, raw);
        }
    }
}
