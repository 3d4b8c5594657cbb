use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    constants::prompts::QUIZ_GENERATOR_SYSTEM_PROMPT,
    errors::{AppError, AppResult},
    models::domain::{
        question::{CorrectAnswer, QuestionMetadata, SubQuestion},
        usage::TokenUsage,
        AdvancedQuestion, QuestionType, QuizConfig,
    },
    services::{
        llm_client::{CompletionRequest, LlmClient, LlmMessage},
        prompt_engine::QuizPromptEngine,
        quiz_validator::{is_valid_base64, QuizValidator},
        response_parser::parse_questions,
    },
};

pub const BASE_MAX_TOKENS: u32 = 4096;
pub const MIN_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const FALLBACK_MARKER: &str = "[Fallback question]";

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub questions: Vec<AdvancedQuestion>,
    pub generated_count: usize,
    pub fallback_count: usize,
    pub attempts: u32,
    pub warnings: Vec<String>,
    pub usage: TokenUsage,
    pub provider: String,
    pub model: String,
}

/// Collects accepted questions across attempts, rejecting invalid items and
/// repeats of question text already seen.
#[derive(Default)]
struct Accumulator {
    questions: Vec<AdvancedQuestion>,
    seen: HashSet<String>,
    rejected: usize,
}

impl Accumulator {
    fn offer(&mut self, question: AdvancedQuestion, config: &QuizConfig) {
        if !config.question_types.contains(&question.question_type) {
            log::debug!("Dropping question of unrequested type {}", question.question_type);
            self.rejected += 1;
            return;
        }

        let report = QuizValidator::validate_question(&question);
        if !report.valid {
            log::debug!("Dropping invalid question: {}", report.message());
            self.rejected += 1;
            return;
        }

        if !self.seen.insert(dedup_key(&question.question)) {
            log::debug!("Dropping duplicate question '{}'", question.summary(60));
            self.rejected += 1;
            return;
        }

        self.questions.push(question);
    }

    fn len(&self) -> usize {
        self.questions.len()
    }
}

fn dedup_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 4096, 3072, 2048, ... never below 1024.
pub fn token_budget(attempt: u32) -> u32 {
    BASE_MAX_TOKENS
        .saturating_sub((BASE_MAX_TOKENS / 4).saturating_mul(attempt))
        .max(MIN_MAX_TOKENS)
}

/// Releases the per-user generation slot when dropped.
struct GenerationGuard<'a> {
    active: &'a Mutex<HashSet<String>>,
    user_id: String,
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.user_id);
        }
    }
}

pub struct QuizGenerationService {
    max_attempts: u32,
    active: Mutex<HashSet<String>>,
}

impl QuizGenerationService {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    fn acquire(&self, user_id: &str) -> AppResult<GenerationGuard<'_>> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| AppError::InternalError("Generation guard is poisoned".to_string()))?;

        if !active.insert(user_id.to_string()) {
            return Err(AppError::AlreadyExists(
                "A quiz is already being generated for this user".to_string(),
            ));
        }

        Ok(GenerationGuard {
            active: &self.active,
            user_id: user_id.to_string(),
        })
    }

    pub async fn generate(
        &self,
        user_id: &str,
        content: &str,
        config: &QuizConfig,
        provider: Arc<dyn LlmClient>,
        model: Option<String>,
    ) -> AppResult<GenerationOutcome> {
        let report = QuizValidator::validate_config(config);
        if !report.valid {
            return Err(AppError::ValidationError(report.message()));
        }
        let report = QuizValidator::validate_content(content);
        if !report.valid {
            return Err(AppError::ValidationError(report.message()));
        }

        let _guard = self.acquire(user_id)?;
        let target = config.question_count as usize;
        let provider_name = provider.provider_name();
        let mut model_used = model.clone().unwrap_or_else(|| provider.default_model());

        log::info!(
            "Generating {} question(s) for user {} with {} ({})",
            target,
            user_id,
            provider_name,
            model_used
        );

        let mut accumulator = Accumulator::default();
        let mut usage = TokenUsage::default();
        let mut warnings = Vec::new();
        let mut last_error: Option<AppError> = None;
        let mut attempts = 0;

        while attempts < self.max_attempts && accumulator.len() < target {
            let prompt = if attempts == 0 {
                QuizPromptEngine::build_prompt(content, config)
            } else {
                QuizPromptEngine::build_supplementary_prompt(
                    content,
                    config,
                    target - accumulator.len(),
                    &accumulator.questions,
                )
            };

            let mut request = CompletionRequest::new(vec![
                LlmMessage::system(QUIZ_GENERATOR_SYSTEM_PROMPT),
                LlmMessage::user(prompt),
            ]);
            request.max_tokens = Some(token_budget(attempts));
            request.json_mode = true;
            request.model = model.clone();

            let attempt = attempts + 1;
            attempts += 1;

            let completion = match provider.complete(request).await {
                Ok(completion) => completion,
                Err(e) => {
                    log::warn!("Generation attempt {} failed at the provider: {}", attempt, e);
                    last_error = Some(e);
                    continue;
                }
            };

            usage.add(completion.usage);
            if !completion.model.is_empty() {
                model_used = completion.model;
            }

            match parse_questions(&completion.content, config) {
                Ok(batch) => {
                    let before = accumulator.len();
                    for question in batch.questions {
                        accumulator.offer(question, config);
                    }
                    log::info!(
                        "Attempt {} accepted {} question(s) ({} unreadable, {} rejected so far)",
                        attempt,
                        accumulator.len() - before,
                        batch.skipped,
                        accumulator.rejected
                    );
                }
                Err(e) => {
                    log::warn!("Generation attempt {} returned an unusable response: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        let mut questions = accumulator.questions;
        questions.truncate(target);
        let generated_count = questions.len();

        if generated_count * 2 < target {
            log::error!(
                "Generation for user {} produced {} of {} question(s) after {} attempt(s)",
                user_id,
                generated_count,
                target,
                attempts
            );
            let cause = last_error
                .map(|e| format!(": {}", e))
                .unwrap_or_default();
            return Err(AppError::GenerationError(format!(
                "Only {} of {} questions could be generated{}",
                generated_count, target, cause
            )));
        }

        let fallback_count = target - generated_count;
        if fallback_count > 0 {
            log::warn!(
                "Filling {} slot(s) with fallback questions for user {}",
                fallback_count,
                user_id
            );
            warnings.push(format!(
                "Generated {} of {} questions; added {} fallback question(s)",
                generated_count, target, fallback_count
            ));
            questions.extend(fallback_questions(content, config, fallback_count));
        }

        self.attach_images(provider.as_ref(), &mut questions, &mut warnings)
            .await;

        Ok(GenerationOutcome {
            questions,
            generated_count,
            fallback_count,
            attempts,
            warnings,
            usage,
            provider: provider_name,
            model: model_used,
        })
    }

    async fn attach_images(
        &self,
        provider: &dyn LlmClient,
        questions: &mut [AdvancedQuestion],
        warnings: &mut Vec<String>,
    ) {
        for (index, question) in questions.iter_mut().enumerate() {
            let question_type = question.question_type;
            let Some(visual) = question.visual.as_mut() else {
                continue;
            };
            if !question_type.is_visual() || visual.image_base64.is_some() {
                continue;
            }

            let prompt = QuizPromptEngine::build_image_prompt(question_type, &visual.description);
            match provider.generate_image(&prompt).await {
                Ok(image) if is_valid_base64(&image) => visual.image_base64 = Some(image),
                Ok(_) => {
                    log::warn!("Image for question {} was not valid base64", index + 1);
                    warnings.push(format!("Question {} is shown without its image", index + 1));
                }
                Err(e) => {
                    log::warn!("Image generation for question {} failed: {}", index + 1, e);
                    warnings.push(format!("Question {} is shown without its image", index + 1));
                }
            }
        }
    }
}

fn first_sentence(content: &str) -> String {
    let trimmed = content.trim();
    let end = trimmed
        .find(['.', '!', '?'])
        .map(|i| i + 1)
        .unwrap_or(trimmed.len());
    let sentence: String = trimmed[..end].chars().take(200).collect();
    sentence.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generic review questions used when the provider under-delivers.
pub fn fallback_questions(
    content: &str,
    config: &QuizConfig,
    count: usize,
) -> Vec<AdvancedQuestion> {
    let mut types: Vec<QuestionType> = Vec::new();
    for t in &config.question_types {
        if !types.contains(t) {
            types.push(*t);
        }
    }
    if types.is_empty() {
        types.push(QuestionType::ShortEssay);
    }

    let key_idea = first_sentence(content);

    (0..count)
        .map(|i| fallback_question(types[i % types.len()], i + 1, &key_idea, config))
        .collect()
}

fn fallback_question(
    question_type: QuestionType,
    number: usize,
    key_idea: &str,
    config: &QuizConfig,
) -> AdvancedQuestion {
    let mut options = Vec::new();
    let mut sub_questions = Vec::new();

    let (question, correct_answer) = match question_type {
        QuestionType::MultipleChoice => {
            options = vec![
                "A) Rereading the text once".to_string(),
                "B) Explaining the key ideas in your own words".to_string(),
                "C) Skipping the summary sections".to_string(),
                "D) Memorizing page numbers".to_string(),
            ];
            (
                format!(
                    "Review question {}: Which approach best helps you retain the key ideas of this material?",
                    number
                ),
                CorrectAnswer::Text("B".to_string()),
            )
        }
        QuestionType::TrueFalseExplained => (
            format!(
                "Review question {}: Reviewing this material again after a few days improves long-term retention.",
                number
            ),
            CorrectAnswer::Boolean(true),
        ),
        QuestionType::MultiPart => {
            sub_questions = vec![
                SubQuestion {
                    question: "What is the central idea of the material?".to_string(),
                    correct_answer: key_idea.to_string(),
                },
                SubQuestion {
                    question: "Give one example or detail that supports it.".to_string(),
                    correct_answer: "Any supporting detail from the material".to_string(),
                },
            ];
            (
                format!("Review question {}: Break down the material into its main parts.", number),
                CorrectAnswer::List(sub_questions.iter().map(|sq| sq.correct_answer.clone()).collect()),
            )
        }
        _ => (
            format!(
                "Review question {}: In your own words, summarize the most important idea of this material.",
                number
            ),
            CorrectAnswer::Text(key_idea.to_string()),
        ),
    };

    AdvancedQuestion {
        id: Uuid::new_v4().to_string(),
        question_type,
        question,
        options,
        correct_answer,
        explanation: format!(
            "{} This question was added because not enough questions could be generated from your content.",
            FALLBACK_MARKER
        ),
        sub_questions,
        visual: None,
        metadata: QuestionMetadata {
            difficulty: config.difficulty.level(),
            categories: config.categories.clone(),
            estimated_time_seconds: 60,
            learning_objective: "Review the key ideas of the material".to_string(),
        },
        is_fallback: true,
    }
}
