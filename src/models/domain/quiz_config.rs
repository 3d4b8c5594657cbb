use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::domain::question::QuestionType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Note,
    File,
    #[default]
    Text,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    /// Metadata difficulty on the 1-5 scale.
    pub fn level(&self) -> u8 {
        match self {
            Difficulty::Beginner => 2,
            Difficulty::Intermediate => 3,
            Difficulty::Advanced => 4,
            Difficulty::Expert => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Surface,
    #[default]
    Moderate,
    Deep,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct QuizConfig {
    pub content_type: ContentType,
    pub question_types: Vec<QuestionType>,
    pub difficulty: Difficulty,
    pub question_count: u8,
    pub depth: AnalysisDepth,
    pub categories: Vec<String>,
    pub custom_keywords: Vec<String>,
    pub include_explanations: bool,
    pub enable_multi_part: bool,
    pub include_visuals: bool,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::Text,
            question_types: vec![QuestionType::MultipleChoice],
            difficulty: Difficulty::Intermediate,
            question_count: 10,
            depth: AnalysisDepth::Moderate,
            categories: Vec::new(),
            custom_keywords: Vec::new(),
            include_explanations: true,
            enable_multi_part: false,
            include_visuals: false,
        }
    }
}

impl QuizConfig {
    /// Question type used when a generated item has no usable type of its own.
    pub fn primary_type(&self) -> QuestionType {
        self.question_types
            .first()
            .copied()
            .unwrap_or(QuestionType::MultipleChoice)
    }
}
