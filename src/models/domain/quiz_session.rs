use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::domain::question::AdvancedQuestion;
use crate::models::domain::quiz_config::{ContentType, QuizConfig};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceReference {
    pub kind: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl SourceReference {
    pub fn new(kind: ContentType, id: Option<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            title: title.into(),
            content_hash: None,
        }
    }

    /// Attach a SHA-256 fingerprint of the source text.
    pub fn with_content(mut self, content: &str) -> Self {
        self.content_hash = Some(fingerprint(content));
        self
    }
}

pub fn fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.trim().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryScore {
    pub correct: u32,
    pub total: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizSession {
    pub id: String,
    pub user_id: String,
    pub source: SourceReference,
    pub config: QuizConfig,
    pub questions: Vec<AdvancedQuestion>,
    /// One slot per question, `None` while unanswered.
    pub answers: Vec<Option<Value>>,
    pub score: u32,
    pub total_scored: u32,
    pub percentage: f64,
    pub category_scores: BTreeMap<String, CategoryScore>,
    pub time_spent_seconds: u64,
    pub ai_service: String,
    pub ai_model: String,
    #[serde(default)]
    pub fallback_count: u32,
    #[serde(with = "super::sortable_timestamp")]
    pub completed_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_surrounding_whitespace() {
        assert_eq!(fingerprint("  photosynthesis \n"), fingerprint("photosynthesis"));
        assert_eq!(fingerprint("abc").len(), 64);
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[test]
    fn source_reference_with_content_sets_hash() {
        let source = SourceReference::new(ContentType::Note, Some("note-1".into()), "Biology")
            .with_content("Cells are the basic unit of life.");

        assert_eq!(source.title, "Biology");
        assert!(source.content_hash.is_some());
    }
}
