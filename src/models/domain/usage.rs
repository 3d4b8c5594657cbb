use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageFeature {
    QuizGeneration,
    Chat,
    ImageGeneration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsageRecord {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub model: String,
    pub feature: UsageFeature,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(with = "super::sortable_timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, SimpleObject)]
pub struct UsageSummary {
    pub provider: String,
    pub model: String,
    pub requests: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 40,
        });
        usage.add(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        });

        assert_eq!(usage.prompt_tokens, 110);
        assert_eq!(usage.total(), 155);
    }
}
