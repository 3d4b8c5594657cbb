use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    errors::AppResult,
    models::domain::{
        usage::{TokenUsage, UsageFeature, UsageSummary},
        UsageRecord,
    },
    repositories::UsageRepository,
};

pub struct UsageService {
    repository: Arc<dyn UsageRepository>,
}

impl UsageService {
    pub fn new(repository: Arc<dyn UsageRepository>) -> Self {
        Self { repository }
    }

    pub async fn record(
        &self,
        user_id: &str,
        provider: &str,
        model: &str,
        feature: UsageFeature,
        usage: TokenUsage,
    ) -> AppResult<()> {
        self.repository
            .record(UsageRecord {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                provider: provider.to_string(),
                model: model.to_string(),
                feature,
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                created_at: Utc::now(),
            })
            .await
    }

    /// Usage failures never fail the request that caused them.
    pub async fn record_quietly(
        &self,
        user_id: &str,
        provider: &str,
        model: &str,
        feature: UsageFeature,
        usage: TokenUsage,
    ) {
        if let Err(e) = self.record(user_id, provider, model, feature, usage).await {
            log::error!("Failed to record usage for user {}: {}", user_id, e);
        }
    }

    pub async fn summarize(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<UsageSummary>> {
        let records = self.repository.find_by_user(user_id, since).await?;
        Ok(summarize_records(&records))
    }
}

/// Aggregate per provider and model, ordered by provider then model.
pub fn summarize_records(records: &[UsageRecord]) -> Vec<UsageSummary> {
    let mut grouped: BTreeMap<(String, String), UsageSummary> = BTreeMap::new();

    for record in records {
        let summary = grouped
            .entry((record.provider.clone(), record.model.clone()))
            .or_insert_with(|| UsageSummary {
                provider: record.provider.clone(),
                model: record.model.clone(),
                ..UsageSummary::default()
            });
        summary.requests += 1;
        summary.prompt_tokens += u64::from(record.prompt_tokens);
        summary.completion_tokens += u64::from(record.completion_tokens);
    }

    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(provider: &str, model: &str, prompt: u32, completion: u32) -> UsageRecord {
        UsageRecord {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".into(),
            provider: provider.into(),
            model: model.into(),
            feature: UsageFeature::Chat,
            prompt_tokens: prompt,
            completion_tokens: completion,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summaries_group_by_provider_and_model() {
        let records = vec![
            record("openai", "gpt-4o-mini", 100, 20),
            record("groq", "llama", 10, 5),
            record("openai", "gpt-4o-mini", 50, 30),
            record("openai", "gpt-4o", 1, 1),
        ];

        let summaries = summarize_records(&records);
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].provider, "groq");
        assert_eq!(summaries[1].model, "gpt-4o");

        let mini = &summaries[2];
        assert_eq!(mini.requests, 2);
        assert_eq!(mini.prompt_tokens, 150);
        assert_eq!(mini.completion_tokens, 50);
    }

    #[test]
    fn no_records_no_summaries() {
        assert!(summarize_records(&[]).is_empty());
    }
}
