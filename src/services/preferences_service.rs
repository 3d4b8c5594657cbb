use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        preferences::{ExportFormat, MAX_FAVORITE_QUOTES},
        HistoryPreferences,
    },
    repositories::PreferencesRepository,
};

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub preferred_provider: Option<String>,
    pub preferred_model: Option<String>,
    pub default_export_format: Option<ExportFormat>,
    pub retention_days: Option<u32>,
    pub clear_retention: bool,
    pub auto_save: Option<bool>,
}

pub struct PreferencesService {
    repository: Arc<dyn PreferencesRepository>,
}

impl PreferencesService {
    pub fn new(repository: Arc<dyn PreferencesRepository>) -> Self {
        Self { repository }
    }

    /// Stored preferences, or defaults when the user has none yet.
    pub async fn get(&self, user_id: &str) -> AppResult<HistoryPreferences> {
        Ok(self
            .repository
            .find(user_id)
            .await?
            .unwrap_or_else(|| HistoryPreferences::new(user_id)))
    }

    pub async fn update(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> AppResult<HistoryPreferences> {
        let mut preferences = self.get(user_id).await?;

        if let Some(provider) = update.preferred_provider {
            preferences.preferred_provider = non_blank(provider);
        }
        if let Some(model) = update.preferred_model {
            preferences.preferred_model = non_blank(model);
        }
        if let Some(format) = update.default_export_format {
            preferences.default_export_format = format;
        }
        if update.clear_retention {
            preferences.retention_days = None;
        } else if let Some(days) = update.retention_days {
            preferences.retention_days = Some(days);
        }
        if let Some(auto_save) = update.auto_save {
            preferences.auto_save = auto_save;
        }

        self.repository.upsert(preferences).await
    }

    pub async fn add_favorite_quote(&self, user_id: &str, quote: &str) -> AppResult<HistoryPreferences> {
        let mut preferences = self.get(user_id).await?;

        if preferences.favorite_quotes.len() >= MAX_FAVORITE_QUOTES {
            return Err(AppError::BadRequest(format!(
                "At most {} favorite quotes can be saved",
                MAX_FAVORITE_QUOTES
            )));
        }
        if !preferences.add_favorite_quote(quote) {
            log::debug!("Quote already saved or blank for user {}", user_id);
            return Ok(preferences);
        }

        self.repository.upsert(preferences).await
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
