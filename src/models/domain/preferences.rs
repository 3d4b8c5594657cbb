use serde::{Deserialize, Serialize};

pub const MAX_FAVORITE_QUOTES: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryPreferences {
    pub user_id: String,
    #[serde(default)]
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub preferred_model: Option<String>,
    #[serde(default)]
    pub default_export_format: ExportFormat,
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,
    #[serde(default)]
    pub favorite_quotes: Vec<String>,
}

fn default_auto_save() -> bool {
    true
}

impl HistoryPreferences {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            preferred_provider: None,
            preferred_model: None,
            default_export_format: ExportFormat::Json,
            retention_days: None,
            auto_save: true,
            favorite_quotes: Vec::new(),
        }
    }

    /// Returns false when the quote was already saved or the list is full.
    pub fn add_favorite_quote(&mut self, quote: &str) -> bool {
        let quote = quote.trim();
        if quote.is_empty()
            || self.favorite_quotes.len() >= MAX_FAVORITE_QUOTES
            || self.favorite_quotes.iter().any(|q| q == quote)
        {
            return false;
        }
        self.favorite_quotes.push(quote.to_string());
        true
    }
}
