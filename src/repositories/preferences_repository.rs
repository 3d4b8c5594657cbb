use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReplaceOptions},
    Collection, IndexModel,
};

use crate::{
    db::{Database, HISTORY_PREFERENCES},
    errors::AppResult,
    models::domain::HistoryPreferences,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> AppResult<Option<HistoryPreferences>>;
    async fn upsert(&self, preferences: HistoryPreferences) -> AppResult<HistoryPreferences>;
}

pub struct MongoPreferencesRepository {
    collection: Collection<HistoryPreferences>,
}

impl MongoPreferencesRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(HISTORY_PREFERENCES);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_index).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferencesRepository for MongoPreferencesRepository {
    async fn find(&self, user_id: &str) -> AppResult<Option<HistoryPreferences>> {
        let preferences = self.collection.find_one(doc! { "user_id": user_id }).await?;
        Ok(preferences)
    }

    async fn upsert(&self, preferences: HistoryPreferences) -> AppResult<HistoryPreferences> {
        self.collection
            .replace_one(doc! { "user_id": &preferences.user_id }, &preferences)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await?;
        Ok(preferences)
    }
}
