use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReplaceOptions},
    Collection, IndexModel,
};

use crate::{
    db::{Database, QUIZ_PROGRESS},
    errors::AppResult,
    models::domain::QuizProgress,
};

/// One resumable snapshot per user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizProgressRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> AppResult<Option<QuizProgress>>;
    async fn upsert(&self, progress: QuizProgress) -> AppResult<QuizProgress>;
    async fn delete(&self, user_id: &str) -> AppResult<bool>;
}

pub struct MongoQuizProgressRepository {
    collection: Collection<QuizProgress>,
}

impl MongoQuizProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZ_PROGRESS);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for {} collection", QUIZ_PROGRESS);

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
impl QuizProgressRepository for MongoQuizProgressRepository {
    async fn find(&self, user_id: &str) -> AppResult<Option<QuizProgress>> {
        let progress = self.collection.find_one(doc! { "user_id": user_id }).await?;
        Ok(progress)
    }

    async fn upsert(&self, progress: QuizProgress) -> AppResult<QuizProgress> {
        self.collection
            .replace_one(doc! { "user_id": &progress.user_id }, &progress)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await?;
        Ok(progress)
    }

    async fn delete(&self, user_id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
