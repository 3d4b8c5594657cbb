use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document, Regex},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, QUIZ_SESSIONS},
    errors::AppResult,
    models::domain::{sortable_timestamp, QuizSession},
};

/// Optional history filters; all present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizSessionFilter {
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub min_percentage: Option<f64>,
}

impl QuizSessionFilter {
    pub fn matches(&self, session: &QuizSession) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !session
                .source
                .title
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if self.from.is_some_and(|from| session.completed_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| session.completed_at > to) {
            return false;
        }
        if self.min_percentage.is_some_and(|min| session.percentage < min) {
            return false;
        }
        true
    }
}

/// Query bound in the same fixed-width form the timestamps are stored in.
pub fn timestamp_key(ts: &DateTime<Utc>) -> String {
    sortable_timestamp::format(ts)
}

fn filter_document(user_id: &str, filter: &QuizSessionFilter) -> Document {
    let mut query = doc! { "user_id": user_id };

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.insert(
            "source.title",
            Regex {
                pattern: regex::escape(search),
                options: "i".to_string(),
            },
        );
    }

    let mut completed = Document::new();
    if let Some(from) = &filter.from {
        completed.insert("$gte", timestamp_key(from));
    }
    if let Some(to) = &filter.to {
        completed.insert("$lte", timestamp_key(to));
    }
    if !completed.is_empty() {
        query.insert("completed_at", completed);
    }

    if let Some(min) = filter.min_percentage {
        query.insert("percentage", doc! { "$gte": min });
    }

    query
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizSessionRepository: Send + Sync {
    async fn create(&self, session: QuizSession) -> AppResult<QuizSession>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizSession>>;
    /// Newest first, with the total matching count.
    async fn find_by_user(
        &self,
        user_id: &str,
        filter: &QuizSessionFilter,
        offset: u64,
        limit: i64,
    ) -> AppResult<(Vec<QuizSession>, u64)>;
    async fn delete(&self, user_id: &str, id: &str) -> AppResult<bool>;
    async fn delete_all_for_user(&self, user_id: &str) -> AppResult<u64>;
    async fn delete_older_than(&self, user_id: &str, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

pub struct MongoQuizSessionRepository {
    collection: Collection<QuizSession>,
}

impl MongoQuizSessionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZ_SESSIONS);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for {} collection", QUIZ_SESSIONS);

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_completed_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "completed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_completed".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_completed_index).await?;

        log::info!("Successfully created indexes for {} collection", QUIZ_SESSIONS);
        Ok(())
    }
}

#[async_trait]
impl QuizSessionRepository for MongoQuizSessionRepository {
    async fn create(&self, session: QuizSession) -> AppResult<QuizSession> {
        self.collection.insert_one(&session).await?;
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizSession>> {
        let session = self.collection.find_one(doc! { "id": id }).await?;
        Ok(session)
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        filter: &QuizSessionFilter,
        offset: u64,
        limit: i64,
    ) -> AppResult<(Vec<QuizSession>, u64)> {
        let query = filter_document(user_id, filter);
        let total = self.collection.count_documents(query.clone()).await?;

        let sessions = self
            .collection
            .find(query)
            .sort(doc! { "completed_at": -1 })
            .skip(offset)
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        Ok((sessions, total))
    }

    async fn delete(&self, user_id: &str, id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "id": id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "user_id": user_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_older_than(&self, user_id: &str, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! {
                "user_id": user_id,
                "completed_at": { "$lt": timestamp_key(&cutoff) }
            })
            .await?;
        Ok(result.deleted_count)
    }
}
