use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, USAGE_RECORDS},
    errors::AppResult,
    models::domain::UsageRecord,
    repositories::quiz_session_repository::timestamp_key,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn record(&self, record: UsageRecord) -> AppResult<()>;
    async fn find_by_user(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<UsageRecord>>;
}

pub struct MongoUsageRepository {
    collection: Collection<UsageRecord>,
}

impl MongoUsageRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(USAGE_RECORDS);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let user_created_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_created".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_created_index).await?;
        Ok(())
    }
}

#[async_trait]
impl UsageRepository for MongoUsageRepository {
    async fn record(&self, record: UsageRecord) -> AppResult<()> {
        self.collection.insert_one(&record).await?;
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<UsageRecord>> {
        let mut filter = doc! { "user_id": user_id };
        if let Some(since) = since {
            filter.insert("created_at", doc! { "$gte": timestamp_key(&since) });
        }

        let records = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(records)
    }
}
