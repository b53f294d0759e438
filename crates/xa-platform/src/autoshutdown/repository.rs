//! Auto-Shutdown Repository
//!
//! Central config reads plus `users` / `userPreferences` access.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::warn;

use crate::autoshutdown::entity::{
    config_keys, user_filter, AutoShutdownSettings, PreferenceUpdate, UserPreferenceSnapshot,
};
use crate::shared::document::{as_bool, as_i64, get_path};
use crate::shared::error::Result;

/// Persistence needed by the bulk auto-shutdown apply.
#[async_trait]
pub trait AutoShutdownStore: Send + Sync {
    async fn settings(&self) -> Result<AutoShutdownSettings>;

    /// Every user with a flag telling whether it has preference records.
    async fn users_with_preferences(&self) -> Result<Vec<UserPreferenceSnapshot>>;

    /// Returns the number of documents removed.
    async fn delete_preferences(&self, user_id: &Bson) -> Result<u64>;

    async fn upsert_preferences(&self, update: &PreferenceUpdate) -> Result<()>;
}

/// Central config (`config` collection) reader
pub struct CentralConfigRepository {
    collection: Collection<Document>,
}

impl CentralConfigRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("config"),
        }
    }

    /// Raw value of a config key, if set.
    pub async fn find_value(&self, namespace: &str, key: &str) -> Result<Option<Bson>> {
        let found = self
            .collection
            .find_one(doc! { "namespace": namespace, "key": key })
            .await?;
        Ok(found.and_then(|d| d.get("value").cloned()))
    }

    pub async fn find_bool(&self, namespace: &str, key: &str) -> Result<bool> {
        Ok(self
            .find_value(namespace, key)
            .await?
            .map(|v| as_bool(&v))
            .unwrap_or(false))
    }

    pub async fn find_i64(&self, namespace: &str, key: &str) -> Result<i64> {
        let value = self.find_value(namespace, key).await?;
        Ok(match value {
            Some(v) => as_i64(&v).unwrap_or_else(|| {
                warn!(namespace, key, value = ?v, "Non-numeric central config value, using 0");
                0
            }),
            None => 0,
        })
    }
}

pub struct AutoShutdownRepository {
    config: CentralConfigRepository,
    users: Collection<Document>,
    preferences: Collection<Document>,
}

impl AutoShutdownRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            config: CentralConfigRepository::new(db),
            users: db.collection("users"),
            preferences: db.collection("userPreferences"),
        }
    }
}

#[async_trait]
impl AutoShutdownStore for AutoShutdownRepository {
    async fn settings(&self) -> Result<AutoShutdownSettings> {
        let ns = config_keys::NAMESPACE;
        Ok(AutoShutdownSettings {
            enabled: self.config.find_bool(ns, config_keys::AUTO_SHUTDOWN_ENABLED).await?,
            max_lifetime: self.config.find_i64(ns, config_keys::GLOBAL_MAX_LIFETIME).await?,
            default_lifetime: self.config.find_i64(ns, config_keys::GLOBAL_DEFAULT_LIFETIME).await?,
            notifications_enabled: self.config.find_bool(ns, config_keys::NOTIFICATIONS_ENABLED).await?,
            notification_period: self.config.find_i64(ns, config_keys::NOTIFICATION_PERIOD).await?,
        })
    }

    async fn users_with_preferences(&self) -> Result<Vec<UserPreferenceSnapshot>> {
        let pipeline = vec![
            doc! {
                "$lookup": {
                    "from": "userPreferences",
                    "localField": "_id",
                    "foreignField": "userId",
                    "as": "joinedResult",
                }
            },
            doc! {
                "$project": {
                    "loginId.id": 1,
                    "joinedCount": { "$size": "$joinedResult" },
                }
            },
        ];

        let cursor = self.users.aggregate(pipeline).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        Ok(docs
            .into_iter()
            .filter_map(|d| {
                let user_id = d.get("_id").cloned()?;
                let Some(Bson::String(login_id)) = get_path(&d, "loginId.id").cloned() else {
                    warn!(id = ?user_id, "Skipping user without loginId.id");
                    return None;
                };
                let joined = d.get("joinedCount").and_then(as_i64).unwrap_or(0);
                Some(UserPreferenceSnapshot {
                    user_id,
                    login_id,
                    has_preferences: joined > 0,
                })
            })
            .collect())
    }

    async fn delete_preferences(&self, user_id: &Bson) -> Result<u64> {
        let result = self.preferences.delete_one(user_filter(user_id)).await?;
        Ok(result.deleted_count)
    }

    async fn upsert_preferences(&self, update: &PreferenceUpdate) -> Result<()> {
        self.preferences
            .update_one(update.filter(), doc! { "$set": update.to_set_document() })
            .upsert(true)
            .await?;
        Ok(())
    }
}
