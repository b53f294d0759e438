//! User Directory Repository
//!
//! Reads and role updates on the platform `users` collection, plus the run
//! and service-account lookups behind inactive-account reporting.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::shared::document::id_string;
use crate::shared::error::Result;
use crate::user_management::entity::UserAccount;

const SERVICE_ACCOUNT_TOKENS: &str = "service_account_tokens";

/// User data access used by the user-management endpoints.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_login(&self, login_id: &str) -> Result<Option<UserAccount>>;

    async fn set_system_roles(&self, user_id: &Bson, roles: &[String]) -> Result<()>;

    /// Identity-provider ids for the given login ids, in directory order.
    /// Logins without an account or without an `idpId` are skipped.
    async fn idp_ids_for_logins(&self, login_ids: &[String]) -> Result<Vec<String>>;

    async fn list_accounts(&self) -> Result<Vec<UserAccount>>;

    /// Distinct `startingUserId` of runs queued after `since`.
    async fn starting_user_ids_since(&self, since: DateTime<Utc>) -> Result<Vec<Bson>>;

    /// Empty when the platform has no service-account token collection.
    async fn service_account_idp_ids(&self) -> Result<HashSet<String>>;
}

pub struct UserRepository {
    db: Database,
    users: Collection<Document>,
    runs: Collection<Document>,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            users: db.collection("users"),
            runs: db.collection("runs"),
        }
    }

    fn to_accounts(docs: Vec<Document>) -> Vec<UserAccount> {
        docs.iter()
            .filter_map(|d| {
                let account = UserAccount::from_document(d);
                if account.is_none() {
                    warn!(id = ?d.get("_id"), "Skipping user without loginId.id");
                }
                account
            })
            .collect()
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_login(&self, login_id: &str) -> Result<Option<UserAccount>> {
        let found = self.users.find_one(doc! { "loginId.id": login_id }).await?;
        Ok(found.as_ref().and_then(UserAccount::from_document))
    }

    async fn set_system_roles(&self, user_id: &Bson, roles: &[String]) -> Result<()> {
        let mut filter = Document::new();
        filter.insert("_id", user_id.clone());
        self.users
            .update_one(filter, doc! { "$set": { "_systemRoles": roles.to_vec() } })
            .await?;
        Ok(())
    }

    async fn idp_ids_for_logins(&self, login_ids: &[String]) -> Result<Vec<String>> {
        let wanted: HashSet<&str> = login_ids.iter().map(String::as_str).collect();
        let accounts = self.list_accounts().await?;

        Ok(accounts
            .into_iter()
            .filter(|a| wanted.contains(a.login_id.as_str()))
            .filter_map(|a| {
                if a.idp_id.is_none() {
                    warn!(login_id = %a.login_id, "User has no idpId, skipping");
                }
                a.idp_id
            })
            .collect())
    }

    async fn list_accounts(&self) -> Result<Vec<UserAccount>> {
        let cursor = self
            .users
            .find(doc! {})
            .projection(doc! { "loginId.id": 1, "idpId": 1, "_systemRoles": 1 })
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(Self::to_accounts(docs))
    }

    async fn starting_user_ids_since(&self, since: DateTime<Utc>) -> Result<Vec<Bson>> {
        let filter = doc! { "queued": { "$gt": bson::DateTime::from_chrono(since) } };
        let ids = self.runs.distinct("startingUserId", filter).await?;
        debug!(count = ids.len(), %since, "Loaded active run owners");
        Ok(ids)
    }

    async fn service_account_idp_ids(&self) -> Result<HashSet<String>> {
        let collections = self.db.list_collection_names().await?;
        if !collections.iter().any(|c| c == SERVICE_ACCOUNT_TOKENS) {
            return Ok(HashSet::new());
        }

        let ids = self
            .db
            .collection::<Document>(SERVICE_ACCOUNT_TOKENS)
            .distinct("serviceAccountIdpId", doc! {})
            .await?;
        Ok(ids.iter().filter_map(id_string).collect())
    }
}
