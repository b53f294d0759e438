//! Environment Revision Repository

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::warn;

use crate::environment::entity::EnvironmentRevision;
use crate::shared::error::Result;
use crate::shared::lookup_table::TableSource;

pub struct EnvironmentRevisionRepository {
    collection: Collection<Document>,
}

impl EnvironmentRevisionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("environment_revisions"),
        }
    }

    pub async fn find_all(&self) -> Result<Vec<EnvironmentRevision>> {
        let cursor = self
            .collection
            .find(doc! {})
            .projection(doc! {
                "environmentId": 1,
                "metadata.number": 1,
                "definition.dockerImage": 1,
                "definition.baseEnvironmentRevisionId": 1,
            })
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        Ok(docs
            .iter()
            .filter_map(|d| {
                let revision = EnvironmentRevision::from_document(d);
                if revision.is_none() {
                    warn!(id = ?d.get("_id"), "Skipping malformed environment revision");
                }
                revision
            })
            .collect())
    }
}

#[async_trait]
impl TableSource<EnvironmentRevision> for EnvironmentRevisionRepository {
    async fn load_all(&self) -> Result<Vec<EnvironmentRevision>> {
        self.find_all().await
    }
}
