//! Project Repository

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::warn;

use crate::project::entity::Project;
use crate::shared::error::Result;
use crate::shared::lookup_table::TableSource;

pub struct ProjectRepository {
    collection: Collection<Document>,
}

impl ProjectRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("projects"),
        }
    }

    pub async fn find_all(&self) -> Result<Vec<Project>> {
        let cursor = self
            .collection
            .find(doc! {})
            .projection(doc! {
                "overrideV2EnvironmentId": 1,
                "defaultEnvironmentRevisionSpec": 1,
            })
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        Ok(docs
            .iter()
            .filter_map(|d| {
                let project = Project::from_document(d);
                if project.is_none() {
                    warn!(id = ?d.get("_id"), "Skipping malformed project");
                }
                project
            })
            .collect())
    }
}

#[async_trait]
impl TableSource<Project> for ProjectRepository {
    async fn load_all(&self) -> Result<Vec<Project>> {
        self.find_all().await
    }
}
