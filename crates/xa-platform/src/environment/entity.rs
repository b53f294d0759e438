//! Environment Revision Entity

use bson::{Bson, Document};

use crate::shared::document::{as_i64, get_path, id_string};
use crate::shared::lookup_table::Keyed;

/// One revision of a compute environment (collection `environment_revisions`).
///
/// A revision either names its docker image directly or inherits it from a
/// parent revision. When both are present the image wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRevision {
    pub id: String,
    pub environment_id: String,
    /// Revision number within the environment (`metadata.number`)
    pub version: i64,
    pub docker_image: Option<String>,
    pub base_environment_revision_id: Option<String>,
}

impl EnvironmentRevision {
    pub fn new(id: impl Into<String>, environment_id: impl Into<String>, version: i64) -> Self {
        Self {
            id: id.into(),
            environment_id: environment_id.into(),
            version,
            docker_image: None,
            base_environment_revision_id: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = Some(image.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.base_environment_revision_id = Some(parent_id.into());
        self
    }

    /// Build from a raw document. Returns `None` when `_id`, `environmentId`
    /// or `metadata.number` is missing or has the wrong type.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let id = doc.get("_id").and_then(id_string)?;
        let environment_id = doc.get("environmentId").and_then(id_string)?;
        let version = get_path(doc, "metadata.number").and_then(as_i64)?;

        let docker_image = match get_path(doc, "definition.dockerImage") {
            Some(Bson::String(image)) => Some(image.clone()),
            _ => None,
        };
        let base_environment_revision_id =
            get_path(doc, "definition.baseEnvironmentRevisionId").and_then(id_string);

        Some(Self {
            id,
            environment_id,
            version,
            docker_image,
            base_environment_revision_id,
        })
    }
}

impl Keyed for EnvironmentRevision {
    fn key(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn test_from_document_with_parent() {
        let id = ObjectId::new();
        let env = ObjectId::new();
        let parent = ObjectId::new();
        let d = doc! {
            "_id": id,
            "environmentId": env,
            "metadata": { "number": 4_i64 },
            "definition": { "baseEnvironmentRevisionId": parent, "dockerImage": Bson::Null },
        };

        let rev = EnvironmentRevision::from_document(&d).unwrap();
        assert_eq!(rev.id, id.to_hex());
        assert_eq!(rev.environment_id, env.to_hex());
        assert_eq!(rev.version, 4);
        assert_eq!(rev.docker_image, None);
        assert_eq!(rev.base_environment_revision_id, Some(parent.to_hex()));
    }

    #[test]
    fn test_from_document_with_image() {
        let d = doc! {
            "_id": "r1",
            "environmentId": "e1",
            "metadata": { "number": 1.0 },
            "definition": { "dockerImage": "quay.io/acme/base:1" },
        };

        let rev = EnvironmentRevision::from_document(&d).unwrap();
        assert_eq!(rev.docker_image.as_deref(), Some("quay.io/acme/base:1"));
        assert_eq!(rev.version, 1);
    }

    #[test]
    fn test_from_document_rejects_missing_number() {
        let d = doc! { "_id": "r1", "environmentId": "e1", "definition": {} };
        assert!(EnvironmentRevision::from_document(&d).is_none());
    }
}
