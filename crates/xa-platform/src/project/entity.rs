//! Project Entity

use bson::Document;
use serde_json::Value;

use crate::shared::document::id_string;
use crate::shared::lookup_table::Keyed;

/// Project fields exposed by the enriched project listing (collection `projects`).
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    /// `overrideV2EnvironmentId`
    pub environment_id: Option<String>,
    /// `defaultEnvironmentRevisionSpec`, as relaxed extended JSON
    pub default_environment_revision_spec: Value,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            environment_id: None,
            default_environment_revision_spec: Value::Null,
        }
    }

    pub fn from_document(doc: &Document) -> Option<Self> {
        let id = doc.get("_id").and_then(id_string)?;
        let environment_id = doc.get("overrideV2EnvironmentId").and_then(id_string);
        let default_environment_revision_spec = doc
            .get("defaultEnvironmentRevisionSpec")
            .cloned()
            .map(|spec| spec.into_relaxed_extjson())
            .unwrap_or(Value::Null);

        Some(Self {
            id,
            environment_id,
            default_environment_revision_spec,
        })
    }
}

impl Keyed for Project {
    fn key(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn test_from_document() {
        let id = ObjectId::new();
        let env = ObjectId::new();
        let d = doc! {
            "_id": id,
            "overrideV2EnvironmentId": env,
            "defaultEnvironmentRevisionSpec": { "type": "ActiveRevision", "revisionId": env },
        };

        let project = Project::from_document(&d).unwrap();
        assert_eq!(project.id, id.to_hex());
        assert_eq!(project.environment_id, Some(env.to_hex()));
        assert_eq!(project.default_environment_revision_spec["type"], "ActiveRevision");
        assert_eq!(
            project.default_environment_revision_spec["revisionId"]["$oid"],
            Value::String(env.to_hex())
        );
    }

    #[test]
    fn test_optional_fields() {
        let project = Project::from_document(&doc! { "_id": "p1" }).unwrap();
        assert_eq!(project.environment_id, None);
        assert!(project.default_environment_revision_spec.is_null());
    }
}
