//! Mutation Store
//!
//! CRUD for `Mutation` custom resources (`apps.dominodatalab.com/v1alpha1`)
//! in the platform namespace. Objects are handled as untyped JSON since the
//! resource schema is owned by the admission webhook that consumes them.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use serde_json::Value;
use tracing::info;

use crate::shared::error::Result;

pub const MUTATION_GROUP: &str = "apps.dominodatalab.com";
pub const MUTATION_VERSION: &str = "v1alpha1";
pub const MUTATION_KIND: &str = "Mutation";
pub const MUTATION_PLURAL: &str = "mutations";

#[async_trait]
pub trait MutationStore: Send + Sync {
    async fn create(&self, mutation: Value) -> Result<Value>;
    async fn get(&self, name: &str) -> Result<Option<Value>>;
    /// Delete and return what the API server reports for the deletion.
    async fn delete(&self, name: &str) -> Result<Value>;
    async fn list(&self) -> Result<Value>;
}

pub struct KubeMutationStore {
    api: Api<DynamicObject>,
}

impl KubeMutationStore {
    pub fn new(client: kube::Client, namespace: &str) -> Self {
        let gvk = GroupVersionKind::gvk(MUTATION_GROUP, MUTATION_VERSION, MUTATION_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, MUTATION_PLURAL);
        Self {
            api: Api::namespaced_with(client, namespace, &resource),
        }
    }
}

#[async_trait]
impl MutationStore for KubeMutationStore {
    async fn create(&self, mutation: Value) -> Result<Value> {
        let object: DynamicObject = serde_json::from_value(mutation)?;
        let created = self.api.create(&PostParams::default(), &object).await?;
        info!(name = ?created.metadata.name, "Mutation created");
        Ok(serde_json::to_value(created)?)
    }

    async fn get(&self, name: &str) -> Result<Option<Value>> {
        match self.api.get_opt(name).await? {
            Some(object) => Ok(Some(serde_json::to_value(object)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, name: &str) -> Result<Value> {
        let deleted = self.api.delete(name, &DeleteParams::default()).await?;
        info!(name, "Mutation deleted");
        let value = deleted.either(serde_json::to_value, serde_json::to_value)?;
        Ok(value)
    }

    async fn list(&self) -> Result<Value> {
        let objects = self.api.list(&ListParams::default()).await?;
        Ok(serde_json::to_value(objects)?)
    }
}

/// Resource name from a mutation manifest's `metadata.name`.
pub fn manifest_name(mutation: &Value) -> Option<&str> {
    mutation.pointer("/metadata/name").and_then(Value::as_str)
}
