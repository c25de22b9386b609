//! Workflow definition versioning (`spec.md` §4.7).
//!
//! A [`VersionManager`] is a named collection of registered
//! `(workflowName, version)` pairs, each bound to a frozen
//! [`WorkflowNetwork`] and a deprecation flag. `version_api` resolves a
//! pair to an [`ActionDispatcher`] wired to the shared storage, activity,
//! and audit handles — mirroring the teacher's `LLMProvider` registry
//! pattern of a name-keyed map of boxed user configuration resolved to a
//! concrete handler on demand.
//!
//! Migrations are registered separately, one per `(workflow, fromVersion,
//! toVersion)` triple, as a boxed closure over the instance payload —
//! again the teacher's boxed-dynamic-config pattern, generalized from
//! provider config to payload transformation. `migrate_instance` applies
//! one lazily, the first time a caller asks to move an instance onto a
//! newer version (`spec.md` §4.7: "executed lazily when an instance of an
//! older version is first touched after the deprecated version was
//! retired").

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::audit::AuditHandle;
use crate::dispatcher::ActionDispatcher;
use crate::error::{EngineError, Result};
use crate::execution::router::Activities;
use crate::model::ids::{VersionName, WorkflowName};
use crate::model::net::{ExtractedWorkflow, WorkflowNetwork};
use crate::runtime::WorkflowInstanceRecord;
use crate::storage::WorkflowStorage;

/// A payload transformation applied when moving a persisted instance from
/// one version to a newer one. Must be pure and idempotent (`spec.md`
/// §4.7).
pub type Migration = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;

struct VersionEntry {
    network: Arc<WorkflowNetwork>,
    is_deprecated: bool,
}

/// Registry of workflow definition versions, shared storage/activities/
/// audit handles, and the migrations between them.
pub struct VersionManager {
    storage: Arc<dyn WorkflowStorage>,
    activities: Arc<dyn Activities>,
    audit: Arc<dyn AuditHandle>,
    versions: RwLock<HashMap<(WorkflowName, VersionName), VersionEntry>>,
    migrations: RwLock<HashMap<(WorkflowName, VersionName, VersionName), Migration>>,
}

impl VersionManager {
    pub fn new(storage: Arc<dyn WorkflowStorage>, activities: Arc<dyn Activities>, audit: Arc<dyn AuditHandle>) -> Self {
        VersionManager {
            storage,
            activities,
            audit,
            versions: RwLock::new(HashMap::new()),
            migrations: RwLock::new(HashMap::new()),
        }
    }

    /// Register a built workflow network under its own `(name, version)`.
    /// Re-registering the same pair replaces the previous entry.
    pub fn register_version(&self, network: Arc<WorkflowNetwork>, is_deprecated: bool) -> Result<()> {
        let key = (network.name.clone(), network.version.clone());
        let mut versions = self.versions.write().map_err(|_| poison_err())?;
        versions.insert(key, VersionEntry { network, is_deprecated });
        Ok(())
    }

    /// Register a migration transforming a `from`-version instance
    /// payload into a `to`-version one.
    pub fn register_migration(
        &self,
        workflow: impl Into<WorkflowName>,
        from: impl Into<VersionName>,
        to: impl Into<VersionName>,
        migration: Migration,
    ) -> Result<()> {
        let key = (workflow.into(), from.into(), to.into());
        let mut migrations = self.migrations.write().map_err(|_| poison_err())?;
        migrations.insert(key, migration);
        Ok(())
    }

    /// The action dispatcher bound to `(workflow, version)`, per
    /// `VersionManager::apiForVersion` in `spec.md` §4.7.
    pub fn version_api(&self, workflow: &WorkflowName, version: &VersionName) -> Result<ActionDispatcher> {
        let versions = self.versions.read().map_err(|_| poison_err())?;
        let entry = versions
            .get(&(workflow.clone(), version.clone()))
            .ok_or_else(|| EngineError::DefinitionNotFound { workflow: workflow.to_string() })?;
        Ok(ActionDispatcher::new(
            entry.network.clone(),
            self.storage.clone(),
            self.activities.clone(),
            self.audit.clone(),
        ))
    }

    /// Whether `(workflow, version)` is registered and marked deprecated.
    pub fn is_deprecated(&self, workflow: &WorkflowName, version: &VersionName) -> Result<bool> {
        let versions = self.versions.read().map_err(|_| poison_err())?;
        Ok(versions.get(&(workflow.clone(), version.clone())).map(|e| e.is_deprecated).unwrap_or(false))
    }

    /// Every registered `{workflowName, version}` pair, for the
    /// definition-authoring surface's listing endpoint.
    pub fn registered_versions(&self) -> Result<Vec<(WorkflowName, VersionName)>> {
        let versions = self.versions.read().map_err(|_| poison_err())?;
        let mut pairs: Vec<_> = versions.keys().cloned().collect();
        pairs.sort_by(|a, b| (a.0.as_str(), a.1.as_str()).cmp(&(b.0.as_str(), b.1.as_str())));
        Ok(pairs)
    }

    /// The structural extraction (`spec.md` §4.2) of `(workflow,
    /// version)`'s network, for the definition-authoring surface.
    pub fn extract(&self, workflow: &WorkflowName, version: &VersionName) -> Result<ExtractedWorkflow> {
        let versions = self.versions.read().map_err(|_| poison_err())?;
        let entry = versions
            .get(&(workflow.clone(), version.clone()))
            .ok_or_else(|| EngineError::DefinitionNotFound { workflow: workflow.to_string() })?;
        Ok(entry.network.extract())
    }

    /// Move a persisted instance from its current version onto `to`,
    /// applying the registered migration to its payload and persisting
    /// the result. Fails with [`EngineError::MigrationFailed`] if no
    /// migration is registered for the pair, or if the migration itself
    /// errors.
    pub async fn migrate_instance(
        &self,
        mut record: WorkflowInstanceRecord,
        to: VersionName,
    ) -> Result<WorkflowInstanceRecord> {
        let key = (record.definition_name.clone(), record.version.clone(), to.clone());
        let migrated_payload = {
            let migrations = self.migrations.read().map_err(|_| poison_err())?;
            let migration = migrations.get(&key).ok_or_else(|| EngineError::MigrationFailed {
                from: record.version.to_string(),
                to: to.to_string(),
                reason: "no migration registered for this version pair".to_string(),
            })?;
            migration(record.payload.clone()).map_err(|e| EngineError::MigrationFailed {
                from: record.version.to_string(),
                to: to.to_string(),
                reason: e.to_string(),
            })?
        };

        record.payload = migrated_payload;
        record.version = to;
        self.storage.update_workflow_instance(record.clone()).await
    }
}

fn poison_err() -> EngineError {
    EngineError::Storage(anyhow::anyhow!("version manager lock poisoned"))
}
