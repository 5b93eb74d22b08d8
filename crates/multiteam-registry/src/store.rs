use crate::record::{ProjectRecord, ProjectSummary};
use async_trait::async_trait;
use chrono::Utc;
use multiteam_core::{MultiteamError, MultiteamResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage for project records, keyed by project id.
///
/// Registries are owned objects passed to whatever needs them.
#[async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Insert or replace a record. Refreshes `updated_at`.
    async fn save(&self, record: &ProjectRecord) -> MultiteamResult<ProjectRecord>;
    async fn load(&self, id: Uuid) -> MultiteamResult<Option<ProjectRecord>>;
    /// Remove a record; returns whether it existed.
    async fn delete(&self, id: Uuid) -> MultiteamResult<bool>;
    /// All projects, oldest first.
    async fn list(&self) -> MultiteamResult<Vec<ProjectSummary>>;

    async fn list_for_owner(&self, owner: &str) -> MultiteamResult<Vec<ProjectSummary>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.owner == owner)
            .collect())
    }
}

fn stamp(record: &ProjectRecord) -> MultiteamResult<ProjectRecord> {
    record.validate()?;
    let mut stored = record.clone();
    stored.updated_at = Utc::now().max(stored.created_at);
    Ok(stored)
}

/// File-based registry: one pretty-printed JSON file per project.
pub struct FileProjectRegistry {
    dir: PathBuf,
}

impl FileProjectRegistry {
    pub async fn new(dir: impl Into<PathBuf>) -> MultiteamResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn project_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, path: &Path) -> MultiteamResult<ProjectRecord> {
        let data = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&data).map_err(|e| {
            MultiteamError::Registry(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

#[async_trait]
impl ProjectRegistry for FileProjectRegistry {
    async fn save(&self, record: &ProjectRecord) -> MultiteamResult<ProjectRecord> {
        let stored = stamp(record)?;
        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(self.project_path(stored.id), json).await?;
        debug!(project = %stored.id, owner = %stored.owner, "Registry: project saved");
        Ok(stored)
    }

    async fn load(&self, id: Uuid) -> MultiteamResult<Option<ProjectRecord>> {
        let path = self.project_path(id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        self.read(&path).await.map(Some)
    }

    async fn delete(&self, id: Uuid) -> MultiteamResult<bool> {
        let path = self.project_path(id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }
        tokio::fs::remove_file(path).await?;
        debug!(project = %id, "Registry: project deleted");
        Ok(true)
    }

    async fn list(&self) -> MultiteamResult<Vec<ProjectSummary>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if Uuid::parse_str(stem).is_err() {
                continue;
            }
            match self.read(&entry.path()).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(file = %entry.path().display(), error = %e, "Registry: skipping unreadable project"),
            }
        }
        records.sort_by_key(|r| (r.created_at, r.id));
        Ok(records.iter().map(ProjectRecord::summary).collect())
    }
}

/// In-memory registry, for tests and embedding.
#[derive(Default)]
pub struct InMemoryProjectRegistry {
    records: RwLock<HashMap<Uuid, ProjectRecord>>,
}

impl InMemoryProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRegistry for InMemoryProjectRegistry {
    async fn save(&self, record: &ProjectRecord) -> MultiteamResult<ProjectRecord> {
        let stored = stamp(record)?;
        self.records.write().await.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn load(&self, id: Uuid) -> MultiteamResult<Option<ProjectRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> MultiteamResult<bool> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn list(&self) -> MultiteamResult<Vec<ProjectSummary>> {
        let records = self.records.read().await;
        let mut sorted: Vec<&ProjectRecord> = records.values().collect();
        sorted.sort_by_key(|r| (r.created_at, r.id));
        Ok(sorted.into_iter().map(ProjectRecord::summary).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_save_load_delete() {
        let registry = InMemoryProjectRegistry::new();
        let record = ProjectRecord::new("alice", "blog");

        let stored = registry.save(&record).await.unwrap();
        assert!(stored.updated_at >= record.updated_at);

        let loaded = registry.load(record.id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);

        assert!(registry.delete(record.id).await.unwrap());
        assert!(!registry.delete(record.id).await.unwrap());
        assert!(registry.load(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_owner_filter() {
        let registry = InMemoryProjectRegistry::new();
        registry.save(&ProjectRecord::new("alice", "a1")).await.unwrap();
        registry.save(&ProjectRecord::new("bob", "b1")).await.unwrap();
        registry.save(&ProjectRecord::new("alice", "a2")).await.unwrap();

        assert_eq!(registry.list().await.unwrap().len(), 3);
        let alice = registry.list_for_owner("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|p| p.owner == "alice"));
        assert!(registry.list_for_owner("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_record() {
        let registry = InMemoryProjectRegistry::new();
        let err = registry.save(&ProjectRecord::new("alice", "")).await.unwrap_err();
        assert!(matches!(err, MultiteamError::Config(_)));
        assert!(registry.list().await.unwrap().is_empty());
    }
}
