//! Durable JSON snapshot of connection descriptors.
//!
//! The file maps connection name to `{engine, host, port, user, password}`.
//! Writes always replace the whole snapshot.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::descriptor::ConnectionDescriptor;

pub const DEFAULT_FILE_NAME: &str = "database.json";

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config store at {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config store: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredDescriptor {
    #[serde(alias = "db_type")]
    engine: String,
    host: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    port: u16,
    #[serde(default)]
    user: String,
    #[serde(default)]
    password: String,
}

impl StoredDescriptor {
    fn from_descriptor(d: &ConnectionDescriptor) -> Self {
        Self {
            engine: d.engine.clone(),
            host: d.host.clone(),
            port: d.port,
            user: d.user.clone(),
            password: d.password.clone(),
        }
    }

    fn into_descriptor(self, name: String) -> ConnectionDescriptor {
        ConnectionDescriptor {
            name,
            engine: self.engine,
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
        }
    }
}

fn port_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }
    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/database.json`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file (and parent directories) holding an empty object if it
    /// does not exist yet.
    pub async fn ensure_exists(&self) -> Result<(), StoreError> {
        if fs::try_exists(&self.path).await.map_err(|e| self.io(e))? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| self.io(e))?;
        }
        fs::write(&self.path, b"{}").await.map_err(|e| self.io(e))?;
        info!(target: STORE_TARGET, path = %self.path.display(), "created config store");
        Ok(())
    }

    pub async fn load(&self) -> Result<BTreeMap<String, ConnectionDescriptor>, StoreError> {
        let bytes = fs::read(&self.path).await.map_err(|e| self.io(e))?;
        let stored: BTreeMap<String, StoredDescriptor> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(stored
            .into_iter()
            .map(|(name, d)| {
                let descriptor = d.into_descriptor(name.clone());
                (name, descriptor)
            })
            .collect())
    }

    /// Replace the file with `snapshot`. Written to a sibling file first and
    /// renamed into place.
    pub async fn save(
        &self,
        snapshot: &BTreeMap<String, ConnectionDescriptor>,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&Self::stored(snapshot)).map_err(StoreError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await.map_err(|e| self.io(e))?;
        if let Err(error) = fs::rename(&tmp, &self.path).await {
            // The previous document stays in place; only the staged copy goes.
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io(error));
        }
        Ok(())
    }

    /// JSON document equivalent to what [`save`](Self::save) writes.
    pub fn document(
        snapshot: &BTreeMap<String, ConnectionDescriptor>,
    ) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(Self::stored(snapshot)).map_err(StoreError::Serialize)
    }

    fn stored(
        snapshot: &BTreeMap<String, ConnectionDescriptor>,
    ) -> BTreeMap<&str, StoredDescriptor> {
        snapshot
            .iter()
            .map(|(name, d)| (name.as_str(), StoredDescriptor::from_descriptor(d)))
            .collect()
    }

    fn io(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn descriptor(name: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new(name, "MySQL", "localhost", 3306, "root", "pw")
    }

    #[rstest]
    #[tokio::test]
    async fn creates_missing_file_and_parents(dir: TempDir) {
        let store = ConfigStore::in_dir(dir.path().join("nested/deeper"));
        store.ensure_exists().await.expect("ensure");
        let content = std::fs::read_to_string(store.path()).expect("read");
        assert_eq!(content, "{}");
        assert!(store.load().await.expect("load").is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn ensure_exists_keeps_existing_content(dir: TempDir) {
        let store = ConfigStore::in_dir(dir.path());
        std::fs::write(store.path(), r#"{"db1":{"engine":"MySQL","host":"h","port":1}}"#)
            .expect("seed");
        store.ensure_exists().await.expect("ensure");
        assert_eq!(store.load().await.expect("load").len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn save_then_load_preserves_descriptors(dir: TempDir) {
        let store = ConfigStore::in_dir(dir.path());
        let snapshot: BTreeMap<_, _> = [("db1".to_string(), descriptor("db1"))].into();
        store.save(&snapshot).await.expect("save");
        assert_eq!(store.load().await.expect("load"), snapshot);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[rstest]
    #[tokio::test]
    async fn accepts_legacy_keys_and_string_ports(dir: TempDir) {
        let store = ConfigStore::in_dir(dir.path());
        std::fs::write(
            store.path(),
            r#"{"old":{"db_type":"MySQL","host":"db.local","port":"3307","user":"u","password":"p"}}"#,
        )
        .expect("seed");
        let loaded = store.load().await.expect("load");
        let old = loaded.get("old").expect("entry");
        assert_eq!(old.engine, "MySQL");
        assert_eq!(old.port, 3307);
        assert_eq!(old.name, "old");
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_garbage(dir: TempDir) {
        let store = ConfigStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").expect("seed");
        assert!(matches!(
            store.load().await,
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn document_matches_file_shape() {
        let snapshot: BTreeMap<_, _> = [("db1".to_string(), descriptor("db1"))].into();
        let doc = ConfigStore::document(&snapshot).expect("doc");
        assert_eq!(
            doc,
            serde_json::json!({"db1": {"engine": "MySQL", "host": "localhost", "port": 3306, "user": "root", "password": "pw"}})
        );
    }
}
