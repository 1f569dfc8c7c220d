//! Named connection registry.
//!
//! Two pieces of shared state live here: the durable descriptor snapshot
//! (mirrored to the [`ConfigStore`]) and the live handles. Registration
//! connects outside any lock, then commits the snapshot and the handle
//! while holding the descriptor lock so concurrent registrations of one name
//! resolve to a single winner in both maps.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::descriptor::ConnectionDescriptor;
use crate::driver::{Driver, DriverError};
use crate::store::{ConfigStore, StoreError};

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// A live handle. Statements lock it for their whole duration, which
/// serialises use of one connection.
pub type LiveConnection<C> = Arc<Mutex<C>>;

#[derive(Debug, Error)]
#[error("unknown connection: {name}")]
pub struct NotFoundError {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect '{name}': {source}")]
    Driver {
        name: String,
        #[source]
        source: DriverError,
    },

    #[error("connected '{name}' but could not persist it: {source}")]
    Persist {
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Outcome of [`Registry::load_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub connected: Vec<String>,
    pub failed: Vec<String>,
}

pub struct Registry<D: Driver> {
    driver: D,
    store: ConfigStore,
    descriptors: Mutex<BTreeMap<String, ConnectionDescriptor>>,
    live: RwLock<HashMap<String, LiveConnection<D::Connection>>>,
}

impl<D: Driver> Registry<D> {
    pub fn new(driver: D, store: ConfigStore) -> Self {
        Self {
            driver,
            store,
            descriptors: Mutex::new(BTreeMap::new()),
            live: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Open a connection for `descriptor` and make it the live handle for its
    /// name. On failure nothing changes.
    pub async fn register(
        &self,
        descriptor: ConnectionDescriptor,
    ) -> Result<LiveConnection<D::Connection>, ConnectError> {
        let name = descriptor.name.clone();
        let connection = self
            .driver
            .connect(&descriptor)
            .await
            .map_err(|source| ConnectError::Driver {
                name: name.clone(),
                source,
            })?;
        let handle = Arc::new(Mutex::new(connection));

        let mut descriptors = self.descriptors.lock().await;
        let mut snapshot = descriptors.clone();
        snapshot.insert(name.clone(), descriptor);
        self.store
            .save(&snapshot)
            .await
            .map_err(|source| ConnectError::Persist {
                name: name.clone(),
                source,
            })?;
        *descriptors = snapshot;
        self.live.write().await.insert(name.clone(), Arc::clone(&handle));
        drop(descriptors);

        info!(target: REGISTRY_TARGET, connection = %name, "registered connection");
        Ok(handle)
    }

    pub async fn get(&self, name: &str) -> Result<LiveConnection<D::Connection>, NotFoundError> {
        self.live
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| NotFoundError {
                name: name.to_string(),
            })
    }

    /// The stored descriptor for `name`, credentials included.
    pub async fn describe(&self, name: &str) -> Option<ConnectionDescriptor> {
        self.descriptors.lock().await.get(name).cloned()
    }

    pub async fn is_live(&self, name: &str) -> bool {
        self.live.read().await.contains_key(name)
    }

    /// Every descriptor currently mirrored to the store.
    pub async fn snapshot(&self) -> BTreeMap<String, ConnectionDescriptor> {
        self.descriptors.lock().await.clone()
    }

    /// Read the store and connect every descriptor in it. Descriptors that
    /// fail to connect are logged and stay in the store, but get no live
    /// handle.
    pub async fn load_all(&self) -> Result<LoadReport, StoreError> {
        self.store.ensure_exists().await?;
        let loaded = self.store.load().await?;
        debug!(target: REGISTRY_TARGET, count = loaded.len(), "loaded stored descriptors");

        let mut report = LoadReport::default();
        let mut descriptors = self.descriptors.lock().await;
        for (name, descriptor) in &loaded {
            match self.driver.connect(descriptor).await {
                Ok(connection) => {
                    self.live
                        .write()
                        .await
                        .insert(name.clone(), Arc::new(Mutex::new(connection)));
                    report.connected.push(name.clone());
                }
                Err(error) => {
                    warn!(
                        target: REGISTRY_TARGET,
                        connection = %name,
                        %error,
                        "stored connection is unreachable; skipping"
                    );
                    report.failed.push(name.clone());
                }
            }
        }
        descriptors.extend(loaded);
        Ok(report)
    }
}
