use std::io;
use std::sync::Arc;

use dbridge_executor::{ConfigStore, Driver, LoadReport, Registry, StoreError};
use dbridge_protocol::Directive;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::info;

use crate::config::BridgeConfig;
use crate::dispatch::{DISPATCH_TARGET, Dispatcher};
use crate::transport;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("config store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("output writer stopped: {0}")]
    Writer(#[from] JoinError),
}

/// Process root: owns the registry (through the dispatcher) for the whole
/// lifetime of the bridge.
pub struct Bridge<D: Driver> {
    config: BridgeConfig,
    dispatcher: Arc<Dispatcher<D>>,
}

impl<D: Driver> Bridge<D> {
    pub fn new(config: BridgeConfig, driver: D) -> Self {
        let registry = Arc::new(Registry::new(driver, config.store()));
        Self {
            config,
            dispatcher: Arc::new(Dispatcher::new(registry)),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry<D>> {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<D>> {
        &self.dispatcher
    }

    /// Create the store if needed and reconnect everything in it.
    pub async fn load(&self) -> Result<LoadReport, BridgeError> {
        let report = self.registry().load_all().await?;
        let store = self.config.config_path();
        info!(
            target: DISPATCH_TARGET,
            store = %store.display(),
            connected = report.connected.len(),
            failed = report.failed.len(),
            "loaded stored connections"
        );
        Ok(report)
    }

    /// The editor's view of every stored connection.
    pub async fn connection_metas(&self) -> Result<Directive, BridgeError> {
        let snapshot = self.registry().snapshot().await;
        Ok(Directive::SetConnectionMetas(ConfigStore::document(&snapshot)?))
    }

    /// Load stored connections, announce them, then serve envelopes from
    /// `reader` until it closes. Returns once every response is written.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<(), BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let writer_task = transport::spawn_writer(writer, receiver);

        self.load().await?;
        let metas = self.connection_metas().await?;
        // A send error means the writer already failed; its join result
        // carries the cause.
        let served = if sender.send(metas).await.is_ok() {
            transport::serve(Arc::clone(&self.dispatcher), reader, sender).await
        } else {
            drop(sender);
            Ok(())
        };

        // The writer flushes everything already dispatched before the read
        // error, if any, is reported.
        let written = writer_task.await?;
        served?;
        written?;
        info!(target: DISPATCH_TARGET, "bridge stopped");
        Ok(())
    }
}
