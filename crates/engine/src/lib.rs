//! Command dispatch and process wiring for the database bridge.
//!
//! The [`Bridge`] owns the connection registry, loads stored connections at
//! start, and then serves JSON-line envelopes from the editor transport. Each
//! envelope is decoded into a command and handed to the [`Dispatcher`], whose
//! directives flow back through a single writer task.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod telemetry;
mod transport;

pub use config::{BridgeConfig, LogFormat};
pub use dispatch::Dispatcher;
pub use engine::{Bridge, BridgeError};
