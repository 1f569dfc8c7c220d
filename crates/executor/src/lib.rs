//! Connection management and SQL execution for the database bridge.
//!
//! The [`Registry`] owns one live handle per named connection and keeps the
//! on-disk [`ConfigStore`] in step with every successful registration. The
//! [`SqlExecutor`] borrows those handles one statement at a time, and the
//! [`encoder`] turns the resulting [`ResultSet`] into portable JSON values.
//! Database engines plug in through the [`Driver`] and [`Connection`] traits.

mod descriptor;
mod driver;
pub mod encoder;
mod executor;
mod registry;
mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod value;

pub use descriptor::ConnectionDescriptor;
pub use driver::{Connection, Driver, DriverError};
pub use encoder::{EncodedResult, PortableRows, encode};
pub use executor::{ExecutionError, ExecutionErrorKind, SqlExecutor};
pub use registry::{ConnectError, LiveConnection, LoadReport, NotFoundError, Registry};
pub use store::{ConfigStore, StoreError};
pub use value::{ResultSet, RowShapeError, Scalar};
