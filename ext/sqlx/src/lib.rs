//! sqlx drivers for the database bridge.
//!
//! [`SqlxDriver`] picks the engine from the descriptor's tag once, at connect
//! time, and every later call dispatches on the resulting [`SqlxConnection`]
//! variant.

mod drivers;

pub use drivers::{EngineKind, SqlxConnection, SqlxDriver};
