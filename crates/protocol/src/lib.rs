//! Wire-level vocabulary shared between the editor transport and the bridge.
//! - Decodes inbound envelopes into a typed [`Command`]
//! - Describes outbound editor [`Directive`]s and renders them as s-expressions
//! - Frames both directions as JSON lines ([`Outbound`])

mod command;
mod directive;
mod error;
mod outbound;
pub mod sexp;

pub use command::{Command, Envelope};
pub use directive::{Directive, MANAGEMENT_VIEW};
pub use error::ProtocolError;
pub use outbound::Outbound;
pub use sexp::Sexp;
