//! # Ports
//!
//! - `inbound`: the settlement API driven by block processing
//! - `outbound`: collaborators the engine consumes (formula evaluation,
//!   event delivery)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
