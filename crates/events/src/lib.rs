//! Append-only event primitives shared by the ledger and the engine.

mod envelope;
mod event;
mod projection;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use projection::Projection;
