//! Session orchestration: ties the ring/registry/drain/writer core into a
//! runnable tracer. Owns the configuration surface, the marking-policy
//! compiler, and the per-thread hook handshake; none of this is part of the
//! six core components, it is the glue a real deployment needs to drive
//! them.

mod config;
mod error;
mod hook;
mod policy;
mod session;

pub use config::TraceConfig;
pub use error::SessionError;
pub use hook::Hook;
pub use policy::{MarkingPolicy, TriggerSpec};
pub use session::Session;
