//! Shared foundation for the anytalk voice-input core.
//!
//! Everything the other crates agree on lives here: the pipeline constants,
//! the configuration snapshot taken at context init, the error taxonomy, and
//! the event types delivered to the embedding host.

pub mod config;
pub mod constants;
pub mod error;
pub mod event;

pub use config::{AsrConfig, Endpoint, Mode, Scheme};
pub use constants::{CHUNK_BYTES, CHUNK_SAMPLES, RING_CAPACITY_CHUNKS, SAMPLE_RATE_HZ};
pub use error::{AsrError, AudioError, NetError};
pub use event::{AsrEvent, EventSink, SessionStatus};
