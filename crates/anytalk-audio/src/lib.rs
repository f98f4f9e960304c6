//! Microphone capture pipeline: a capture thread owning the input stream,
//! a conversion stage that normalizes whatever the device produces into
//! fixed 16 kHz mono S16LE chunks, a routing slot (at most one sink), and
//! the SPSC ring bridging capture to the session worker.

pub mod capture;
pub mod chunk;
pub mod chunker;
pub mod resampler;
pub mod ring;
pub mod target;

pub use capture::AudioCapture;
pub use chunk::AudioChunk;
pub use chunker::ChunkAssembler;
pub use resampler::LinearResampler;
pub use ring::{chunk_ring, ChunkReceiver, ChunkSender};
pub use target::AudioTarget;
