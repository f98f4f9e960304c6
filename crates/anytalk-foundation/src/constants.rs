//! Pipeline-wide invariants.
//!
//! The whole pipeline speaks exactly one audio format: 16 kHz, mono, signed
//! 16-bit little-endian PCM, sliced into fixed chunks. No partial chunks are
//! ever emitted; the capture side converts whatever the device produces into
//! this format before anything downstream sees it.

/// Sample rate of every chunk that crosses the capture boundary.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Samples per chunk (~40 ms at 16 kHz).
pub const CHUNK_SAMPLES: usize = 640;

/// Bytes per chunk: S16LE, mono.
pub const CHUNK_BYTES: usize = CHUNK_SAMPLES * 2;

/// Capacity of the capture-to-session ring, in chunks (~1.3 s of audio).
pub const RING_CAPACITY_CHUNKS: usize = 32;
