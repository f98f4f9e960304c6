//! SPSC chunk ring between the capture thread and the session worker.
//!
//! Built on `rtrb`, one ring element per chunk. Neither side ever blocks:
//! a full ring drops the newest chunk, so transcription degrades instead of
//! the capture callback stalling.

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::trace;

use crate::chunk::AudioChunk;

/// Create a ring of `capacity` chunks and split it into its two endpoints.
pub fn chunk_ring(capacity: usize) -> (ChunkSender, ChunkReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (ChunkSender { producer }, ChunkReceiver { consumer })
}

/// Producer half, owned by the capture-side sink.
pub struct ChunkSender {
    producer: Producer<AudioChunk>,
}

impl ChunkSender {
    /// Non-blocking push. Returns false when the ring was full and the
    /// chunk was dropped.
    pub fn push(&mut self, chunk: AudioChunk) -> bool {
        match self.producer.push(chunk) {
            Ok(()) => true,
            Err(PushError::Full(_)) => {
                trace!("audio ring full, dropping newest chunk");
                false
            }
        }
    }
}

/// Consumer half, owned by the session worker.
pub struct ChunkReceiver {
    consumer: Consumer<AudioChunk>,
}

impl ChunkReceiver {
    /// Non-blocking pop.
    pub fn pop(&mut self) -> Option<AudioChunk> {
        self.consumer.pop().ok()
    }
}
