//! The routing slot between continuous capture and the current session.
//!
//! Capture runs all the time; audio only flows while a session has
//! registered a sink here. The context sets the sink on session start and
//! clears it on stop/cancel; the session's worker clears its own
//! registration in its terminal transition. Generations keep a late clear
//! from one session from clobbering the sink of its successor.

use parking_lot::Mutex;

use crate::chunk::AudioChunk;

pub type ChunkSink = Box<dyn FnMut(AudioChunk) + Send>;

#[derive(Default)]
struct Slot {
    sink: Option<ChunkSink>,
    generation: u64,
}

#[derive(Default)]
pub struct AudioTarget {
    slot: Mutex<Slot>,
}

impl AudioTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sink, replacing any previous one. Returns the generation
    /// token identifying this registration.
    pub fn set(&self, sink: ChunkSink) -> u64 {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        slot.sink = Some(sink);
        slot.generation
    }

    /// Remove whatever sink is installed.
    pub fn clear(&self) {
        self.slot.lock().sink = None;
    }

    /// Remove the sink only if `generation` still owns the slot.
    pub fn clear_if(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot.generation == generation {
            slot.sink = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot.lock().sink.is_some()
    }

    /// True while the given registration is still the installed sink. The
    /// session polls this: false means its audio input has ended.
    pub fn is_registered(&self, generation: u64) -> bool {
        let slot = self.slot.lock();
        slot.generation == generation && slot.sink.is_some()
    }

    /// Route one chunk to the sink, if any. Returns false when the chunk
    /// was dropped for lack of a sink.
    pub fn send(&self, chunk: AudioChunk) -> bool {
        let mut slot = self.slot.lock();
        match slot.sink.as_mut() {
            Some(sink) => {
                sink(chunk);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anytalk_foundation::CHUNK_SAMPLES;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn chunk() -> AudioChunk {
        AudioChunk::from_samples(&[0i16; CHUNK_SAMPLES])
    }

    #[test]
    fn send_without_sink_drops() {
        let target = AudioTarget::new();
        assert!(!target.is_active());
        assert!(!target.send(chunk()));
    }

    #[test]
    fn sink_receives_chunks() {
        let target = AudioTarget::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        target.set(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(target.is_active());
        assert!(target.send(chunk()));
        assert!(target.send(chunk()));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        target.clear();
        assert!(!target.send(chunk()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stale_generation_cannot_clear_a_newer_sink() {
        let target = AudioTarget::new();
        let old = target.set(Box::new(|_| {}));
        let new = target.set(Box::new(|_| {}));

        target.clear_if(old);
        assert!(target.is_active());
        assert!(!target.is_registered(old));
        assert!(target.is_registered(new));

        target.clear_if(new);
        assert!(!target.is_active());
    }
}
