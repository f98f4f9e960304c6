//! Normalizes device audio into pipeline chunks: interleaved frames in,
//! whole 1280-byte 16 kHz mono chunks out. No partial chunks are ever
//! emitted; a trailing remainder waits for the next callback.

use anytalk_foundation::{CHUNK_SAMPLES, SAMPLE_RATE_HZ};

use crate::chunk::AudioChunk;
use crate::resampler::LinearResampler;

pub struct ChunkAssembler {
    channels: usize,
    resampler: LinearResampler,
    pending: Vec<i16>,
}

impl ChunkAssembler {
    pub fn new(device_rate: u32, channels: u16) -> Self {
        Self {
            channels: channels.max(1) as usize,
            resampler: LinearResampler::new(device_rate, SAMPLE_RATE_HZ),
            pending: Vec::with_capacity(CHUNK_SAMPLES * 2),
        }
    }

    /// Feed one callback's worth of interleaved samples; `emit` is called
    /// once per completed chunk.
    pub fn accept(&mut self, interleaved: &[i16], mut emit: impl FnMut(AudioChunk)) {
        if interleaved.is_empty() {
            return;
        }

        let mono: Vec<i16> = if self.channels == 1 {
            interleaved.to_vec()
        } else {
            interleaved
                .chunks(self.channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / frame.len() as i32) as i16
                })
                .collect()
        };

        self.pending.extend(self.resampler.process(&mono));

        while self.pending.len() >= CHUNK_SAMPLES {
            let mut samples = [0i16; CHUNK_SAMPLES];
            for (slot, sample) in samples.iter_mut().zip(self.pending.drain(..CHUNK_SAMPLES)) {
                *slot = sample;
            }
            emit(AudioChunk::from_samples(&samples));
        }
    }

    /// Discard buffered audio so a routing gap does not leak stale samples
    /// into the next session.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.resampler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anytalk_foundation::CHUNK_BYTES;

    fn collect_chunks(assembler: &mut ChunkAssembler, input: &[i16]) -> Vec<AudioChunk> {
        let mut out = Vec::new();
        assembler.accept(input, |c| out.push(c));
        out
    }

    #[test]
    fn native_rate_mono_slices_exact_chunks() {
        let mut assembler = ChunkAssembler::new(16_000, 1);
        let input = vec![7i16; CHUNK_SAMPLES * 2 + 100];
        let chunks = collect_chunks(&mut assembler, &input);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert_eq!(chunk.as_bytes().len(), CHUNK_BYTES);
        }

        // The 100-sample remainder completes on the next call.
        let more = collect_chunks(&mut assembler, &vec![7i16; CHUNK_SAMPLES - 100]);
        assert_eq!(more.len(), 1);
    }

    #[test]
    fn stereo_is_averaged_to_mono() {
        let mut assembler = ChunkAssembler::new(16_000, 2);
        // L = 1000, R = -1000 averages to 0
        let mut input = Vec::new();
        for _ in 0..CHUNK_SAMPLES {
            input.push(1000i16);
            input.push(-1000i16);
        }
        let chunks = collect_chunks(&mut assembler, &input);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn device_rate_is_resampled_down() {
        let mut assembler = ChunkAssembler::new(48_000, 1);
        // 3 s of 48 kHz input -> ~75 chunks of 640 samples at 16 kHz
        let input = vec![0i16; 48_000 * 3];
        let chunks = collect_chunks(&mut assembler, &input);
        assert!((74..=75).contains(&chunks.len()), "got {}", chunks.len());
    }

    #[test]
    fn reset_drops_partial_chunk() {
        let mut assembler = ChunkAssembler::new(16_000, 1);
        assert!(collect_chunks(&mut assembler, &vec![1i16; CHUNK_SAMPLES / 2]).is_empty());
        assembler.reset();
        // Half a chunk of fresh audio: still nothing, the stale half is gone
        let chunks = collect_chunks(&mut assembler, &vec![2i16; CHUNK_SAMPLES / 2]);
        assert!(chunks.is_empty());
    }
}
