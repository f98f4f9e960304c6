use anytalk_foundation::{CHUNK_BYTES, CHUNK_SAMPLES};

/// One fixed-size unit of pipeline audio: 640 samples of 16 kHz mono S16LE
/// (~40 ms). Everything between capture and the wire moves in whole chunks.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    bytes: [u8; CHUNK_BYTES],
}

impl AudioChunk {
    /// Pack exactly [`CHUNK_SAMPLES`] samples, little-endian.
    pub fn from_samples(samples: &[i16; CHUNK_SAMPLES]) -> Self {
        let mut bytes = [0u8; CHUNK_BYTES];
        for (i, sample) in samples.iter().enumerate() {
            let le = sample.to_le_bytes();
            bytes[i * 2] = le[0];
            bytes[i * 2 + 1] = le[1];
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
