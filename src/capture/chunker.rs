use super::source::{AudioChunk, CaptureConfig};

/// Reshapes raw device buffers into fixed-size capture chunks.
///
/// Device input arrives as interleaved frames at the hardware's native rate
/// and channel count. Each `push` mixes the buffer down to mono, decimates to
/// the target rate, and appends to a pending buffer; whenever a full chunk's
/// worth of samples is available, a chunk is emitted with a timestamp derived
/// from the running sample count.
pub struct Chunker {
    src_rate: u32,
    src_channels: u16,
    target_rate: u32,
    chunk_samples: usize,
    pending: Vec<f32>,
    emitted_samples: u64,
}

impl Chunker {
    pub fn new(src_rate: u32, src_channels: u16, config: &CaptureConfig) -> Self {
        Self {
            src_rate,
            src_channels,
            target_rate: config.sample_rate,
            chunk_samples: config.chunk_samples(),
            pending: Vec::new(),
            emitted_samples: 0,
        }
    }

    /// Feed one interleaved device buffer; returns every chunk completed by
    /// it (usually zero or one).
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioChunk> {
        let mono = mix_to_mono(interleaved, self.src_channels);
        let resampled = downsample(&mono, self.src_rate, self.target_rate);
        self.pending.extend_from_slice(&resampled);

        let mut chunks = Vec::new();
        while self.pending.len() >= self.chunk_samples {
            let rest = self.pending.split_off(self.chunk_samples);
            let samples = std::mem::replace(&mut self.pending, rest);

            let timestamp_ms = self.emitted_samples * 1000 / self.target_rate as u64;
            self.emitted_samples += samples.len() as u64;

            chunks.push(AudioChunk {
                samples,
                sample_rate: self.target_rate,
                channels: 1,
                timestamp_ms,
            });
        }
        chunks
    }
}

/// Average interleaved channels down to mono. Averaging keeps the result in
/// [-1.0, 1.0] without clipping.
fn mix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels.max(1) as usize;
    if ch == 1 {
        return interleaved.to_vec();
    }

    let mut mono = Vec::with_capacity(interleaved.len() / ch);
    for frame in interleaved.chunks(ch) {
        let sum: f32 = frame.iter().sum();
        mono.push(sum / frame.len() as f32);
    }
    mono
}

/// Downsample by decimation: take every Nth sample. Rates that do not divide
/// evenly keep the nearest integer step. Cannot upsample.
fn downsample(samples: &[f32], src_rate: u32, target_rate: u32) -> Vec<f32> {
    if src_rate == target_rate {
        return samples.to_vec();
    }

    let ratio = src_rate / target_rate;
    if ratio <= 1 {
        return samples.to_vec();
    }

    samples.iter().step_by(ratio as usize).copied().collect()
}
