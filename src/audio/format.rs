use std::time::Duration;

/// Capture format negotiated with the device. Encoding assumes 16-bit signed
/// integer PCM throughout; parameterize this if another sample format is ever
/// needed.
#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// 16 kHz mono, what speech-to-text endpoints expect.
    pub const SPEECH: Self = Self {
        sample_rate: 16000,
        channels: 1,
    };

    /// Number of samples spanning the given stretch of audio.
    pub fn samples_spanning(&self, duration: Duration) -> usize {
        (self.sample_rate as f64 * duration.as_secs_f64()) as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::SPEECH
    }
}
