use super::format::AudioFormat;
use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::Arc;

/// Encodes captured samples into one audio container.
///
/// The declared media type travels with the finished artifact; the upload
/// layer derives the file extension and content type from it, so it must
/// match the bytes actually produced.
pub trait AudioEncoder: Send + Sync {
    fn media_type(&self) -> &'static str;

    fn encode(&self, format: AudioFormat, samples: &[f32]) -> Result<Vec<u8>>;
}

/// 16-bit PCM WAV via hound.
pub struct WavEncoder;

impl AudioEncoder for WavEncoder {
    fn media_type(&self) -> &'static str {
        "audio/wav"
    }

    fn encode(&self, format: AudioFormat, samples: &[f32]) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| anyhow::anyhow!("Failed to create WAV writer: {}", e))?;

        for &sample in samples {
            // Convert f32 (-1.0 to 1.0) to i16
            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(amplitude)
                .map_err(|e| anyhow::anyhow!("Failed to write sample: {}", e))?;
        }

        writer
            .finalize()
            .map_err(|e| anyhow::anyhow!("Failed to finalize WAV: {}", e))?;

        Ok(cursor.into_inner())
    }
}

/// The set of encoders this build can produce: the platform capability set.
pub struct EncoderRegistry {
    encoders: Vec<Arc<dyn AudioEncoder>>,
}

impl EncoderRegistry {
    /// Registry with the stock encoders.
    pub fn new() -> Self {
        Self {
            encoders: vec![Arc::new(WavEncoder)],
        }
    }

    /// Registry with an explicit capability set. Must not be empty.
    pub fn with_encoders(encoders: Vec<Arc<dyn AudioEncoder>>) -> Self {
        assert!(!encoders.is_empty(), "encoder registry must not be empty");
        Self { encoders }
    }

    /// Whether an encoder for the given media type is available.
    pub fn supports(&self, media_type: &str) -> bool {
        self.encoders.iter().any(|e| e.media_type() == media_type)
    }

    /// Pick the first entry of `preferred` that is supported, falling back to
    /// the first registered encoder. Deterministic for a given registry.
    pub fn negotiate(&self, preferred: &[String]) -> Arc<dyn AudioEncoder> {
        preferred
            .iter()
            .find_map(|media_type| {
                self.encoders
                    .iter()
                    .find(|e| e.media_type() == media_type.as_str())
            })
            .unwrap_or(&self.encoders[0])
            .clone()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// File extension for a media type, used to name the upload.
pub fn extension_for(media_type: &str) -> &'static str {
    if media_type.contains("wav") {
        "wav"
    } else if media_type.contains("mp4") {
        "mp4"
    } else if media_type.contains("ogg") {
        "ogg"
    } else {
        "webm"
    }
}
