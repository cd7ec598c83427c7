pub mod capture;
pub mod encoding;
pub mod feedback;
pub mod format;

pub use capture::{CaptureHandle, CaptureProvider, CpalCaptureProvider};
pub use encoding::{AudioEncoder, EncoderRegistry, WavEncoder, extension_for};
pub use feedback::{AudioFeedback, FeedbackSound};
pub use format::AudioFormat;
