pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod messages;
pub mod services;
pub mod session;
pub mod shortcuts;
pub mod text_injection;
pub mod transcription;

pub use audio::{AudioFormat, EncoderRegistry};
pub use config::Config;
pub use error::SessionError;
pub use services::{Recorder, RecorderHandle};
pub use session::{Artifact, RecordingSession, SessionState, format_elapsed};
