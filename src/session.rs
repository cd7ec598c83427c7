use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::audio::{AudioEncoder, AudioFormat, CaptureHandle, CaptureProvider, EncoderRegistry};
use crate::error::SessionError;

/// Recording session state machine.
///
/// ```text
/// Idle → Recording ⇄ Paused
///           ↓          ↓
///           Stopped (artifact emitted once)
/// ```
///
/// A failed device acquisition moves `Idle → Failed` instead; both `Stopped`
/// and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Stopped,
    Failed,
}

impl SessionState {
    /// True while capture is underway (recording or paused with the device
    /// still held open).
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// The finished audio payload handed downstream, once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    /// Media type of the encoder that produced `bytes`; the upload layer
    /// derives the file extension and content type from it.
    pub media_type: String,
}

/// One microphone recording: owns the capture device handle for its whole
/// lifetime, accumulates fragments in arrival order, and tracks how much
/// wall-clock time was spent paused.
///
/// All operations are synchronous; the owning actor serializes fragment
/// arrivals and state transitions, so a fragment landing after `stop()` sees
/// the terminal state and is discarded rather than appended.
pub struct RecordingSession {
    format: AudioFormat,
    state: SessionState,
    chunks: Vec<Vec<f32>>,
    device: Option<Box<dyn CaptureHandle>>,
    encoder: Option<Arc<dyn AudioEncoder>>,
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    total_paused: Duration,
    final_elapsed: Duration,
}

impl RecordingSession {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            state: SessionState::Idle,
            chunks: Vec::new(),
            device: None,
            encoder: None,
            started_at: None,
            paused_at: None,
            total_paused: Duration::ZERO,
            final_elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    pub fn total_paused(&self) -> Duration {
        self.total_paused
    }

    /// Negotiate an encoding format, acquire the capture device, and begin
    /// recording. Fragments start flowing into `fragments` as the device
    /// buffer flushes.
    ///
    /// A failed acquisition leaves the session in `Failed` with nothing to
    /// release and no timer running.
    pub fn start(
        &mut self,
        provider: &dyn CaptureProvider,
        encoders: &EncoderRegistry,
        preferred: &[String],
        fragments: mpsc::Sender<Vec<f32>>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::SessionActive);
        }

        let encoder = encoders.negotiate(preferred);
        let device = match provider.acquire(self.format, fragments) {
            Ok(device) => device,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        tracing::info!("Recording started ({})", encoder.media_type());
        self.device = Some(device);
        self.encoder = Some(encoder);
        self.chunks.clear();
        self.total_paused = Duration::ZERO;
        self.paused_at = None;
        self.started_at = Some(Instant::now());
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Append a captured fragment. Fragments arriving outside a live session
    /// (in particular after `stop()` has begun) are discarded.
    pub fn push_fragment(&mut self, fragment: Vec<f32>) {
        if !self.state.is_live() {
            tracing::debug!(
                "Discarding {}-sample fragment in state {:?}",
                fragment.len(),
                self.state
            );
            return;
        }
        if fragment.is_empty() {
            return;
        }
        self.chunks.push(fragment);
    }

    /// Suspend capture without releasing the device. No-op outside
    /// `Recording`.
    pub fn pause(&mut self) {
        if self.state != SessionState::Recording {
            tracing::debug!("Ignoring pause in state {:?}", self.state);
            return;
        }
        self.paused_at = Some(Instant::now());
        if let Some(device) = self.device.as_mut() {
            device.suspend();
        }
        self.state = SessionState::Paused;
        tracing::debug!("Recording paused at {}", format_elapsed(self.elapsed()));
    }

    /// Resume capture after a pause, folding the paused interval into
    /// `total_paused`. No-op outside `Paused`.
    pub fn resume(&mut self) {
        if self.state != SessionState::Paused {
            tracing::debug!("Ignoring resume in state {:?}", self.state);
            return;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused += paused_at.elapsed();
        }
        if let Some(device) = self.device.as_mut() {
            device.resume();
        }
        self.state = SessionState::Recording;
        tracing::debug!("Recording resumed at {}", format_elapsed(self.elapsed()));
    }

    /// Halt capture, release the device, and concatenate the fragments into
    /// one artifact. Returns the artifact exactly once; repeated calls and
    /// calls outside `Recording`/`Paused` return `None`.
    pub fn stop(&mut self) -> Option<Artifact> {
        if !self.state.is_live() {
            tracing::debug!("Ignoring stop in state {:?}", self.state);
            return None;
        }

        // Terminal state is marked before the device is released so that a
        // lingering timer tick or trailing fragment observes `Stopped` and
        // takes no action.
        self.final_elapsed = self.elapsed();
        self.state = SessionState::Stopped;

        if let Some(mut device) = self.device.take() {
            device.release();
        }

        let encoder = self.encoder.take()?;
        let samples: Vec<f32> = self.chunks.drain(..).flatten().collect();
        let media_type = encoder.media_type().to_string();
        match encoder.encode(self.format, &samples) {
            Ok(bytes) => {
                tracing::info!(
                    "Recording stopped after {} ({} samples, {})",
                    format_elapsed(self.final_elapsed),
                    samples.len(),
                    media_type
                );
                Some(Artifact { bytes, media_type })
            }
            Err(e) => {
                tracing::error!("Failed to encode recording: {:#}", e);
                None
            }
        }
    }

    /// Wall-clock recording time excluding paused intervals: frozen at the
    /// pause instant while `Paused`, and permanently once `Stopped`.
    pub fn elapsed(&self) -> Duration {
        match self.state {
            SessionState::Recording => self.elapsed_at(Instant::now()),
            SessionState::Paused => match self.paused_at {
                Some(paused_at) => self.elapsed_at(paused_at),
                None => Duration::ZERO,
            },
            SessionState::Stopped => self.final_elapsed,
            SessionState::Idle | SessionState::Failed => Duration::ZERO,
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started_at) => now
                .duration_since(started_at)
                .saturating_sub(self.total_paused),
            None => Duration::ZERO,
        }
    }
}

/// Format an elapsed duration as zero-padded `MM:SS`. Minutes are unbounded
/// rather than wrapping at 60.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    struct NullHandle;

    impl CaptureHandle for NullHandle {
        fn suspend(&mut self) {}
        fn resume(&mut self) {}
        fn release(&mut self) {}
    }

    struct NullProvider;

    impl CaptureProvider for NullProvider {
        fn acquire(
            &self,
            _format: AudioFormat,
            _fragments: mpsc::Sender<Vec<f32>>,
        ) -> Result<Box<dyn CaptureHandle>, SessionError> {
            Ok(Box::new(NullHandle))
        }
    }

    struct FailingProvider;

    impl CaptureProvider for FailingProvider {
        fn acquire(
            &self,
            _format: AudioFormat,
            _fragments: mpsc::Sender<Vec<f32>>,
        ) -> Result<Box<dyn CaptureHandle>, SessionError> {
            Err(SessionError::DeviceUnavailable("no microphone".to_string()))
        }
    }

    struct CountingHandle {
        releases: Arc<AtomicUsize>,
    }

    impl CaptureHandle for CountingHandle {
        fn suspend(&mut self) {}
        fn resume(&mut self) {}
        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingProvider {
        releases: Arc<AtomicUsize>,
    }

    impl CaptureProvider for CountingProvider {
        fn acquire(
            &self,
            _format: AudioFormat,
            _fragments: mpsc::Sender<Vec<f32>>,
        ) -> Result<Box<dyn CaptureHandle>, SessionError> {
            Ok(Box::new(CountingHandle {
                releases: self.releases.clone(),
            }))
        }
    }

    struct StubEncoder {
        media_type: &'static str,
    }

    impl AudioEncoder for StubEncoder {
        fn media_type(&self) -> &'static str {
            self.media_type
        }

        fn encode(&self, _format: AudioFormat, samples: &[f32]) -> Result<Vec<u8>> {
            Ok(vec![0u8; samples.len()])
        }
    }

    fn wav_registry() -> EncoderRegistry {
        EncoderRegistry::new()
    }

    fn started_session() -> RecordingSession {
        let mut session = RecordingSession::new(AudioFormat::default());
        let (tx, _rx) = mpsc::channel(8);
        session
            .start(&NullProvider, &wav_registry(), &wav_prefs(), tx)
            .unwrap();
        session
    }

    fn wav_prefs() -> Vec<String> {
        vec!["audio/wav".to_string()]
    }

    fn decoded_sample_count(artifact: &Artifact) -> u32 {
        let reader = hound::WavReader::new(Cursor::new(&artifact.bytes)).unwrap();
        reader.duration()
    }

    #[tokio::test(start_paused = true)]
    async fn pause_resume_arithmetic() {
        let mut session = started_session();

        advance(Duration::from_millis(5000)).await;
        session.pause();
        advance(Duration::from_millis(3000)).await;
        session.resume();
        advance(Duration::from_millis(4000)).await;
        let artifact = session.stop();

        assert!(artifact.is_some());
        assert_eq!(session.total_paused(), Duration::from_secs(3));
        assert_eq!(session.elapsed(), Duration::from_secs(9));
        assert_eq!(format_elapsed(session.elapsed()), "00:09");
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_is_frozen_while_paused() {
        let mut session = started_session();

        advance(Duration::from_secs(5)).await;
        session.pause();
        let at_pause = session.elapsed();
        advance(Duration::from_secs(30)).await;

        assert_eq!(session.elapsed(), at_pause);
        assert_eq!(format_elapsed(session.elapsed()), "00:05");
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_is_frozen_after_stop() {
        let mut session = started_session();

        advance(Duration::from_secs(7)).await;
        session.stop();
        advance(Duration::from_secs(60)).await;

        assert_eq!(session.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_outside_recording_is_a_noop() {
        let mut session = RecordingSession::new(AudioFormat::default());
        session.pause();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.elapsed(), Duration::ZERO);

        let mut session = started_session();
        session.stop();
        session.pause();
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_outside_paused_is_a_noop() {
        let mut session = started_session();
        advance(Duration::from_secs(2)).await;
        session.resume();
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.total_paused(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_delivers_the_artifact_exactly_once() {
        let mut session = started_session();
        session.push_fragment(vec![0.25; 160]);

        assert!(session.stop().is_some());
        assert!(session.stop().is_none());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn late_fragment_is_discarded() {
        let mut session = started_session();
        session.push_fragment(vec![0.5; 160]);

        let artifact = session.stop().unwrap();
        assert_eq!(decoded_sample_count(&artifact), 160);

        // The capture bridge can fire once more while the device winds down.
        session.push_fragment(vec![0.5; 160]);
        assert!(session.stop().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fragments_concatenate_in_arrival_order() {
        let mut session = started_session();
        session.push_fragment(vec![1.0; 10]);
        session.push_fragment(vec![-1.0; 10]);

        let artifact = session.stop().unwrap();
        let reader = hound::WavReader::new(Cursor::new(&artifact.bytes)).unwrap();
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 20);
        assert!(samples[..10].iter().all(|&s| s == i16::MAX));
        assert!(samples[10..].iter().all(|&s| s == -i16::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_recording_still_yields_an_artifact() {
        let mut session = started_session();
        let artifact = session.stop().unwrap();
        assert_eq!(artifact.media_type, "audio/wav");
        assert_eq!(decoded_sample_count(&artifact), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_acquisition_moves_to_failed() {
        let mut session = RecordingSession::new(AudioFormat::default());
        let (tx, _rx) = mpsc::channel(8);
        let err = session
            .start(&FailingProvider, &wav_registry(), &wav_prefs(), tx)
            .unwrap_err();

        assert!(matches!(err, SessionError::DeviceUnavailable(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.elapsed(), Duration::ZERO);
        assert!(session.stop().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn device_release_happens_once_per_stop() {
        let releases = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            releases: releases.clone(),
        };
        let mut session = RecordingSession::new(AudioFormat::default());
        let (tx, _rx) = mpsc::channel(8);
        session
            .start(&provider, &wav_registry(), &wav_prefs(), tx)
            .unwrap();

        session.stop();
        session.stop();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn artifact_media_type_matches_negotiated_encoder() {
        let registry = EncoderRegistry::with_encoders(vec![Arc::new(StubEncoder {
            media_type: "audio/webm",
        })]);
        let preferred = vec!["audio/mp4".to_string(), "audio/webm".to_string()];

        let mut session = RecordingSession::new(AudioFormat::default());
        let (tx, _rx) = mpsc::channel(8);
        session
            .start(&NullProvider, &registry, &preferred, tx)
            .unwrap();
        let artifact = session.stop().unwrap();

        assert_eq!(artifact.media_type, "audio/webm");
    }

    #[test]
    fn elapsed_display_is_zero_padded_and_unbounded() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(9)), "00:09");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "00:59");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "01:01");
        assert_eq!(format_elapsed(Duration::from_secs(3665)), "61:05");
    }
}
