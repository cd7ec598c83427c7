use crate::audio::{AudioFormat, CaptureProvider, EncoderRegistry};
use crate::error::SessionError;
use crate::messages::RecorderCommand;
use crate::session::{Artifact, RecordingSession, format_elapsed};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// How often the elapsed-time display is refreshed while a session is live.
const DISPLAY_REFRESH: Duration = Duration::from_millis(100);

/// Drives recording sessions.
///
/// This service:
/// - Builds one `RecordingSession` per start command
/// - Receives captured fragments via channel and appends them to the session
/// - Refreshes the `MM:SS` display on a fixed tick while a session is live
/// - Hands the finished artifact back through the stop reply, at most once
///
/// The single `select!` loop serializes fragment arrivals, commands, and
/// display ticks, so nothing mutates session state concurrently. Note: the
/// cpal capture handle is !Send, so this service must be spawned on a
/// LocalSet using tokio::task::spawn_local.
pub struct Recorder {
    format: AudioFormat,
    provider: Box<dyn CaptureProvider>,
    encoders: EncoderRegistry,
    preferred_formats: Vec<String>,
    cmd_rx: mpsc::Receiver<RecorderCommand>,
    audio_rx: mpsc::Receiver<Vec<f32>>,
    audio_tx: mpsc::Sender<Vec<f32>>,
    display_tx: watch::Sender<String>,
    session: RecordingSession,
}

impl Recorder {
    pub fn new(
        format: AudioFormat,
        provider: Box<dyn CaptureProvider>,
        encoders: EncoderRegistry,
        preferred_formats: Vec<String>,
        cmd_rx: mpsc::Receiver<RecorderCommand>,
        display_tx: watch::Sender<String>,
    ) -> Self {
        let (audio_tx, audio_rx) = mpsc::channel(100);
        Self {
            format,
            provider,
            encoders,
            preferred_formats,
            cmd_rx,
            audio_rx,
            audio_tx,
            display_tx,
            session: RecordingSession::new(format),
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(DISPLAY_REFRESH);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },

                // Append captured fragments (only while a session is live)
                Some(fragment) = self.audio_rx.recv(), if self.session.is_live() => {
                    self.session.push_fragment(fragment);
                }

                // Display refresh: reads session timing, writes one string.
                // Disabled outside a live session so nothing repaints after
                // stop.
                _ = ticker.tick(), if self.session.is_live() => {
                    self.display_tx
                        .send_replace(format_elapsed(self.session.elapsed()));
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: RecorderCommand) {
        match cmd {
            RecorderCommand::Start(reply) => {
                let result = self.handle_start();
                let _ = reply.send(result);
            }
            RecorderCommand::Pause => self.session.pause(),
            RecorderCommand::Resume => self.session.resume(),
            RecorderCommand::Stop(reply) => {
                let artifact = self.handle_stop();
                let _ = reply.send(artifact);
            }
        }
    }

    fn handle_start(&mut self) -> Result<(), SessionError> {
        if self.session.is_live() {
            return Err(SessionError::SessionActive);
        }

        // One session instance per recording.
        self.session = RecordingSession::new(self.format);
        self.session.start(
            self.provider.as_ref(),
            &self.encoders,
            &self.preferred_formats,
            self.audio_tx.clone(),
        )?;
        self.display_tx.send_replace(format_elapsed(Duration::ZERO));
        Ok(())
    }

    fn handle_stop(&mut self) -> Option<Artifact> {
        // Fragments already queued arrived before the stop began; keep them.
        while let Ok(fragment) = self.audio_rx.try_recv() {
            self.session.push_fragment(fragment);
        }

        let artifact = self.session.stop();

        // Swap in a fresh fragment channel for the next recording. Dropping
        // the old receiver closes the capture bridge's sender, which is its
        // signal to exit; anything still in flight is discarded.
        let (audio_tx, audio_rx) = mpsc::channel(100);
        self.audio_tx = audio_tx;
        self.audio_rx = audio_rx;

        // Leave the final frozen value on the display.
        self.display_tx
            .send_replace(format_elapsed(self.session.elapsed()));

        artifact
    }
}

/// Handle for communicating with the Recorder.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    pub fn new(tx: mpsc::Sender<RecorderCommand>) -> Self {
        Self { tx }
    }

    pub async fn start(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RecorderCommand::Start(reply))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send start command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive start response: {}", e))??;
        Ok(())
    }

    /// Fire-and-forget; a no-op unless a recording is underway.
    pub async fn pause(&self) -> Result<()> {
        self.tx
            .send(RecorderCommand::Pause)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send pause command: {}", e))
    }

    /// Fire-and-forget; a no-op unless the recording is paused.
    pub async fn resume(&self) -> Result<()> {
        self.tx
            .send(RecorderCommand::Resume)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send resume command: {}", e))
    }

    /// Stop the current recording. Returns the artifact for the first stop of
    /// a live session and `None` for any other call.
    pub async fn stop(&self) -> Result<Option<Artifact>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RecorderCommand::Stop(reply))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send stop command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive stop response: {}", e))
    }
}
