use crate::audio::{
    AudioFeedback, AudioFormat, CpalCaptureProvider, EncoderRegistry, FeedbackSound,
};
use crate::config::Config;
use crate::messages::{AppState, ShortcutEvent};
use crate::services::{Recorder, RecorderHandle};
use crate::session::format_elapsed;
use crate::shortcuts;
use crate::text_injection::{PasteMode, TextInjector};
use crate::transcription::{OpenAiTranscriber, Transcriber};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Application context: owns the recording pipeline and the collaborators
/// the finished artifact flows through. Built once on startup, torn down on
/// shutdown with any in-flight recording stopped and delivered.
pub struct App {
    state: AppState,
    /// Mirrors the pause button of a recording UI: one shortcut toggles
    /// between pause and resume.
    paused: bool,
    config: Config,
    recorder: RecorderHandle,
    display_rx: watch::Receiver<String>,
    transcriber: Box<dyn Transcriber>,
    injector: TextInjector,
    feedback: AudioFeedback,
    shortcut_rx: mpsc::Receiver<ShortcutEvent>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let (recorder, display_rx) = Self::setup_recording_pipeline(&config);
        let transcriber = OpenAiTranscriber::new(
            &config.transcription.api_url,
            &config.transcription.api_key,
            config.transcription.model.clone(),
            config.transcription.prompt.clone(),
            config.transcription.language.clone(),
        );
        let paste_mode = PasteMode::parse(&config.insertion.paste_mode)
            .context("Invalid insertion.paste_mode in config")?;
        let injector = TextInjector::new(paste_mode);
        let feedback = Self::setup_feedback(&config);
        let shortcut_rx = Self::setup_shortcut_monitoring();

        tracing::info!("Ready! Use the global shortcuts to record and pause");

        Ok(Self {
            state: AppState::Idle,
            paused: false,
            config,
            recorder,
            display_rx,
            transcriber: Box::new(transcriber),
            injector,
            feedback,
            shortcut_rx,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                event = self.shortcut_rx.recv() => match event {
                    Some(ShortcutEvent::ToggleRecording) => {
                        if let Err(e) = self.handle_toggle().await {
                            tracing::error!("Error handling toggle: {:#}", e);
                        }
                    }
                    Some(ShortcutEvent::TogglePause) => {
                        if let Err(e) = self.handle_pause_toggle().await {
                            tracing::error!("Error handling pause: {:#}", e);
                        }
                    }
                    None => {
                        tracing::warn!("Shortcut monitor stopped, shutting down");
                        self.shutdown().await;
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    self.shutdown().await;
                    break;
                }
            }
        }

        tracing::info!("Murmur shutdown complete");
        Ok(())
    }

    async fn handle_toggle(&mut self) -> Result<()> {
        tracing::debug!("handle_toggle: current state = {:?}", self.state);

        match self.state {
            AppState::Idle => self.handle_start().await,
            AppState::Recording => self.handle_stop_and_process().await,
            AppState::Processing => {
                tracing::debug!("Already processing, ignoring toggle");
                Ok(())
            }
        }
    }

    async fn handle_start(&mut self) -> Result<()> {
        if self.config.transcription.api_key.is_empty() {
            tracing::warn!("No API key configured; set transcription.api_key in the config file first");
            self.feedback.play(FeedbackSound::Error).await;
            return Ok(());
        }

        tracing::info!("Starting recording");
        match self.recorder.start().await {
            Ok(()) => {
                self.state = AppState::Recording;
                self.paused = false;
                self.feedback.play(FeedbackSound::Start).await;
            }
            Err(e) => {
                // Typically DeviceUnavailable: no microphone or permission
                // denied. The session never left Idle.
                tracing::error!("Failed to start recording: {:#}", e);
                self.feedback.play(FeedbackSound::Error).await;
            }
        }
        Ok(())
    }

    async fn handle_stop_and_process(&mut self) -> Result<()> {
        tracing::info!("Stopping recording");
        self.state = AppState::Processing;
        self.feedback.play(FeedbackSound::Stop).await;

        let result = self.deliver_recording().await;

        // Ready for the next take whatever happened downstream.
        self.state = AppState::Idle;
        self.paused = false;

        if result.is_err() {
            self.feedback.play(FeedbackSound::Error).await;
        }
        result
    }

    async fn deliver_recording(&mut self) -> Result<()> {
        let Some(artifact) = self.recorder.stop().await? else {
            tracing::debug!("Nothing was recorded");
            return Ok(());
        };

        tracing::info!(
            "Recorded {} ({} bytes, {})",
            self.display_rx.borrow().as_str(),
            artifact.bytes.len(),
            artifact.media_type
        );

        tracing::info!("Transcribing...");
        let text = self.transcriber.transcribe(&artifact).await?;
        tracing::info!("Transcription: {}", text);

        tracing::info!("Injecting text...");
        self.injector.inject(text).await?;

        self.feedback.play(FeedbackSound::Complete).await;
        tracing::info!("Complete!");
        Ok(())
    }

    async fn handle_pause_toggle(&mut self) -> Result<()> {
        if self.state != AppState::Recording {
            tracing::debug!("No recording underway, ignoring pause toggle");
            return Ok(());
        }

        if self.paused {
            self.recorder.resume().await?;
            self.paused = false;
            tracing::info!("Resumed at {}", self.display_rx.borrow().as_str());
        } else {
            self.recorder.pause().await?;
            self.paused = true;
            tracing::info!("Paused at {}", self.display_rx.borrow().as_str());
        }
        Ok(())
    }

    /// Closing the daemon mid-recording behaves like pressing stop: the
    /// device is released and whatever was captured still goes to
    /// transcription.
    async fn shutdown(&mut self) {
        if self.state == AppState::Recording {
            if let Err(e) = self.handle_stop_and_process().await {
                tracing::error!("Error delivering final recording: {:#}", e);
            }
        }
    }

    fn setup_recording_pipeline(config: &Config) -> (RecorderHandle, watch::Receiver<String>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(10);
        let (display_tx, display_rx) = watch::channel(format_elapsed(Duration::ZERO));

        // The recorder holds the cpal stream, which is !Send, so it must be
        // spawned on a LocalSet.
        let recorder = Recorder::new(
            AudioFormat::default(), // 16kHz, mono
            Box::new(CpalCaptureProvider),
            EncoderRegistry::new(),
            config.recording.preferred_formats.clone(),
            cmd_rx,
            display_tx,
        );
        tokio::task::spawn_local(recorder.run());

        (RecorderHandle::new(cmd_tx), display_rx)
    }

    fn setup_feedback(config: &Config) -> AudioFeedback {
        let paths = HashMap::from([
            (FeedbackSound::Start, PathBuf::from(&config.sounds.start)),
            (FeedbackSound::Stop, PathBuf::from(&config.sounds.stop)),
            (FeedbackSound::Complete, PathBuf::from(&config.sounds.complete)),
            (FeedbackSound::Error, PathBuf::from(&config.sounds.error)),
        ]);
        AudioFeedback::new(config.sounds.enabled, paths)
    }

    fn setup_shortcut_monitoring() -> mpsc::Receiver<ShortcutEvent> {
        let (shortcut_tx, shortcut_rx) = mpsc::channel(10);
        tokio::spawn(async move {
            if let Err(e) = shortcuts::monitor_shortcuts(shortcut_tx).await {
                tracing::error!("Shortcut monitoring failed: {:#}", e);
            }
        });
        shortcut_rx
    }
}
