use crate::error::SessionError;
use crate::session::Artifact;
use tokio::sync::oneshot;

/// Commands for the Recorder service.
pub enum RecorderCommand {
    Start(oneshot::Sender<Result<(), SessionError>>),
    Pause,
    Resume,
    Stop(oneshot::Sender<Option<Artifact>>),
}

/// Application state (one recording pipeline per process).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Recording,
    Processing,
}

/// User intents forwarded by the global-shortcut monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortcutEvent {
    ToggleRecording,
    TogglePause,
}
