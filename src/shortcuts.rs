use crate::messages::ShortcutEvent;
use anyhow::{Context, Result};
use ashpd::desktop::global_shortcuts::{GlobalShortcuts, NewShortcut};
use ashpd::WindowIdentifier;
use futures::StreamExt;
use tokio::sync::mpsc;

const TOGGLE_ID: &str = "toggle-recording";
const PAUSE_ID: &str = "pause-recording";
const TOGGLE_TRIGGER: &str = "LOGO+ALT+d";
const PAUSE_TRIGGER: &str = "LOGO+ALT+p";

/// Monitor for the global shortcuts via XDG Desktop Portal.
///
/// Registers the toggle and pause shortcuts with the compositor
/// (KDE/GNOME/etc) and forwards a `ShortcutEvent` each time one is
/// activated. The user can reconfigure the bindings through their desktop's
/// shortcut settings.
pub async fn monitor_shortcuts(tx: mpsc::Sender<ShortcutEvent>) -> Result<()> {
    let shortcuts = GlobalShortcuts::new()
        .await
        .context("Failed to connect to GlobalShortcuts portal")?;

    let session = shortcuts
        .create_session()
        .await
        .context("Failed to create GlobalShortcuts session")?;

    let bindings = [
        NewShortcut::new(TOGGLE_ID, "Start or stop voice recording")
            .preferred_trigger(Some(TOGGLE_TRIGGER)),
        NewShortcut::new(PAUSE_ID, "Pause or resume the current recording")
            .preferred_trigger(Some(PAUSE_TRIGGER)),
    ];

    shortcuts
        .bind_shortcuts(&session, &bindings, &WindowIdentifier::default())
        .await
        .context("Failed to bind shortcuts")?
        .response()
        .context("Shortcut binding was rejected")?;

    tracing::info!(
        "Global shortcuts registered (defaults: {} record, {} pause). Reconfigure in System Settings > Shortcuts.",
        TOGGLE_TRIGGER,
        PAUSE_TRIGGER
    );

    let mut stream = shortcuts
        .receive_activated()
        .await
        .context("Failed to listen for shortcut activations")?;

    while let Some(activated) = stream.next().await {
        let event = match activated.shortcut_id() {
            TOGGLE_ID => ShortcutEvent::ToggleRecording,
            PAUSE_ID => ShortcutEvent::TogglePause,
            other => {
                tracing::debug!("Ignoring unknown shortcut id: {}", other);
                continue;
            }
        };
        tracing::debug!("Shortcut activated: {:?}", event);
        if tx.send(event).await.is_err() {
            break;
        }
    }

    Ok(())
}
