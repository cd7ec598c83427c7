use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::task;

/// Keyboard shortcut used to trigger the paste after the text lands on the
/// clipboard. Terminals generally want `CtrlShift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    Super,
    CtrlShift,
    Ctrl,
}

impl PasteMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super" => Some(Self::Super),
            "ctrl_shift" => Some(Self::CtrlShift),
            "ctrl" => Some(Self::Ctrl),
            _ => None,
        }
    }

    fn keycodes(self) -> &'static str {
        match self {
            Self::Super => "125:1 47:1 47:0 125:0",          // Super+V
            Self::CtrlShift => "29:1 42:1 47:1 47:0 42:0 29:0", // Ctrl+Shift+V
            Self::Ctrl => "29:1 47:1 47:0 29:0",             // Ctrl+V
        }
    }
}

/// Places transcribed text at the focused cursor.
pub struct TextInjector {
    mode: PasteMode,
}

impl TextInjector {
    pub fn new(mode: PasteMode) -> Self {
        Self { mode }
    }

    /// Copy `text` to the clipboard via wl-copy, then trigger a paste
    /// keystroke via ydotool.
    pub async fn inject(&self, text: String) -> Result<()> {
        tracing::info!("Injecting text: {} chars", text.len());

        let mode = self.mode;

        // Use spawn_blocking for external commands
        task::spawn_blocking(move || {
            let mut child = Command::new("wl-copy")
                .stdin(Stdio::piped())
                .spawn()
                .context("Failed to spawn wl-copy")?;

            child
                .stdin
                .as_mut()
                .context("Failed to get wl-copy stdin")?
                .write_all(text.as_bytes())
                .context("Failed to write to wl-copy")?;

            child.wait().context("wl-copy failed")?;

            // Wait for clipboard to settle
            std::thread::sleep(Duration::from_millis(120));

            // The text is on the clipboard at this point, so a failed paste
            // keystroke downgrades to a manual-paste warning.
            match Command::new("ydotool").args(["key", mode.keycodes()]).output() {
                Ok(output) if output.status.success() => {
                    tracing::info!("Text injected successfully");
                }
                Ok(output) => {
                    tracing::warn!(
                        "ydotool exited with {}; text left on the clipboard",
                        output.status
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to execute ydotool: {}; text left on the clipboard", e);
                }
            }
            Ok::<(), anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paste_modes() {
        assert_eq!(PasteMode::parse("super"), Some(PasteMode::Super));
        assert_eq!(PasteMode::parse("ctrl_shift"), Some(PasteMode::CtrlShift));
        assert_eq!(PasteMode::parse("ctrl"), Some(PasteMode::Ctrl));
        assert_eq!(PasteMode::parse("alt"), None);
    }
}
