use rodio::OutputStreamBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Earcons played at lifecycle edges, standing in for visual notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackSound {
    Start,
    Stop,
    Complete,
    Error,
}

pub struct AudioFeedback {
    enabled: bool,
    paths: HashMap<FeedbackSound, PathBuf>,
}

impl AudioFeedback {
    pub fn new(enabled: bool, paths: HashMap<FeedbackSound, PathBuf>) -> Self {
        Self { enabled, paths }
    }

    /// Play the earcon for `sound`, if feedback is enabled and a path is
    /// configured for it. Decoding and playback block, so they run off the
    /// async runtime; failures are logged and swallowed.
    pub async fn play(&self, sound: FeedbackSound) {
        if !self.enabled {
            return;
        }
        let Some(path) = self.paths.get(&sound).cloned() else {
            return;
        };

        tokio::task::spawn_blocking(move || {
            if let Err(e) = play_file(&path) {
                tracing::warn!("Failed to play sound {}: {}", path.display(), e);
            }
        })
        .await
        .ok();
    }
}

fn play_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = open_sound(path)?;
    let stream_handle = OutputStreamBuilder::open_default_stream()?;
    let sink = rodio::play(stream_handle.mixer(), BufReader::new(file))?;
    sink.sleep_until_end();
    Ok(())
}

/// Bare file names resolve against the bundled asset directories.
fn open_sound(path: &Path) -> std::io::Result<File> {
    let search_roots = [Path::new(""), Path::new("assets"), Path::new("/usr/share/murmur/assets")];
    let mut last_err = None;
    for root in search_roots {
        match File::open(root.join(path)) {
            Ok(file) => return Ok(file),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound)))
}
