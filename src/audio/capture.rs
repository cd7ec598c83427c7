use super::format::AudioFormat;
use crate::error::SessionError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Acquires exclusive capture device handles for a recording session.
///
/// The session owns the returned handle for its whole lifetime: suspended
/// (device kept open) across pauses, released on stop. Tests substitute a
/// scripted provider.
pub trait CaptureProvider {
    fn acquire(
        &self,
        format: AudioFormat,
        fragments: mpsc::Sender<Vec<f32>>,
    ) -> Result<Box<dyn CaptureHandle>, SessionError>;
}

/// An open capture device. `release` must be idempotent: both the explicit
/// stop path and the shutdown path may call it.
pub trait CaptureHandle {
    /// Suspend capture without releasing the device.
    fn suspend(&mut self);

    /// Resume a suspended capture.
    fn resume(&mut self);

    /// Stop capture and release the device.
    fn release(&mut self);
}

/// Microphone capture via the default cpal input device.
pub struct CpalCaptureProvider;

impl CaptureProvider for CpalCaptureProvider {
    /// Acquire the default input device and start streaming fragments into
    /// `fragments`.
    ///
    /// The returned handle holds the `cpal::Stream`, which is `!Send`; the
    /// owning session must live on a `LocalSet`.
    fn acquire(
        &self,
        format: AudioFormat,
        fragments: mpsc::Sender<Vec<f32>>,
    ) -> Result<Box<dyn CaptureHandle>, SessionError> {
        let ring = HeapRb::<f32>::new(format.samples_spanning(Duration::from_secs(60)));
        let (mut producer, consumer) = ring.split();

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            SessionError::DeviceUnavailable("no input audio device available".to_string())
        })?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let notify = Arc::new(Notify::new());
        let notify_callback = notify.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                    notify_callback.notify_one();
                },
                move |err| {
                    tracing::warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;

        let fragment_size = format.samples_spanning(Duration::from_millis(500));
        tokio::task::spawn_local(bridge_task(consumer, fragments, fragment_size, notify.clone()));

        tracing::info!("Audio capture started");
        Ok(Box::new(CpalCaptureHandle {
            stream: Some(stream),
            notify,
        }))
    }
}

/// Drains the ring buffer filled by the cpal callback into the session's
/// fragment channel. Exits once the channel closes (the session swapped it
/// out after stopping).
async fn bridge_task(
    mut consumer: impl Consumer<Item = f32>,
    tx: mpsc::Sender<Vec<f32>>,
    fragment_size: usize,
    notify: Arc<Notify>,
) {
    loop {
        notify.notified().await;

        if tx.is_closed() {
            break;
        }

        let available = consumer.occupied_len();
        if available >= fragment_size {
            let mut fragment = vec![0.0f32; fragment_size];
            let n = consumer.pop_slice(&mut fragment);
            fragment.truncate(n);

            if tx.send(fragment).await.is_err() {
                break;
            }
        }
    }
}

struct CpalCaptureHandle {
    stream: Option<cpal::Stream>,
    notify: Arc<Notify>,
}

impl CaptureHandle for CpalCaptureHandle {
    fn suspend(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::warn!("Failed to pause audio stream: {}", e);
            }
        }
    }

    fn resume(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.play() {
                tracing::warn!("Failed to resume audio stream: {}", e);
            }
        }
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Wake the bridge so it notices the closed channel and exits.
            self.notify.notify_one();
            tracing::info!("Audio capture released");
        }
    }
}
