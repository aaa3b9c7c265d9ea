//! cpal-based capture thread
//!
//! The stream callback appends interleaved frames (downmixed to mono)
//! into a buffer shared only between the callback and the capture
//! thread; nothing else touches it until the thread sends the finished
//! buffer back over the result channel.

use crate::config::AudioConfig;
use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Handle to a running capture thread, exclusively owned by the
/// recording session that spawned it
pub struct CaptureHandle {
    stop_flag: Arc<AtomicBool>,
    done_rx: Receiver<Result<Vec<f32>, AudioError>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CaptureHandle {
    /// Resolve the input device and start capturing on a new thread.
    /// Device and stream setup errors surface here, before any state
    /// transition happens.
    pub fn spawn(config: &AudioConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = if config.device == "default" {
            host.default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("default".to_string()))?
        } else {
            find_input_device(&host, &config.device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::Connection(e.to_string()))?;

        let source_rate = supported.sample_rate().0;
        let source_channels = supported.channels() as usize;
        let target_rate = config.sample_rate;

        tracing::info!(
            "Capturing from '{}' at {} Hz, {} channel(s)",
            device_name,
            source_rate,
            source_channels
        );

        let stop_flag = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        let thread_stop = stop_flag.clone();
        let thread = thread::spawn(move || {
            let samples = Arc::new(Mutex::new(Vec::<f32>::new()));
            let stream_config = cpal::StreamConfig {
                channels: supported.channels(),
                sample_rate: supported.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            };
            let err_fn = |err| tracing::error!("Audio stream error: {}", err);

            let sink = samples.clone();
            let build_result = match supported.sample_format() {
                cpal::SampleFormat::F32 => device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _| push_frames(&sink, data, source_channels),
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::I16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _| {
                        let floats: Vec<f32> =
                            data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        push_frames(&sink, &floats, source_channels)
                    },
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::U16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _| {
                        let floats: Vec<f32> = data
                            .iter()
                            .map(|&s| (s as f32 - 32768.0) / 32768.0)
                            .collect();
                        push_frames(&sink, &floats, source_channels)
                    },
                    err_fn,
                    None,
                ),
                other => {
                    let _ = done_tx.send(Err(AudioError::StreamError(format!(
                        "unsupported sample format: {:?}",
                        other
                    ))));
                    return;
                }
            };

            let stream = match build_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = done_tx.send(Err(AudioError::StreamError(e.to_string())));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = done_tx.send(Err(AudioError::StreamError(e.to_string())));
                return;
            }

            while !thread_stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));
            }

            drop(stream);

            let captured = std::mem::take(&mut *samples.lock().unwrap_or_else(|p| p.into_inner()));
            if captured.is_empty() {
                let _ = done_tx.send(Err(AudioError::EmptyRecording));
            } else {
                let resampled = resample_linear(&captured, source_rate, target_rate);
                let _ = done_tx.send(Ok(resampled));
            }
        });

        Ok(Self {
            stop_flag,
            done_rx,
            thread: Some(thread),
        })
    }

    /// Signal the thread to stop and wait up to `deadline` for the
    /// captured samples. On timeout the thread is abandoned: dropping
    /// its JoinHandle detaches it, so it can never block process exit.
    pub fn stop_blocking(mut self, deadline: Duration) -> Result<Vec<f32>, AudioError> {
        self.stop_flag.store(true, Ordering::SeqCst);

        match self.done_rx.recv_timeout(deadline) {
            Ok(result) => {
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Capture thread still running after {:?}, abandoning it",
                    deadline
                );
                self.thread.take();
                Err(AudioError::StopTimeout(deadline))
            }
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
                Err(AudioError::StreamError(
                    "capture thread exited without a result".to_string(),
                ))
            }
        }
    }

    /// Fake capture thread that returns the given samples on stop
    #[cfg(test)]
    pub fn fake(samples: Vec<f32>) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let thread_stop = stop_flag.clone();
        let thread = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            let _ = done_tx.send(Ok(samples));
        });
        Self {
            stop_flag,
            done_rx,
            thread: Some(thread),
        }
    }

    /// Fake capture thread that never finishes (for abandonment tests)
    #[cfg(test)]
    pub fn fake_hanging() -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = std::sync::mpsc::channel::<Result<Vec<f32>, AudioError>>();
        let thread = thread::spawn(move || {
            // Hold the sender so the channel never disconnects
            let _tx = done_tx;
            loop {
                thread::park();
            }
        });
        Self {
            stop_flag,
            done_rx,
            thread: Some(thread),
        }
    }
}

/// Downmix interleaved frames to mono and append to the shared buffer
fn push_frames(sink: &Arc<Mutex<Vec<f32>>>, data: &[f32], channels: usize) {
    let mut buffer = match sink.lock() {
        Ok(b) => b,
        Err(p) => p.into_inner(),
    };
    if channels <= 1 {
        buffer.extend_from_slice(data);
    } else {
        for frame in data.chunks_exact(channels) {
            buffer.push(frame.iter().sum::<f32>() / channels as f32);
        }
    }
}

/// Linear-interpolation resampling; adequate for speech input
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx];
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }

    out
}

/// Find an input device by name (exact, then case-insensitive, then
/// substring)
fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, AudioError> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .collect();

    let search_lower = name.to_lowercase();

    for exactness in 0..3 {
        for device in &devices {
            let Ok(dev_name) = device.name() else {
                continue;
            };
            let matched = match exactness {
                0 => dev_name == name,
                1 => dev_name.to_lowercase() == search_lower,
                _ => dev_name.to_lowercase().contains(&search_lower),
            };
            if matched {
                tracing::debug!("Matched audio device: {}", dev_name);
                return host
                    .input_devices()
                    .map_err(|e| AudioError::Connection(e.to_string()))?
                    .find(|d| d.name().map(|n| n == dev_name).unwrap_or(false))
                    .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()));
            }
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_capture_returns_samples_on_stop() {
        let handle = CaptureHandle::fake(vec![0.5; 100]);
        let samples = handle.stop_blocking(Duration::from_secs(5)).unwrap();
        assert_eq!(samples.len(), 100);
    }

    #[test]
    fn hanging_capture_is_abandoned_on_deadline() {
        let handle = CaptureHandle::fake_hanging();
        let result = handle.stop_blocking(Duration::from_millis(50));
        assert!(matches!(result, Err(AudioError::StopTimeout(_))));
        // The abandoned thread is detached; this test returning at all
        // shows it does not block.
    }

    #[test]
    fn resample_identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 16000, 16000), samples);
    }

    #[test]
    fn resample_halves_length_at_double_rate() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let out = resample_linear(&samples, 32000, 16000);
        assert_eq!(out.len(), 500);
        // Values stay monotonic for a monotonic input
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn downmix_averages_channels() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        push_frames(&sink, &[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(*sink.lock().unwrap(), vec![0.5, 0.5]);
    }
}
