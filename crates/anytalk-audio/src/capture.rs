//! Continuous microphone capture on a dedicated thread.
//!
//! The `cpal` stream is created, owned, and dropped entirely inside the
//! "audio-capture" thread (the stream handle is not `Send`). The device's
//! native format is accepted as-is and normalized by [`ChunkAssembler`];
//! chunks are routed to the [`AudioTarget`], which drops them while no
//! session is registered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{bounded, Sender};
use tracing::{error, info, warn};

use anytalk_foundation::AudioError;

use crate::chunker::ChunkAssembler;
use crate::target::AudioTarget;

/// How long `start()` waits for the capture thread to report readiness.
const START_TIMEOUT: Duration = Duration::from_secs(3);

struct Worker {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

pub struct AudioCapture {
    target: Arc<AudioTarget>,
    worker: Option<Worker>,
}

impl AudioCapture {
    pub fn new(target: Arc<AudioTarget>) -> Self {
        Self {
            target,
            worker: None,
        }
    }

    /// Idempotent start. Fails when no usable input device exists right
    /// now; a later call may succeed once one appears.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if let Some(worker) = &self.worker {
            if !worker.handle.is_finished() {
                return Ok(());
            }
        }
        // Reap a worker that died (e.g. device disappeared) before retrying.
        if let Some(worker) = self.worker.take() {
            worker.shutdown.store(true, Ordering::SeqCst);
            let _ = worker.handle.join();
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded(1);
        let target = Arc::clone(&self.target);
        let flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || capture_main(target, flag, ready_tx))
            .map_err(|e| AudioError::Fatal(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(())) => {
                self.worker = Some(Worker { handle, shutdown });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                // Thread wedged before reporting; tell it to exit and move on.
                shutdown.store(true, Ordering::SeqCst);
                Err(AudioError::Fatal(
                    "capture thread did not report readiness".to_string(),
                ))
            }
        }
    }

    /// Idempotent stop; joins the capture thread.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown.store(true, Ordering::SeqCst);
            let _ = worker.handle.join();
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_main(target: Arc<AudioTarget>, shutdown: Arc<AtomicBool>, ready: Sender<Result<(), AudioError>>) {
    let stream = match open_stream(target) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            error!("capture device unavailable: {e}");
            let _ = ready.send(Err(e));
            return;
        }
    };

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }
    drop(stream);
    info!("audio capture stopped");
}

fn open_stream(target: Arc<AudioTarget>) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::DeviceNotFound)?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device.default_input_config()?;

    info!(
        device = %device_name,
        rate = supported.sample_rate().0,
        channels = supported.channels(),
        format = ?supported.sample_format(),
        "opening capture device"
    );

    let config: cpal::StreamConfig = supported.config();
    let mut assembler = ChunkAssembler::new(supported.sample_rate().0, supported.channels());
    let err_fn = |err: cpal::StreamError| error!("capture stream error: {err}");

    let stream = match supported.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &_| feed(&mut assembler, &target, data),
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &_| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
                    .collect();
                feed(&mut assembler, &target, &samples);
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &_| {
                let samples: Vec<i16> = data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                feed(&mut assembler, &target, &samples);
            },
            err_fn,
            None,
        )?,
        other => {
            warn!("capture format {other:?} not supported");
            return Err(AudioError::FormatNotSupported {
                format: format!("{other:?}"),
            });
        }
    };

    stream.play()?;
    Ok(stream)
}

fn feed(assembler: &mut ChunkAssembler, target: &AudioTarget, samples: &[i16]) {
    if !target.is_active() {
        // No session listening; keep the assembler clean so the next
        // session does not start with stale audio.
        assembler.reset();
        return;
    }
    assembler.accept(samples, |chunk| {
        target.send(chunk);
    });
}
