//! The per-session worker.
//!
//! One thread owns the WebSocket for the whole session and interleaves two
//! jobs: pumping audio chunks from the ring onto the wire, and reading
//! server frames. Reads use a short timeout so every iteration re-checks
//! the cancel flag; the latency from `cancel()` to thread exit is bounded
//! by roughly that timeout plus any in-flight write.
//!
//! Stop is graceful: once the audio sink is cleared and the ring is
//! drained, a single empty audio frame with the `last` flag tells the
//! service to flush its remaining utterances, and the worker keeps reading
//! until the server's terminal response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use anytalk_audio::{AudioTarget, ChunkReceiver};
use anytalk_foundation::{AsrConfig, AsrError, AsrEvent, EventSink, NetError, SessionStatus};
use anytalk_net::{Opcode, WsConnection};
use anytalk_protocol::{
    decode_server_frame, encode_audio_chunk, encode_full_client_request, initial_request_body,
    Interpreter, ServerFrame, FLAGS_TERMINAL_RESPONSE,
};

/// Read timeout of the worker loop; bounds cancel latency.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

struct SessionShared {
    running: AtomicBool,
    target: Arc<AudioTarget>,
    sink_generation: u64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to one recognition session. Clones refer to the same session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Take ownership of an upgraded connection and spawn the worker.
    /// `sink_generation` is the registration token of this session's sink
    /// in the shared audio target.
    pub fn start(
        ws: WsConnection,
        audio_rx: ChunkReceiver,
        target: Arc<AudioTarget>,
        sink_generation: u64,
        config: AsrConfig,
        events: EventSink,
    ) -> Result<Self, AsrError> {
        let shared = Arc::new(SessionShared {
            running: AtomicBool::new(true),
            target,
            sink_generation,
            worker: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("asr-session".to_string())
            .spawn(move || run_worker(ws, audio_rx, worker_shared, config, events))
            .map_err(|e| AsrError::Internal(format!("failed to spawn session worker: {e}")))?;
        *shared.worker.lock() = Some(handle);

        Ok(Self { shared })
    }

    /// Detach from the microphone. The session keeps reading so the server
    /// can flush remaining utterances (the drain phase).
    pub fn stop_audio(&self) {
        self.shared
            .target
            .clear_if(self.shared.sink_generation);
    }

    /// Abort: stop consuming audio and make the worker exit at its next
    /// poll.
    pub fn cancel(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared
            .target
            .clear_if(self.shared.sink_generation);
    }

    /// Wait for the worker to exit. Idempotent; callable from any handle.
    pub fn join(&self) {
        let handle = self.shared.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub(crate) fn is_same(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

fn run_worker(
    mut ws: WsConnection,
    mut audio_rx: ChunkReceiver,
    shared: Arc<SessionShared>,
    config: AsrConfig,
    events: EventSink,
) {
    if let Err(e) = ws.set_read_timeout(Some(READ_TIMEOUT)) {
        warn!("failed to set read timeout: {e}");
    }

    // Once a send fails we stop writing but keep reading: the server may
    // still deliver finals for audio it already has.
    let mut audio_done = false;

    let body = initial_request_body(config.mode);
    debug!(mode = %config.mode, "sending initial request");
    if let Err(e) = ws.send_binary(&encode_full_client_request(&body)) {
        warn!("initial request failed: {e}");
        audio_done = true;
    }

    let mut interpreter = Interpreter::new(config.mode);

    while shared.running.load(Ordering::Acquire) {
        if !audio_done {
            // Sink already cleared means no new chunks can arrive, so the
            // drain below empties the ring for good.
            let detached = !shared.target.is_registered(shared.sink_generation);

            let mut send_failed = false;
            while let Some(chunk) = audio_rx.pop() {
                if let Err(e) = ws.send_binary(&encode_audio_chunk(chunk.as_bytes(), false)) {
                    warn!("audio send failed, draining responses: {e}");
                    send_failed = true;
                    break;
                }
            }

            if send_failed {
                audio_done = true;
            } else if detached {
                debug!("audio input ended, sending terminal marker");
                if let Err(e) = ws.send_binary(&encode_audio_chunk(&[], true)) {
                    warn!("failed to send terminal audio marker: {e}");
                }
                audio_done = true;
            }
        }

        match ws.read_frame() {
            Err(NetError::WouldBlock) => continue,
            Err(NetError::ConnectionClosed) => {
                debug!("connection closed by server");
                break;
            }
            Err(e) => {
                warn!("read failed: {e}");
                break;
            }
            Ok(frame) => match frame.opcode {
                Opcode::Close => {
                    debug!("close frame from server");
                    break;
                }
                Opcode::Ping => {
                    if let Err(e) = ws.send_pong(&frame.payload) {
                        warn!("pong failed: {e}");
                        break;
                    }
                }
                Opcode::Binary => match decode_server_frame(&frame.payload) {
                    ServerFrame::Error { code, message } => {
                        error!(code, %message, "server error");
                        (events)(AsrEvent::Error(message));
                        break;
                    }
                    ServerFrame::Response { flags, payload } => {
                        let transcripts = interpreter.ingest(&payload);
                        // Commits first, then the preview that follows them.
                        for final_text in transcripts.finals {
                            (events)(AsrEvent::Final(final_text));
                        }
                        if let Some(partial) = transcripts.partial {
                            (events)(AsrEvent::Partial(partial));
                        }
                        if flags == FLAGS_TERMINAL_RESPONSE {
                            info!("terminal response received");
                            break;
                        }
                    }
                    ServerFrame::Unknown => debug!("ignoring unknown vendor frame"),
                },
                // Text and continuation frames are not part of the vendor
                // protocol.
                _ => {}
            },
        }
    }

    ws.shutdown();
    // Un-register before the terminal status so a sink can never outlive
    // its session.
    shared.target.clear_if(shared.sink_generation);
    (events)(AsrEvent::Status(SessionStatus::Idle));
    debug!("session worker exited");
}
