//! Top-level coordinator. Owns capture, the connection pool, and the
//! session slots; serializes start/stop/cancel from arbitrary host threads.
//!
//! Locking: `control` serializes the control operations themselves (it may
//! be held across a dial). `slots` guards the two session slots and the
//! drain-wait handle with short critical sections only, because the
//! drain-wait thread also takes it when it reaps a finished session.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use anytalk_audio::{chunk_ring, AudioCapture, AudioTarget};
use anytalk_foundation::{
    AsrConfig, AsrError, AsrEvent, EventSink, SessionStatus, RING_CAPACITY_CHUNKS,
};

use crate::dial::connect_asr;
use crate::pool::ConnectionPool;
use crate::session::Session;

#[derive(Default)]
struct SessionSlots {
    active: Option<Session>,
    draining: Option<Session>,
    drain_wait: Option<JoinHandle<()>>,
}

struct ContextInner {
    config: AsrConfig,
    events: EventSink,
    target: Arc<AudioTarget>,
    capture: Mutex<AudioCapture>,
    pool: ConnectionPool,
    control: Mutex<()>,
    slots: Mutex<SessionSlots>,
}

pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Initialize: start capture (best-effort; the device may appear
    /// later) and the connection pool.
    pub fn new(config: AsrConfig, events: EventSink) -> Self {
        let target = Arc::new(AudioTarget::new());
        let mut capture = AudioCapture::new(Arc::clone(&target));
        if let Err(e) = capture.start() {
            warn!("audio capture unavailable at init: {e}");
        }

        let pool = ConnectionPool::new(config.clone());
        pool.start();

        Self {
            inner: Arc::new(ContextInner {
                config,
                events,
                target,
                capture: Mutex::new(capture),
                pool,
                control: Mutex::new(()),
                slots: Mutex::new(SessionSlots::default()),
            }),
        }
    }

    /// Start a session. Prefers the pool's hot spare; dials on demand
    /// otherwise, emitting `connecting` while the host waits. Emits
    /// `recording` on success. A second start replaces the first session.
    pub fn start_session(&self) -> Result<(), AsrError> {
        let _control = self.inner.control.lock();
        self.abort_draining();

        // The device may not have been ready at init; retry cheaply.
        if let Err(e) = self.inner.capture.lock().start() {
            warn!("audio capture still unavailable: {e}");
        }

        let replaced = { self.inner.slots.lock().active.take() };
        if let Some(old) = replaced {
            debug!("replacing running session");
            old.cancel();
            old.join();
        }

        let ws = match self.inner.pool.take() {
            Some(conn) => {
                debug!("using hot spare connection");
                conn
            }
            None => {
                (self.inner.events)(AsrEvent::Status(SessionStatus::Connecting));
                match connect_asr(&self.inner.config) {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("on-demand dial failed: {e}");
                        (self.inner.events)(AsrEvent::Error("connection failed".to_string()));
                        return Err(e.into());
                    }
                }
            }
        };

        let (mut audio_tx, audio_rx) = chunk_ring(RING_CAPACITY_CHUNKS);
        let generation = self.inner.target.set(Box::new(move |chunk| {
            // Full ring drops the newest chunk rather than stalling capture.
            audio_tx.push(chunk);
        }));

        let session = match Session::start(
            ws,
            audio_rx,
            Arc::clone(&self.inner.target),
            generation,
            self.inner.config.clone(),
            Arc::clone(&self.inner.events),
        ) {
            Ok(session) => session,
            Err(e) => {
                self.inner.target.clear_if(generation);
                return Err(e);
            }
        };

        self.inner.slots.lock().active = Some(session);
        (self.inner.events)(AsrEvent::Status(SessionStatus::Recording));
        Ok(())
    }

    /// Stop with drain: detach the microphone and let the session read
    /// until the server's terminal response; a drain-wait thread reaps it.
    /// With no active session this just emits `idle`.
    pub fn stop_session(&self) {
        let _control = self.inner.control.lock();
        self.abort_draining();

        let active = { self.inner.slots.lock().active.take() };
        let Some(session) = active else {
            (self.inner.events)(AsrEvent::Status(SessionStatus::Idle));
            return;
        };

        session.stop_audio();

        let inner = Arc::clone(&self.inner);
        let watched = session.clone();
        let mut slots = self.inner.slots.lock();
        slots.draining = Some(session);
        let reaper = thread::Builder::new()
            .name("drain-wait".to_string())
            .spawn(move || {
                watched.join();
                let mut slots = inner.slots.lock();
                // A restart may have aborted and replaced us already.
                if slots
                    .draining
                    .as_ref()
                    .is_some_and(|d| d.is_same(&watched))
                {
                    slots.draining = None;
                    slots.drain_wait = None;
                }
            });
        match reaper {
            Ok(handle) => slots.drain_wait = Some(handle),
            Err(e) => {
                warn!("failed to spawn drain-wait thread: {e}; aborting drain");
                let session = slots.draining.take();
                drop(slots);
                if let Some(session) = session {
                    session.cancel();
                    session.join();
                }
            }
        }
    }

    /// Abort: cancel the active session, reap anything draining, emit
    /// `idle`.
    pub fn cancel(&self) {
        let _control = self.inner.control.lock();
        let active = { self.inner.slots.lock().active.take() };
        if let Some(session) = active {
            session.cancel();
            session.join();
        }
        self.abort_draining();
        (self.inner.events)(AsrEvent::Status(SessionStatus::Idle));
    }

    /// Tear everything down. Called on drop; safe to call twice.
    pub fn shutdown(&self) {
        self.cancel();
        self.inner.pool.stop();
        self.inner.capture.lock().stop();
    }

    /// Cancel and reap any draining session. The slot lock is *not* held
    /// across the joins: the drain-wait thread takes the same lock when it
    /// finishes, and may already have cleaned the slot.
    fn abort_draining(&self) {
        let (session, reaper) = {
            let mut slots = self.inner.slots.lock();
            (slots.draining.take(), slots.drain_wait.take())
        };
        if let Some(session) = session {
            session.cancel();
            session.join();
        }
        if let Some(reaper) = reaper {
            let _ = reaper.join();
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.shutdown();
    }
}
