//! Keeps one pre-connected "hot spare" WebSocket so the next session
//! starts without paying for DNS, TLS, and the upgrade round trip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use anytalk_foundation::AsrConfig;
use anytalk_net::WsConnection;

use crate::dial::connect_asr;

/// Backoff after a failed pre-connect.
const DIAL_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// How long the maintainer parks while the spare sits unused. Doubles as a
/// periodic wakeup window.
const SPARE_PARK_TIMEOUT: Duration = Duration::from_secs(30);

/// Settling delay after the spare is consumed, so rapid session cycles do
/// not hammer the service.
const REPLENISH_SETTLE: Duration = Duration::from_millis(100);

struct PoolShared {
    config: AsrConfig,
    running: AtomicBool,
    spare: Mutex<Option<WsConnection>>,
    consumed: Condvar,
}

pub struct ConnectionPool {
    shared: Arc<PoolShared>,
    maintainer: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    pub fn new(config: AsrConfig) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                config,
                running: AtomicBool::new(false),
                spare: Mutex::new(None),
                consumed: Condvar::new(),
            }),
            maintainer: Mutex::new(None),
        }
    }

    /// Spawn the maintainer thread. Idempotent.
    pub fn start(&self) {
        let mut maintainer = self.maintainer.lock();
        if maintainer.is_some() {
            return;
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("asr-pool".to_string())
            .spawn(move || maintainer_main(shared))
        {
            Ok(handle) => *maintainer = Some(handle),
            Err(e) => error!("failed to spawn pool maintainer: {e}"),
        }
    }

    /// Remove the spare, if any, and wake the maintainer to replenish.
    /// Never blocks on I/O.
    pub fn take(&self) -> Option<WsConnection> {
        let conn = self.shared.spare.lock().take();
        if conn.is_some() {
            self.shared.consumed.notify_one();
        }
        conn
    }

    /// Stop the maintainer and close any held connection. Idempotent.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.consumed.notify_one();
        let handle = self.maintainer.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        if let Some(mut conn) = self.shared.spare.lock().take() {
            conn.shutdown();
        }
    }
}

fn maintainer_main(shared: Arc<PoolShared>) {
    info!("connection pool maintainer started");
    while shared.running.load(Ordering::SeqCst) {
        let needs_connection = shared.spare.lock().is_none();
        if needs_connection {
            debug!("pre-connecting hot spare");
            match connect_asr(&shared.config) {
                Ok(conn) => {
                    info!("hot spare ready");
                    *shared.spare.lock() = Some(conn);
                }
                Err(e) => {
                    warn!("pre-connect failed: {e}; retrying in {DIAL_RETRY_BACKOFF:?}");
                    interruptible_sleep(&shared, DIAL_RETRY_BACKOFF);
                    continue;
                }
            }
        }

        {
            let mut spare = shared.spare.lock();
            if shared.running.load(Ordering::SeqCst) && spare.is_some() {
                let _ = shared.consumed.wait_for(&mut spare, SPARE_PARK_TIMEOUT);
            }
        }
        thread::sleep(REPLENISH_SETTLE);
    }
    info!("connection pool maintainer stopped");
}

/// Sleep in small steps so `stop()` is not held up by a backoff.
fn interruptible_sleep(shared: &PoolShared, total: Duration) {
    let step = Duration::from_millis(100);
    let mut waited = Duration::ZERO;
    while waited < total && shared.running.load(Ordering::SeqCst) {
        thread::sleep(step);
        waited += step;
    }
}
