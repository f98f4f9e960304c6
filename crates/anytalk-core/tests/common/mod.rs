//! Shared test support: an in-process ASR server speaking server-side
//! RFC 6455 plus the vendor binary layer over loopback TCP, and an event
//! log for asserting callback ordering.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use anytalk_audio::AudioChunk;
use anytalk_foundation::{AsrEvent, EventSink, SessionStatus, CHUNK_SAMPLES};

// ─── Mock ASR server ────────────────────────────────────────────────

/// Accept exactly one connection and run `script` on it. Join the returned
/// handle to propagate script assertions.
pub fn serve_once<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(ServerConn) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let conn = ServerConn::upgrade(stream).expect("websocket upgrade");
        script(conn);
    });
    (port, handle)
}

/// Accept connections forever (the pool maintainer dials repeatedly), each
/// handled by `script` on its own thread. Threads die with the test
/// process.
pub fn serve_forever<F>(script: F) -> u16
where
    F: Fn(ServerConn) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(script);
    thread::spawn(move || {
        while let Ok((stream, _)) = listener.accept() {
            let script = Arc::clone(&script);
            thread::spawn(move || {
                if let Some(conn) = ServerConn::upgrade(stream) {
                    script(conn);
                }
            });
        }
    });
    port
}

/// A port nothing listens on.
pub fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Server side of one upgraded connection.
pub struct ServerConn {
    stream: TcpStream,
    pub request_head: String,
}

impl ServerConn {
    fn upgrade(mut stream: TcpStream) -> Option<Self> {
        let mut head = Vec::new();
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            match stream.read(&mut byte) {
                Ok(1) => head.push(byte[0]),
                _ => return None,
            }
            if head.len() > 64 * 1024 {
                return None;
            }
        }
        stream
            .write_all(
                b"HTTP/1.1 101 Switching Protocols\r\n\
                  Upgrade: websocket\r\n\
                  Connection: Upgrade\r\n\r\n",
            )
            .ok()?;
        Some(Self {
            stream,
            request_head: String::from_utf8_lossy(&head).into_owned(),
        })
    }

    /// Read one client frame: (opcode, unmasked payload). None on close of
    /// the underlying connection.
    pub fn read_message(&mut self) -> Option<(u8, Vec<u8>)> {
        let mut hdr = [0u8; 2];
        self.read_exact(&mut hdr)?;
        let opcode = hdr[0] & 0x0F;
        let masked = hdr[1] & 0x80 != 0;
        let mut len = (hdr[1] & 0x7F) as u64;
        if len == 126 {
            let mut ext = [0u8; 2];
            self.read_exact(&mut ext)?;
            len = u16::from_be_bytes(ext) as u64;
        } else if len == 127 {
            let mut ext = [0u8; 8];
            self.read_exact(&mut ext)?;
            len = u64::from_be_bytes(ext);
        }
        let key = if masked {
            let mut key = [0u8; 4];
            self.read_exact(&mut key)?;
            Some(key)
        } else {
            None
        };
        let mut payload = vec![0u8; len as usize];
        self.read_exact(&mut payload)?;
        if let Some(key) = key {
            for (i, byte) in payload.iter_mut().enumerate() {
                *byte ^= key[i % 4];
            }
        }
        Some((opcode, payload))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Option<()> {
        self.stream.read_exact(buf).ok()
    }

    pub fn send_frame(&mut self, opcode: u8, payload: &[u8]) {
        let mut out = vec![0x80 | opcode];
        match payload.len() {
            n if n < 126 => out.push(n as u8),
            n if n <= u16::MAX as usize => {
                out.push(126);
                out.extend_from_slice(&(n as u16).to_be_bytes());
            }
            n => {
                out.push(127);
                out.extend_from_slice(&(n as u64).to_be_bytes());
            }
        }
        out.extend_from_slice(payload);
        let _ = self.stream.write_all(&out);
    }

    pub fn send_binary(&mut self, payload: &[u8]) {
        self.send_frame(0x2, payload);
    }

    pub fn send_ping(&mut self, payload: &[u8]) {
        self.send_frame(0x9, payload);
    }
}

// ─── Vendor frame helpers ───────────────────────────────────────────

/// Full-server-response frame with the given message-type flags.
pub fn response_frame(flags: u8, json: &str) -> Vec<u8> {
    let mut out = vec![0x11, 0x90 | (flags & 0x0F), 0x10, 0x00];
    out.extend_from_slice(&[0, 0, 0, 0]); // sequence
    out.extend_from_slice(&(json.len() as u32).to_be_bytes());
    out.extend_from_slice(json.as_bytes());
    out
}

pub fn error_frame(code: u32, message: &str) -> Vec<u8> {
    let mut out = vec![0x11, 0xF0, 0x00, 0x00];
    out.extend_from_slice(&code.to_be_bytes());
    out.extend_from_slice(&(message.len() as u32).to_be_bytes());
    out.extend_from_slice(message.as_bytes());
    out
}

/// Message type nibble of a client vendor frame.
pub fn vendor_type(frame: &[u8]) -> u8 {
    frame[1] >> 4
}

pub fn vendor_flags(frame: &[u8]) -> u8 {
    frame[1] & 0x0F
}

/// Payload of an outbound vendor frame (4-byte header + u32 length).
pub fn vendor_payload(frame: &[u8]) -> &[u8] {
    &frame[8..]
}

// ─── Event log ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<AsrEvent>>>,
}

impl EventLog {
    pub fn sink(&self) -> EventSink {
        let events = Arc::clone(&self.events);
        Arc::new(move |event| events.lock().push(event))
    }

    pub fn snapshot(&self) -> Vec<AsrEvent> {
        self.events.lock().clone()
    }

    pub fn idle_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, AsrEvent::Status(SessionStatus::Idle)))
            .count()
    }

    /// Poll until `pred` holds over the log or the timeout elapses.
    pub fn wait_for<F>(&self, pred: F, timeout: Duration) -> bool
    where
        F: Fn(&[AsrEvent]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred(&self.events.lock()) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

/// A pipeline chunk whose first sample tags it.
pub fn pcm_chunk(tag: i16) -> AudioChunk {
    let mut samples = [0i16; CHUNK_SAMPLES];
    samples[0] = tag;
    AudioChunk::from_samples(&samples)
}
