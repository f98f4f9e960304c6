//! Minimal RFC 6455 client.
//!
//! Supports exactly what the ASR session needs: the upgrade handshake,
//! masked single-frame client messages, and a frame reader that hands
//! binary/ping/pong/close to the caller. Continuation and text frames are
//! returned verbatim; the session ignores them.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use anytalk_foundation::NetError;

use crate::tls::{classify_read_err, classify_write_err, MaybeTlsStream};

/// Upper bound on a single frame's declared payload length.
const MAX_FRAME_BYTES: u64 = 16 * 1024 * 1024;

/// Upper bound on the upgrade response head.
const MAX_HANDSHAKE_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Other(u8),
}

impl Opcode {
    fn code(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
            Opcode::Other(c) => c & 0x0F,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0x0 => Opcode::Continuation,
            0x1 => Opcode::Text,
            0x2 => Opcode::Binary,
            0x8 => Opcode::Close,
            0x9 => Opcode::Ping,
            0xA => Opcode::Pong,
            other => Opcode::Other(other),
        }
    }
}

#[derive(Debug)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
    pub fin: bool,
}

/// A WebSocket client over any blocking byte stream.
///
/// Reads are buffered: a frame that arrives split across socket reads is
/// reassembled transparently, and a read timeout mid-frame surfaces as
/// [`NetError::WouldBlock`] with the partial data retained for the next
/// call.
#[derive(Debug)]
pub struct WebSocket<S> {
    stream: S,
    buf: Vec<u8>,
}

impl<S: Read + Write> WebSocket<S> {
    /// Perform the HTTP/1.1 upgrade handshake. `extra_headers` are written
    /// after the standard upgrade headers, in the supplied order.
    pub fn client(
        mut stream: S,
        host: &str,
        path: &str,
        extra_headers: &[(String, String)],
    ) -> Result<Self, NetError> {
        let key: [u8; 16] = rand::random();
        let key_b64 = BASE64.encode(key);

        let mut req = format!(
            "GET {path} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key_b64}\r\n\
             Sec-WebSocket-Version: 13\r\n"
        );
        for (name, value) in extra_headers {
            req.push_str(name);
            req.push_str(": ");
            req.push_str(value);
            req.push_str("\r\n");
        }
        req.push_str("\r\n");

        stream.write_all(req.as_bytes()).map_err(classify_write_err)?;
        stream.flush().map_err(classify_write_err)?;

        let mut ws = Self {
            stream,
            buf: Vec::new(),
        };

        let head_end = loop {
            if let Some(pos) = find_delimiter(&ws.buf) {
                break pos + 4;
            }
            if ws.buf.len() > MAX_HANDSHAKE_BYTES {
                return Err(NetError::Handshake("oversized upgrade response".into()));
            }
            match ws.read_more() {
                Ok(_) => {}
                // The handshake runs before the read timeout is configured,
                // but tolerate one anyway.
                Err(NetError::WouldBlock) => continue,
                Err(NetError::ConnectionClosed) => {
                    return Err(NetError::Handshake(
                        "connection closed during upgrade".into(),
                    ))
                }
                Err(e) => return Err(e),
            }
        };

        let head = String::from_utf8_lossy(&ws.buf[..head_end]).into_owned();
        if !head.starts_with("HTTP/1.1 101") {
            let status = head.lines().next().unwrap_or("").to_string();
            return Err(NetError::Handshake(format!(
                "unexpected upgrade response: {status}"
            )));
        }
        tracing::debug!(host, path, "websocket upgrade complete");
        ws.buf.drain(..head_end);
        Ok(ws)
    }

    /// Read the next frame. Returns [`NetError::WouldBlock`] when the
    /// underlying read times out before a complete frame is available; any
    /// partially received frame is kept for the next call.
    pub fn read_frame(&mut self) -> Result<Frame, NetError> {
        loop {
            if let Some(frame) = self.try_parse_frame()? {
                return Ok(frame);
            }
            self.read_more()?;
        }
    }

    pub fn send_binary(&mut self, payload: &[u8]) -> Result<(), NetError> {
        self.send_frame(Opcode::Binary, payload)
    }

    pub fn send_pong(&mut self, payload: &[u8]) -> Result<(), NetError> {
        self.send_frame(Opcode::Pong, payload)
    }

    /// Best-effort close frame. Safe to call on an already-broken
    /// connection.
    pub fn close(&mut self) {
        let _ = self.send_frame(Opcode::Close, &[]);
    }

    fn read_more(&mut self) -> Result<(), NetError> {
        let mut tmp = [0u8; 4096];
        let n = self.stream.read(&mut tmp).map_err(classify_read_err)?;
        if n == 0 {
            return Err(NetError::ConnectionClosed);
        }
        self.buf.extend_from_slice(&tmp[..n]);
        Ok(())
    }

    /// Try to cut one complete frame off the front of the buffer. Leaves
    /// the buffer untouched when the frame is still incomplete.
    fn try_parse_frame(&mut self) -> Result<Option<Frame>, NetError> {
        let buf = &self.buf;
        if buf.len() < 2 {
            return Ok(None);
        }
        let fin = buf[0] & 0x80 != 0;
        let opcode = Opcode::from_code(buf[0] & 0x0F);
        let masked = buf[1] & 0x80 != 0;

        let mut offset = 2usize;
        let payload_len: u64 = match buf[1] & 0x7F {
            126 => {
                if buf.len() < offset + 2 {
                    return Ok(None);
                }
                let len = u16::from_be_bytes([buf[2], buf[3]]) as u64;
                offset += 2;
                len
            }
            127 => {
                if buf.len() < offset + 8 {
                    return Ok(None);
                }
                let mut be = [0u8; 8];
                be.copy_from_slice(&buf[2..10]);
                offset += 8;
                u64::from_be_bytes(be)
            }
            len => len as u64,
        };
        if payload_len > MAX_FRAME_BYTES {
            return Err(NetError::Frame(format!(
                "declared payload of {payload_len} bytes exceeds the 16 MiB limit"
            )));
        }

        // Servers send unmasked frames; tolerate a masked one anyway.
        let mask_key = if masked {
            if buf.len() < offset + 4 {
                return Ok(None);
            }
            let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
            offset += 4;
            Some(key)
        } else {
            None
        };

        let total = offset + payload_len as usize;
        if buf.len() < total {
            return Ok(None);
        }

        let mut payload = self.buf[offset..total].to_vec();
        if let Some(key) = mask_key {
            for (i, byte) in payload.iter_mut().enumerate() {
                *byte ^= key[i % 4];
            }
        }
        self.buf.drain(..total);
        Ok(Some(Frame {
            opcode,
            payload,
            fin,
        }))
    }

    /// Client frames are always masked with a fresh random key.
    fn send_frame(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), NetError> {
        let mut frame = Vec::with_capacity(payload.len() + 14);
        frame.push(0x80 | opcode.code());

        const MASK_BIT: u8 = 0x80;
        match payload.len() {
            n if n < 126 => frame.push(MASK_BIT | n as u8),
            n if n <= u16::MAX as usize => {
                frame.push(MASK_BIT | 126);
                frame.extend_from_slice(&(n as u16).to_be_bytes());
            }
            n => {
                frame.push(MASK_BIT | 127);
                frame.extend_from_slice(&(n as u64).to_be_bytes());
            }
        }

        let key: [u8; 4] = rand::random();
        frame.extend_from_slice(&key);
        frame.extend(payload.iter().enumerate().map(|(i, b)| b ^ key[i % 4]));

        self.stream.write_all(&frame).map_err(classify_write_err)?;
        self.stream.flush().map_err(classify_write_err)
    }
}

impl WebSocket<MaybeTlsStream> {
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<(), NetError> {
        self.stream.set_read_timeout(timeout)
    }

    /// Close frame plus transport shutdown. Idempotent.
    pub fn shutdown(&mut self) {
        self.close();
        self.stream.close();
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
