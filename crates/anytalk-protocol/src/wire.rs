//! Binary framing of the vendor protocol.
//!
//! Every frame starts with a 4-byte header:
//!
//! | byte | bits 7-4            | bits 3-0              |
//! |------|---------------------|-----------------------|
//! | 0    | protocol version=1  | header size (4B units)=1 |
//! | 1    | message type        | message-type flags    |
//! | 2    | serialization       | compression           |
//! | 3    | reserved=0          |                       |
//!
//! All multi-byte integers are big-endian. Outbound payloads are prefixed
//! with their u32 length; inbound responses carry a 4-byte sequence field
//! before the length, which we skip.

const PROTOCOL_VERSION: u8 = 0b0001;
const HEADER_SIZE_4B: u8 = 0b0001;

const TYPE_FULL_CLIENT_REQUEST: u8 = 0b0001;
const TYPE_AUDIO_ONLY: u8 = 0b0010;
const TYPE_FULL_SERVER_RESPONSE: u8 = 0b1001;
const TYPE_ERROR: u8 = 0b1111;

const FLAG_NO_SEQUENCE: u8 = 0b0000;
const FLAG_LAST_NO_SEQUENCE: u8 = 0b0010;

const SERIALIZATION_JSON: u8 = 0b0001;
const SERIALIZATION_NONE: u8 = 0b0000;
const COMPRESSION_NONE: u8 = 0b0000;

/// Flag pattern on a full-server-response marking it the final frame of the
/// session.
pub const FLAGS_TERMINAL_RESPONSE: u8 = 0b0011;

fn header(message_type: u8, flags: u8, serialization: u8) -> [u8; 4] {
    [
        (PROTOCOL_VERSION << 4) | HEADER_SIZE_4B,
        ((message_type & 0x0F) << 4) | (flags & 0x0F),
        ((serialization & 0x0F) << 4) | COMPRESSION_NONE,
        0x00,
    ]
}

/// The initial session request: JSON payload, no compression.
pub fn encode_full_client_request(body: &str) -> Vec<u8> {
    let payload = body.as_bytes();
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&header(
        TYPE_FULL_CLIENT_REQUEST,
        FLAG_NO_SEQUENCE,
        SERIALIZATION_JSON,
    ));
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// A raw PCM chunk. `last = true` marks the terminal audio frame; its
/// payload may be empty.
pub fn encode_audio_chunk(pcm: &[u8], last: bool) -> Vec<u8> {
    let flags = if last {
        FLAG_LAST_NO_SEQUENCE
    } else {
        FLAG_NO_SEQUENCE
    };
    let mut out = Vec::with_capacity(8 + pcm.len());
    out.extend_from_slice(&header(TYPE_AUDIO_ONLY, flags, SERIALIZATION_NONE));
    out.extend_from_slice(&(pcm.len() as u32).to_be_bytes());
    out.extend_from_slice(pcm);
    out
}

/// A decoded inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum ServerFrame {
    Response { flags: u8, payload: Vec<u8> },
    Error { code: u32, message: String },
    /// Anything else: wrong version, unrecognized type, truncated frame.
    /// Ignored by the session.
    Unknown,
}

pub fn decode_server_frame(data: &[u8]) -> ServerFrame {
    if data.len() < 4 {
        return ServerFrame::Unknown;
    }
    let version = data[0] >> 4;
    let header_units = data[0] & 0x0F;
    if version != PROTOCOL_VERSION || header_units != HEADER_SIZE_4B {
        return ServerFrame::Unknown;
    }
    let message_type = data[1] >> 4;
    let flags = data[1] & 0x0F;

    match message_type {
        TYPE_FULL_SERVER_RESPONSE => {
            // header(4) + sequence(4, skipped) + payload size(4)
            if data.len() < 12 {
                return ServerFrame::Unknown;
            }
            let size = u32::from_be_bytes([data[8], data[9], data[10], data[11]]) as usize;
            if data.len() < 12 + size {
                return ServerFrame::Unknown;
            }
            ServerFrame::Response {
                flags,
                payload: data[12..12 + size].to_vec(),
            }
        }
        TYPE_ERROR => {
            if data.len() < 12 {
                return ServerFrame::Unknown;
            }
            let code = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            let size = u32::from_be_bytes([data[8], data[9], data[10], data[11]]) as usize;
            if data.len() < 12 + size {
                return ServerFrame::Unknown;
            }
            let message = String::from_utf8_lossy(&data[12..12 + size]).into_owned();
            ServerFrame::Error { code, message }
        }
        _ => ServerFrame::Unknown,
    }
}
