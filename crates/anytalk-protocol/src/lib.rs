//! The vendor layer carried inside WebSocket binary messages: binary frame
//! codec, initial request JSON, connect headers, and the interpreter that
//! turns response payloads into ordered partial/final text events.

pub mod interpret;
pub mod request;
pub mod wire;

pub use interpret::{Interpreter, Transcripts};
pub use request::{connect_headers, initial_request_body, request_path};
pub use wire::{
    encode_audio_chunk, encode_full_client_request, decode_server_frame, ServerFrame,
    FLAGS_TERMINAL_RESPONSE,
};
