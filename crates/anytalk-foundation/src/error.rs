use thiserror::Error;

/// Transport-level errors, coarse by design: the session loop only ever
/// branches on "would block", "closed", and "everything else".
#[derive(Debug, Error)]
pub enum NetError {
    #[error("dns lookup failed for {host}: {source}")]
    Dns {
        host: String,
        source: std::io::Error,
    },

    #[error("tcp connect failed: {0}")]
    Tcp(std::io::Error),

    #[error("tls handshake failed: {0}")]
    TlsHandshake(String),

    #[error("tls read failed: {0}")]
    TlsRead(std::io::Error),

    #[error("tls write failed: {0}")]
    TlsWrite(std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("read would block")]
    WouldBlock,

    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    #[error("websocket frame error: {0}")]
    Frame(String),
}

impl NetError {
    /// True when a read merely hit its timeout. The session loop treats this
    /// as "check the cancel flag and poll again", never as a failure.
    pub fn is_would_block(&self) -> bool {
        matches!(self, NetError::WouldBlock)
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no input device available")]
    DeviceNotFound,

    #[error("default input config error: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("capture thread failed: {0}")]
    Fatal(String),
}

/// Top-level errors surfaced by the context control operations.
#[derive(Debug, Error)]
pub enum AsrError {
    #[error("connection failed: {0}")]
    Dial(#[from] NetError),

    #[error("audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}
