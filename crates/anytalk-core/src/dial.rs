//! Opens one ready-to-use ASR connection: TCP (+TLS), then the WebSocket
//! upgrade carrying the credential headers.

use tracing::debug;

use anytalk_foundation::{AsrConfig, NetError};
use anytalk_net::{tls, WebSocket, WsConnection};
use anytalk_protocol::{connect_headers, request_path};

pub fn connect_asr(config: &AsrConfig) -> Result<WsConnection, NetError> {
    let path = request_path(config.mode);
    debug!(host = %config.endpoint.host, path, "dialing asr service");
    let stream = tls::connect(&config.endpoint)?;
    WebSocket::client(stream, &config.endpoint.host, path, &connect_headers(config))
}
