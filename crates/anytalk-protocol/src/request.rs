//! Session-open plumbing: endpoint path, connect headers, initial JSON body.

use anytalk_foundation::{AsrConfig, Mode};

/// Endpoint path for the given recognition mode.
pub fn request_path(mode: Mode) -> &'static str {
    match mode {
        Mode::Bidi => "/api/v3/sauc/bigmodel",
        Mode::BidiAsync => "/api/v3/sauc/bigmodel_async",
        Mode::Nostream => "/api/v3/sauc/bigmodel_nostream",
    }
}

/// Credential and trace headers sent with the upgrade request. The connect
/// id is a fresh UUID v4 per connection.
pub fn connect_headers(config: &AsrConfig) -> Vec<(String, String)> {
    vec![
        ("X-Api-App-Key".to_string(), config.app_id.clone()),
        ("X-Api-Access-Key".to_string(), config.access_token.clone()),
        ("X-Api-Resource-Id".to_string(), config.resource_id.clone()),
        (
            "X-Api-Connect-Id".to_string(),
            uuid::Uuid::new_v4().to_string(),
        ),
    ]
}

/// Body of the initial full-client-request. Compact JSON, no compression.
pub fn initial_request_body(mode: Mode) -> String {
    let mut body = serde_json::json!({
        "user": {"uid": "anytalk"},
        "audio": {
            "format": "pcm",
            "rate": 16000,
            "bits": 16,
            "channel": 1
        },
        "request": {
            "model_name": "bigmodel",
            "enable_itn": true,
            "enable_punc": true,
            "enable_ddc": false,
            "enable_word": false,
            "res_type": "full",
            "nbest": 1,
            "use_vad": true
        }
    });
    if mode == Mode::Nostream {
        body["audio"]["language"] = serde_json::Value::String("zh-CN".to_string());
    }
    body.to_string()
}
