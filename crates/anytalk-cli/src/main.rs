//! Manual end-to-end driver: microphone to transcript on stdout.
//!
//! Credentials come from the environment:
//!   ANYTALK_APP_ID, ANYTALK_ACCESS_TOKEN (required)
//!   ANYTALK_RESOURCE_ID, ANYTALK_MODE    (optional)
//!
//! Then `start`, `stop`, `cancel`, `quit` on stdin.

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use anytalk_core::Context;
use anytalk_foundation::{AsrConfig, AsrEvent, EventSink};

fn config_from_env() -> Result<AsrConfig, String> {
    let app_id = env::var("ANYTALK_APP_ID")
        .map(|s| s.trim().to_string())
        .map_err(|_| "missing ANYTALK_APP_ID".to_string())?;
    let access_token = env::var("ANYTALK_ACCESS_TOKEN")
        .map(|s| s.trim().to_string())
        .map_err(|_| "missing ANYTALK_ACCESS_TOKEN".to_string())?;

    let mut config = AsrConfig::new(app_id, access_token);
    if let Ok(resource_id) = env::var("ANYTALK_RESOURCE_ID") {
        let resource_id = resource_id.trim();
        if !resource_id.is_empty() {
            config = config.with_resource_id(resource_id);
        }
    }
    if let Ok(mode) = env::var("ANYTALK_MODE") {
        let mode = mode.trim().parse().map_err(|e| format!("ANYTALK_MODE: {e}"))?;
        config = config.with_mode(mode);
    }
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let config = match config_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(2);
        }
    };

    let events: EventSink = Arc::new(|event| {
        match event {
            AsrEvent::Partial(text) => println!("partial: {text}"),
            AsrEvent::Final(text) => println!("final:   {text}"),
            AsrEvent::Status(status) => println!("status:  {}", status.as_str()),
            AsrEvent::Error(message) => println!("error:   {message}"),
        }
        let _ = io::stdout().flush();
    });

    let ctx = Context::new(config, events);
    println!("commands: start | stop | cancel | quit");

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "start" => {
                if ctx.start_session().is_err() {
                    eprintln!("start failed");
                }
            }
            "stop" => ctx.stop_session(),
            "cancel" => ctx.cancel(),
            "quit" | "exit" => break,
            "" => {}
            other => eprintln!("unknown command: {other}"),
        }
    }

    ctx.shutdown();
}
