//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use logscript::config::{ConfigLoader, LoadedConfig};
use logscript::host::{HostSignal, LogMessage, PipelineHost};
use logscript::options::{ProjectionPolicy, Projector, UnknownKeys};
use logscript::registry;
use std::time::{Duration, Instant};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Loader over the built-in drivers with a short stop timeout
pub fn loader() -> ConfigLoader {
    ConfigLoader::new(registry::global()).with_stop_timeout(Duration::from_millis(500))
}

pub fn strict_loader() -> ConfigLoader {
    loader().with_projector(Projector::new(ProjectionPolicy::FailFast, UnknownKeys::Warn))
}

/// Load a configuration script, panicking with the error on failure
pub fn load(script: &str) -> LoadedConfig {
    match loader().load_str(script) {
        Ok(loaded) => loaded,
        Err(e) => panic!("configuration failed to load: {}", e),
    }
}

/// Register and initialize every node of `script`
pub fn start_host(script: &str) -> PipelineHost {
    let loaded = load(script);
    let mut host = PipelineHost::default();
    host.register_all(loaded.nodes);
    host.init_all().expect("init_all");
    host
}

/// Drive the main loop until `count` sources have stopped or the timeout expires
pub fn wait_for_stops(host: &PipelineHost, count: usize) -> Vec<HostSignal> {
    let deadline = Instant::now() + test_timeout();
    let mut stopped = 0;
    host.main_loop().run_until(deadline, |signal| {
        if matches!(signal, HostSignal::SourceStopped { .. }) {
            stopped += 1;
        }
        stopped >= count
    })
}

/// Wait until the host has delivered `count` messages
pub fn collect_messages(host: &PipelineHost, count: usize) -> Vec<LogMessage> {
    let deadline = Instant::now() + test_timeout();
    let mut messages = Vec::new();
    while messages.len() < count {
        host.main_loop().run_pending();
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            break;
        };
        match host.messages().recv_timeout(remaining.min(Duration::from_millis(50))) {
            Ok(message) => messages.push(message),
            Err(_) => continue,
        }
    }
    messages
}

pub fn payloads(messages: &[LogMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.payload.as_str()).collect()
}
