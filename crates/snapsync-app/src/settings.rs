//! Layered configuration: built-in defaults, an optional `snapsync.toml`,
//! `SNAPSYNC_*` environment variables (double-underscore nesting), then CLI
//! flags, in that precedence order — mirrors `coldvox-app::main`'s layering
//! of its own `Settings` over `config-rs`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use snapsync_proto::constants::{DEFAULT_AUDIO_PORT, DEFAULT_BUFFER_TARGET_MS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Per-session outbound queue depth, in chunks (spec §4.4).
    pub session_queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_AUDIO_PORT,
            session_queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub host: String,
    pub port: u16,
    pub buffer_ms: i32,
    /// Extra fixed output latency reported by the host, added on top of
    /// `buffer_ms` (spec §6 `--latency`).
    pub latency_ms: i32,
    pub device: Option<String>,
    /// Bounded retry budget for the *initial* connection attempt only; once
    /// a session is established, `snapsync-client::reconnect_with_backoff`'s
    /// unbounded retry policy (spec §7 `ConnectionLost`) takes over. This
    /// split is a binary-level decision, not a core-engine one: see
    /// DESIGN.md.
    pub initial_connect_attempts: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_AUDIO_PORT,
            buffer_ms: DEFAULT_BUFFER_TARGET_MS,
            latency_ms: 0,
            device: None,
            initial_connect_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub client: ClientSettings,
}

impl Settings {
    /// Loads defaults, then `snapsync.toml` (if present in the working
    /// directory), then `SNAPSYNC_*` environment variables. CLI overrides are
    /// applied afterwards by the caller (`server.rs`/`client.rs`), since
    /// `clap::Parser` owns argument parsing and `Settings` has no knowledge
    /// of `Cli`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let server = ServerSettings::default();
        let client = ClientSettings::default();

        let cfg = Config::builder()
            .set_default("server.host", server.host)?
            .set_default("server.port", server.port as i64)?
            .set_default(
                "server.session_queue_capacity",
                server.session_queue_capacity as i64,
            )?
            .set_default("client.host", client.host)?
            .set_default("client.port", client.port as i64)?
            .set_default("client.buffer_ms", client.buffer_ms as i64)?
            .set_default("client.latency_ms", client.latency_ms as i64)?
            .set_default(
                "client.initial_connect_attempts",
                client.initial_connect_attempts as i64,
            )?
            .add_source(File::with_name("snapsync").required(false))
            .add_source(Environment::with_prefix("SNAPSYNC").separator("__"))
            .build()?;

        cfg.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_without_any_source_match_constants() {
        let settings = Settings::load().expect("defaults alone must build");
        assert_eq!(settings.server.port, DEFAULT_AUDIO_PORT);
        assert_eq!(settings.client.buffer_ms, DEFAULT_BUFFER_TARGET_MS);
    }

    #[test]
    #[serial]
    fn environment_override_wins_over_defaults() {
        std::env::set_var("SNAPSYNC_CLIENT__BUFFER_MS", "600");
        let settings = Settings::load().expect("env override must build");
        std::env::remove_var("SNAPSYNC_CLIENT__BUFFER_MS");
        assert_eq!(settings.client.buffer_ms, 600);
    }
}
