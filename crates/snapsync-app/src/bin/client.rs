//! Client binary: opens an output device, connects to the server, and runs
//! the network reader / sync engine / output stream triad until shutdown.
//! Orchestration only — all of the domain logic lives in `snapsync-client`.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cpal::traits::DeviceTrait;

use snapsync_app::{exit_code, init_logging, Settings};
use snapsync_client::{
    build_output_stream, reconnect_with_backoff, run_reader, BufferTarget, DeviceManager,
    SyncEngine,
};
use snapsync_foundation::clock::{real_clock, Clock, SharedClock};
use snapsync_foundation::{AppState, ShutdownHandler, StateManager};
use snapsync_proto::constants::{CHANNELS, PLAYER_CHUNK_SAMPLES, SAMPLE_RATE};
use snapsync_proto::PlaybackChunk;
use snapsync_queue::ChunkQueue;
use snapsync_telemetry::ClientMetrics;

#[derive(Parser, Debug)]
#[command(name = "snapsync-client", author, version, about = "snapsync audio client")]
struct Cli {
    /// Server host to connect to.
    #[arg(long, env = "SNAPSYNC_CLIENT_HOST")]
    host: Option<String>,
    /// Server audio port.
    #[arg(long, env = "SNAPSYNC_CLIENT_PORT")]
    port: Option<u16>,
    /// Target end-to-end playback latency, in milliseconds.
    #[arg(long = "buffer-ms")]
    buffer_ms: Option<i32>,
    /// Extra fixed latency reported by the output device/host, in milliseconds.
    #[arg(long)]
    latency: Option<i32>,
    /// Output device name; omit to use the system default.
    #[arg(long)]
    device: Option<String>,
}

/// Depth of the per-connection inbound chunk queue, in wire chunks.
const INBOUND_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() {
    let _log_guard = match init_logging("snapsync-client.log") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            std::process::exit(exit_code::BAD_ARGS);
        }
    };

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(exit_code::BAD_ARGS);
        }
    };

    let mut settings = Settings::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load settings, using defaults");
        Settings::default()
    });
    if let Some(host) = cli.host {
        settings.client.host = host;
    }
    if let Some(port) = cli.port {
        settings.client.port = port;
    }
    if let Some(ms) = cli.buffer_ms {
        settings.client.buffer_ms = ms;
    }
    if let Some(ms) = cli.latency {
        settings.client.latency_ms = ms;
    }
    if cli.device.is_some() {
        settings.client.device = cli.device;
    }

    // Probed once up front so a bad `--device` name fails fast with the
    // right exit code; the supervisor thread below re-opens the device by
    // name itself rather than taking this one across a thread boundary —
    // `cpal::Device`/`Stream` are meant to be built and used on the thread
    // that owns the stream (mirrors `coldvox-audio::capture::AudioCapture`,
    // which re-resolves its device from a name inside its capture thread).
    let device_manager = DeviceManager::new();
    let probe_device = match device_manager.open_device(settings.client.device.as_deref()) {
        Ok(device) => device,
        Err(e) => {
            tracing::error!(error = %e, "failed to open audio output device");
            std::process::exit(exit_code::AUDIO_DEVICE_FAILED);
        }
    };
    let device_name = probe_device.name().unwrap_or_else(|_| "<unknown>".to_string());
    tracing::info!(device = %device_name, "opened audio output device");

    let sample_format = match probe_device.default_output_config() {
        Ok(config) => config.sample_format(),
        Err(e) => {
            tracing::error!(error = %e, "failed to query default output config");
            std::process::exit(exit_code::AUDIO_DEVICE_FAILED);
        }
    };
    drop(probe_device);
    let stream_config = cpal::StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let clock = real_clock();
    let metrics = ClientMetrics::new();

    let initial_stream = match connect_with_budget(
        &settings.client.host,
        settings.client.port,
        settings.client.initial_connect_attempts,
        &clock,
        &metrics,
    ) {
        Some(stream) => stream,
        None => {
            tracing::error!(
                host = %settings.client.host,
                port = settings.client.port,
                attempts = settings.client.initial_connect_attempts,
                "exhausted initial connection retry budget"
            );
            std::process::exit(exit_code::CONNECTION_FAILED);
        }
    };

    let state_manager = StateManager::new();
    let shutdown = ShutdownHandler::new().install().await;
    state_manager
        .transition(AppState::Running)
        .expect("Initializing -> Running is always valid");

    let buffer_target = BufferTarget::new(settings.client.buffer_ms + settings.client.latency_ms);

    let host = settings.client.host.clone();
    let port = settings.client.port;
    let supervisor_metrics = metrics.clone();
    let supervisor_clock = clock.clone();
    let device_name = settings.client.device.clone();
    std::thread::Builder::new()
        .name("client-supervisor".to_string())
        .spawn(move || {
            run_supervisor(
                initial_stream,
                device_name,
                stream_config,
                sample_format,
                buffer_target,
                supervisor_metrics,
                supervisor_clock,
                host,
                port,
            );
        })
        .expect("failed to spawn client supervisor thread");

    shutdown.wait().await;
    tracing::info!("shutdown requested, exiting");
    // The supervisor thread owns the live socket and the cpal output
    // stream; it is left to exit with the process (it has no clean
    // cancellation path into a blocking `read_exact`), mirroring the
    // server binary's accept-loop thread.
}

/// Bounded-retry connect used only for the binary's startup (spec §6 exit
/// code 2, "connection failed after retry budget"). Once a session is
/// established, `run_supervisor` falls back to
/// `snapsync_client::reconnect_with_backoff`'s unbounded policy (spec §7
/// `ConnectionLost`) — the two are deliberately different retry policies,
/// see DESIGN.md.
fn connect_with_budget(
    host: &str,
    port: u16,
    attempts: u32,
    clock: &SharedClock,
    metrics: &ClientMetrics,
) -> Option<TcpStream> {
    const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
    const MAX_BACKOFF: Duration = Duration::from_secs(5);

    let mut backoff = INITIAL_BACKOFF;
    for attempt in 0..attempts.max(1) {
        match TcpStream::connect((host, port)) {
            Ok(stream) => return Some(stream),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "initial connection attempt failed");
                metrics.record_reconnect();
                if attempt + 1 < attempts {
                    clock.sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
    None
}

/// Owns the connection/engine/stream lifecycle: re-resolves the output
/// device and builds a fresh inbound queue and `SyncEngine` per connection,
/// runs the blocking network reader on this thread, and reconnects
/// (unbounded backoff) whenever the reader exits. The device is opened by
/// name on this thread rather than handed in as a `cpal::Device`, matching
/// `coldvox-audio::capture::AudioCapture`'s thread-local device resolution.
#[allow(clippy::too_many_arguments)]
fn run_supervisor(
    mut socket: TcpStream,
    device_name: Option<String>,
    stream_config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    buffer_target: BufferTarget,
    metrics: ClientMetrics,
    clock: SharedClock,
    host: String,
    port: u16,
) {
    let device_manager = DeviceManager::new();

    loop {
        let device = match device_manager.open_device(device_name.as_deref()) {
            Ok(device) => device,
            Err(e) => {
                tracing::error!(error = %e, "failed to (re)open audio output device, giving up");
                return;
            }
        };

        let queue: Arc<ChunkQueue<PlaybackChunk>> = Arc::new(ChunkQueue::new(INBOUND_QUEUE_CAPACITY));
        let engine = SyncEngine::new(
            queue.clone(),
            buffer_target.clone(),
            metrics.clone(),
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
        );

        let output_stream =
            match build_output_stream(&device, &stream_config, sample_format, engine) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build output stream, giving up");
                    return;
                }
            };

        let err = run_reader(&mut socket, queue, metrics.clone());
        tracing::warn!(error = %err, "network reader exited, reconnecting");
        drop(output_stream);

        let connect = || TcpStream::connect((host.as_str(), port));
        socket = reconnect_with_backoff(connect, &clock, &metrics);
        tracing::info!("reconnected to server");
    }
}
