//! Server binary: reads PCM from stdin, paces it into `WireChunk`s, and
//! fans it out to every connected session over TCP. Orchestration only —
//! all of the domain logic lives in `snapsync-server`.

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;

use snapsync_app::{init_logging, Settings};
use snapsync_foundation::clock::real_clock;
use snapsync_foundation::{AppState, ShutdownHandler, StateManager};
use snapsync_server::{run_pacer, spawn_session, SessionSet};
use snapsync_telemetry::ServerMetrics;

#[derive(Parser, Debug)]
#[command(name = "snapsync-server", author, version, about = "snapsync audio server")]
struct Cli {
    /// Address to bind the audio listener to.
    #[arg(long, env = "SNAPSYNC_SERVER_HOST")]
    host: Option<String>,
    /// TCP port to bind the audio listener to.
    #[arg(long, env = "SNAPSYNC_SERVER_PORT")]
    port: Option<u16>,
    /// Per-session outbound queue depth, in chunks.
    #[arg(long)]
    session_queue_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging("snapsync-server.log")?;
    let cli = Cli::parse();

    let mut settings = Settings::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load settings, using defaults");
        Settings::default()
    });
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(cap) = cli.session_queue_capacity {
        settings.server.session_queue_capacity = cap;
    }

    let state_manager = StateManager::new();
    let shutdown = ShutdownHandler::new().install().await;
    state_manager.transition(AppState::Running)?;

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port))?;
    tracing::info!(addr = %listener.local_addr()?, "snapsync-server listening");

    let sessions = Arc::new(SessionSet::new());
    let metrics = ServerMetrics::new();
    let next_session_id = Arc::new(AtomicU64::new(1));
    let stop_flag = Arc::new(AtomicBool::new(false));

    {
        let sessions = sessions.clone();
        let metrics = metrics.clone();
        let queue_capacity = settings.server.session_queue_capacity;
        let next_session_id = next_session_id.clone();
        let stop_flag = stop_flag.clone();
        std::thread::Builder::new()
            .name("accept-loop".to_string())
            .spawn(move || {
                for incoming in listener.incoming() {
                    if stop_flag.load(Ordering::Relaxed) {
                        break;
                    }
                    match incoming {
                        Ok(stream) => {
                            let id = next_session_id.fetch_add(1, Ordering::Relaxed);
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::warn!(session_id = id, error = %e, "failed to set TCP_NODELAY");
                            }
                            let (handle, _writer) =
                                spawn_session(id, stream, queue_capacity, metrics.clone());
                            tracing::info!(session_id = id, "client connected");
                            sessions.insert(handle);
                        }
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
            })
            .expect("failed to spawn accept-loop thread");
    }

    {
        let stop_flag = stop_flag.clone();
        tokio::spawn(async move {
            shutdown.wait().await;
            tracing::info!("shutdown requested, stopping pacer");
            stop_flag.store(true, Ordering::SeqCst);
        });
    }

    let clock = real_clock();
    let pacer_stop_flag = stop_flag.clone();
    let pacer_result = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        run_pacer(stdin, sessions, metrics, clock, move || {
            pacer_stop_flag.load(Ordering::SeqCst)
        })
    })
    .await?;

    match pacer_result {
        Ok(()) => {
            tracing::info!("pacer stopped cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "pacer exited with an error");
            Err(e.into())
        }
    }
}
