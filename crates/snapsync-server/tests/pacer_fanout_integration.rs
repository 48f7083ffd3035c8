//! End-to-end integration of the pacer, fan-out, and session layer: a real
//! file stands in for the pipe/file/process PCM ingest `PcmSource` promises
//! (pcm_source.rs), paced into `WireChunk`s and broadcast to several real
//! session writer threads.

use std::io::{Seek, SeekFrom, Write};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use snapsync_foundation::clock::test_clock;
use snapsync_proto::constants::WIRE_CHUNK_BYTES;
use snapsync_server::{run_pacer, spawn_session, SessionSet};
use snapsync_telemetry::ServerMetrics;

#[test]
fn pacer_reads_a_file_backed_source_and_fans_out_to_every_session() {
    let payload_bytes = WIRE_CHUNK_BYTES - 8;
    let mut file = tempfile::tempfile().expect("create temp pcm file");
    for _ in 0..3 {
        file.write_all(&vec![0u8; payload_bytes]).unwrap();
    }
    file.seek(SeekFrom::Start(0)).unwrap();

    let sessions = Arc::new(SessionSet::new());
    let metrics = ServerMetrics::new();
    let (h1, _j1) = spawn_session(1, Vec::<u8>::new(), 16, metrics.clone());
    let (h2, _j2) = spawn_session(2, Vec::<u8>::new(), 16, metrics.clone());
    sessions.insert(h1);
    sessions.insert(h2);

    let clock = test_clock();
    let result = run_pacer(file, sessions.clone(), metrics.clone(), clock, || false);

    assert!(result.is_err(), "pacer exits once the backing file is exhausted");
    assert_eq!(metrics.chunks_produced.load(Ordering::Relaxed), 3);
    assert_eq!(sessions.len(), 2, "both sessions stay registered through the run");
}
