//! The server core (C3/C4): turns a PCM byte source into a steady stream of
//! `WireChunk`s and fans them out to any number of connected sessions.
//!
//! This crate has no opinion on where the PCM comes from or how sessions are
//! accepted — `snapsync-app` wires a `TcpListener` accept loop and a PCM
//! source (stdin, a file, a child process) to the pieces here.

pub mod fanout;
pub mod pacer;
pub mod pcm_source;
pub mod session;

pub use fanout::SessionSet;
pub use pacer::run_pacer;
pub use pcm_source::PcmSource;
pub use session::{spawn_session, SessionHandle, SessionState};
