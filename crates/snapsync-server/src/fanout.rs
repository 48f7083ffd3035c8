//! Fan-out: the set of currently connected sessions, guarded by a
//! reader/writer lock (spec §4.3: "a set of `Session` handles is maintained
//! behind a reader/writer lock. Accept loop inserts; session termination
//! removes. Broadcast iterates the snapshot and calls `offer`").

use crate::session::SessionHandle;
use parking_lot::RwLock;
use snapsync_proto::WireChunk;
use std::sync::Arc;

#[derive(Default)]
pub struct SessionSet {
    sessions: RwLock<Vec<SessionHandle>>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.write().push(handle);
    }

    /// Broadcasts a chunk to every session; `offer` never blocks, so this
    /// never blocks the pacer (spec §4.3/§4.4).
    pub fn broadcast(&self, chunk: &Arc<WireChunk>) {
        let sessions = self.sessions.read();
        for session in sessions.iter() {
            session.offer(chunk.clone());
        }
    }

    /// Removes sessions whose writer thread has terminated. Called
    /// periodically by a supervisor, not by the pacer itself.
    pub fn sweep_closed(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| !s.is_closed());
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
