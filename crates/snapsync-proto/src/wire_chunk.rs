use crate::constants::{WIRE_CHUNK_BYTES, WIRE_CHUNK_SAMPLES};
use snapsync_foundation::error::ProtoError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Fixed-size, timestamped block of interleaved stereo PCM — the unit of
/// transport and timing (spec §3). Every `WireChunk` is exactly
/// `WIRE_CHUNK_BYTES` on the wire; there is no length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireChunk {
    pub tv_sec: i32,
    pub tv_usec: i32,
    pub payload: Vec<i16>,
}

impl WireChunk {
    /// Build a chunk stamped at `timestamp`, consuming exactly
    /// `WIRE_CHUNK_SAMPLES` interleaved i16 samples.
    pub fn new(timestamp: SystemTime, payload: Vec<i16>) -> Self {
        debug_assert_eq!(payload.len(), WIRE_CHUNK_SAMPLES);
        let since_epoch = timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self {
            tv_sec: since_epoch.as_secs() as i32,
            tv_usec: since_epoch.subsec_micros() as i32,
            payload,
        }
    }

    /// The wall-clock instant at which this chunk's first sample was captured.
    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH
            + Duration::from_secs(self.tv_sec.max(0) as u64)
            + Duration::from_micros(self.tv_usec.max(0) as u64)
    }

    /// Encode to the fixed-size wire representation:
    /// `tv_sec` (4 B LE) ∥ `tv_usec` (4 B LE) ∥ `payload` (2·N B LE).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WIRE_CHUNK_BYTES);
        out.extend_from_slice(&self.tv_sec.to_le_bytes());
        out.extend_from_slice(&self.tv_usec.to_le_bytes());
        for sample in &self.payload {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    /// Decode a single fixed-size record. Fails with `MalformedFrame` if
    /// `bytes.len() != WIRE_CHUNK_BYTES`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        if bytes.len() != WIRE_CHUNK_BYTES {
            return Err(ProtoError::MalformedFrame {
                expected: WIRE_CHUNK_BYTES,
                actual: bytes.len(),
            });
        }

        let tv_sec = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let tv_usec = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let mut payload = Vec::with_capacity(WIRE_CHUNK_SAMPLES);
        for chunk in bytes[8..].chunks_exact(2) {
            payload.push(i16::from_le_bytes([chunk[0], chunk[1]]));
        }

        Ok(Self {
            tv_sec,
            tv_usec,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_has_fixed_size() {
        let chunk = WireChunk::new(SystemTime::now(), vec![0i16; WIRE_CHUNK_SAMPLES]);
        assert_eq!(chunk.encode().len(), WIRE_CHUNK_BYTES);
    }

    #[test]
    fn decode_rejects_short_frame() {
        let err = WireChunk::decode(&[0u8; 4]).unwrap_err();
        assert_eq!(
            err,
            ProtoError::MalformedFrame {
                expected: WIRE_CHUNK_BYTES,
                actual: 4
            }
        );
    }

    #[test]
    fn decode_rejects_over_long_frame() {
        let bytes = vec![0u8; WIRE_CHUNK_BYTES + 2];
        assert!(WireChunk::decode(&bytes).is_err());
    }

    proptest! {
        #[test]
        fn decode_encode_roundtrip(
            tv_sec in any::<i32>(),
            tv_usec in any::<i32>(),
            payload in prop::collection::vec(any::<i16>(), WIRE_CHUNK_SAMPLES..=WIRE_CHUNK_SAMPLES),
        ) {
            let chunk = WireChunk { tv_sec, tv_usec, payload };
            let bytes = chunk.encode();
            let decoded = WireChunk::decode(&bytes).unwrap();
            prop_assert_eq!(chunk, decoded);
        }
    }
}
