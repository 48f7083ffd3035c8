//! Builds the cpal output stream around a `SyncEngine`. Grounded in
//! `coldvox-audio::capture::AudioCapture::build_stream`'s per-`SampleFormat`
//! dispatch, inverted for playback (`build_output_stream` instead of
//! `build_input_stream`) and trading `handle_i16`'s accumulate-into-ring-buffer
//! role for `SyncEngine::fill`'s accumulate-into-output-buffer role.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::time::Duration;

use snapsync_foundation::error::ClientError;
use snapsync_proto::constants::CHANNELS;

use crate::sync_engine::SyncEngine;

/// Builds and starts (`.play()`) the output stream. `engine` is moved into
/// the callback closure; it is never touched from any other thread (spec §5
/// "StreamState is single-writer").
pub fn build_output_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut engine: SyncEngine,
) -> Result<Stream, ClientError> {
    let err_fn = |err: cpal::StreamError| {
        tracing::error!(error = %err, "audio output stream error");
    };

    let stream = match sample_format {
        SampleFormat::I16 => device
            .build_output_stream(
                config,
                move |data: &mut [i16], info: &cpal::OutputCallbackInfo| {
                    engine.fill(data, dac_lead_time(info));
                },
                err_fn,
                None,
            )
            .map_err(|e| ClientError::AudioDevice(e.to_string()))?,
        SampleFormat::F32 => {
            let channels = CHANNELS as usize;
            let mut scratch = vec![0i16; 0];
            device
                .build_output_stream(
                    config,
                    move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                        // Only reallocates if cpal hands us a different
                        // buffer length than last time, which in steady
                        // state it never does.
                        if scratch.len() != data.len() {
                            scratch.resize(data.len(), 0);
                        }
                        engine.fill(&mut scratch, dac_lead_time(info));
                        for (out, &s) in data.iter_mut().zip(scratch.iter()) {
                            *out = s as f32 / 32768.0;
                        }
                        debug_assert_eq!(data.len() % channels, 0);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| ClientError::AudioDevice(e.to_string()))?
        }
        other => {
            return Err(ClientError::AudioDevice(format!(
                "unsupported output sample format: {other:?}"
            )))
        }
    };

    stream
        .play()
        .map_err(|e| ClientError::AudioDevice(e.to_string()))?;
    Ok(stream)
}

/// The real DAC lead time for this callback (spec §4.5.2's `dac_time`):
/// how much later the first sample written now will actually reach the
/// speaker, taken from cpal's host-provided timestamps. Falls back to zero
/// on backends that don't report one; the sync engine still converges via
/// the normal age/correction path in that case, just from a biased start.
fn dac_lead_time(info: &cpal::OutputCallbackInfo) -> Duration {
    let timestamp = info.timestamp();
    timestamp
        .playback
        .duration_since(&timestamp.callback)
        .unwrap_or(Duration::ZERO)
}
