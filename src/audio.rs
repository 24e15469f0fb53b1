// Opens an input device and keeps its stream running.
// Every callback downmixes to mono and pushes into the shared SampleRing,
// which the analyser snapshots once per frame.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use tracing::{info, warn};

use crate::buffer::SampleRing;
use crate::error::Error;

/// A running input stream. Dropping it stops capture.
pub struct AudioCapture {
    _stream: cpal::Stream,
    label: String,
    sample_rate: u32,
}

impl AudioCapture {
    /// Open the first input whose name contains `filter` (case-insensitive),
    /// or the default input, and start streaming into `ring`.
    pub fn start(filter: Option<&str>, ring: Arc<Mutex<SampleRing>>) -> Result<Self, Error> {
        let device = pick_input_device(filter)?;
        let label = device.name().unwrap_or_else(|_| "input".into());

        let supported = device
            .default_input_config()
            .map_err(|e| Error::AudioInit(format!("Query config for '{label}': {e}")))?;
        let format = supported.sample_format();
        let cfg: StreamConfig = supported.config();

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &cfg, ring),
            SampleFormat::I16 => build_stream::<i16>(&device, &cfg, ring),
            SampleFormat::U16 => build_stream::<u16>(&device, &cfg, ring),
            SampleFormat::I32 => build_stream::<i32>(&device, &cfg, ring),
            other => Err(Error::AudioInit(format!("Unsupported sample format {other:?}"))),
        }?;

        stream
            .play()
            .map_err(|e| Error::AudioInit(format!("Start stream: {e}")))?;

        info!(device = %label, rate = cfg.sample_rate.0, channels = cfg.channels, "audio capture started");
        Ok(Self { _stream: stream, label, sample_rate: cfg.sample_rate.0 })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn pick_input_device(filter: Option<&str>) -> Result<Device, Error> {
    let host = cpal::default_host();

    if let Some(want) = filter {
        let want = want.to_lowercase();
        let devices = host
            .input_devices()
            .map_err(|e| Error::AudioInit(format!("List input devices: {e}")))?;
        for dev in devices {
            if let Ok(name) = dev.name() {
                if name.to_lowercase().contains(&want) {
                    return Ok(dev);
                }
            }
        }
        return Err(Error::AudioInit(format!("No input device matching '{want}'")));
    }

    host.default_input_device()
        .ok_or_else(|| Error::AudioInit("No default input device".into()))
}

fn build_stream<T>(device: &Device, cfg: &StreamConfig, ring: Arc<Mutex<SampleRing>>) -> Result<cpal::Stream, Error>
where
    T: Sample + SizedSample,
    f32: FromSample<T>,
{
    let channels = cfg.channels.max(1) as usize;
    let err_fn = |e: cpal::StreamError| warn!("audio stream error: {e}");

    device
        .build_input_stream(
            cfg,
            move |data: &[T], _| {
                // Skip this block rather than stall the audio thread.
                if let Ok(mut buf) = ring.try_lock() {
                    for frame in data.chunks_exact(channels) {
                        buf.push(downmix(frame));
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::AudioInit(format!("Build input stream: {e}")))
}

/// Average of all channels in one interleaved frame, as f32 in [-1,1].
#[inline]
pub fn downmix<T>(frame: &[T]) -> f32
where
    T: Sample,
    f32: FromSample<T>,
{
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
    sum / frame.len() as f32
}
