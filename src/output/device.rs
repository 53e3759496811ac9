use super::{drain::Drain, AudioSink, EndNotifier, OutputError, Playback};
use crate::audio::SampleBuffer;
use basedrop::{Collector, Handle, Shared};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};
use log::{debug, error, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, Mutex, PoisonError,
};

/// Plays buffers on a cpal output device.
///
/// Each playback gets its own stream, owned by a dedicated thread since streams cannot be
/// moved between threads on every platform. Buffers handed to the real-time callback are
/// reclaimed through a `basedrop` collector instead of being freed on the audio thread.
pub struct CpalSink {
    device_name: Option<String>,
    collector: Mutex<Collector>,
    handle: Handle,
}

impl CpalSink {
    /// Creates a sink for the named output device, or the host's default device.
    pub fn new(device_name: Option<String>) -> Self {
        let collector = Collector::new();
        let handle = collector.handle();
        Self {
            device_name,
            collector: Mutex::new(collector),
            handle,
        }
    }

    /// Frees buffers released by finished or cancelled streams.
    fn collect(&self) {
        self.collector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .collect();
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.collect();
    }
}

impl AudioSink for CpalSink {
    fn play(&self, buffer: SampleBuffer, on_end: EndNotifier) -> Result<Box<dyn Playback>, OutputError> {
        self.collect();

        let buffer = Shared::new(&self.handle, buffer);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (control_tx, control_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let device_name = self.device_name.clone();
        let stream_cancelled = cancelled.clone();
        let end_tx = control_tx.clone();

        std::thread::Builder::new()
            .name("phrase-output".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), buffer, stream_cancelled.clone(), end_tx) {
                    Ok(stream) => {
                        ready_tx.send(Ok(())).ok();
                        stream
                    }
                    Err(err) => {
                        ready_tx.send(Err(err)).ok();
                        return;
                    }
                };

                let control = control_rx.recv();
                drop(stream);
                debug!("Output stream closed");

                if let Ok(Control::Finished) = control {
                    if !stream_cancelled.load(Ordering::Acquire) {
                        on_end.notify();
                    }
                }
            })?;

        ready_rx.recv().map_err(|_| OutputError::Disconnected)??;

        Ok(Box::new(CpalPlayback {
            cancelled,
            control: control_tx,
        }))
    }
}

enum Control {
    /// The device has played the last sample.
    Finished,
    /// The playback was cancelled.
    Stop,
}

struct CpalPlayback {
    cancelled: Arc<AtomicBool>,
    control: mpsc::Sender<Control>,
}

impl Playback for CpalPlayback {
    fn stop(&mut self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.control.send(Control::Stop).ok();
        }
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Gets the names of the host's output devices.
pub fn output_device_names() -> Result<Vec<String>, OutputError> {
    let host = cpal::default_host();
    Ok(host.output_devices()?.filter_map(|device| device.name().ok()).collect())
}

fn find_device(name: Option<&str>) -> Result<Device, OutputError> {
    let host = cpal::default_host();
    match name {
        None => host.default_output_device().ok_or(OutputError::NoDevice),
        Some(name) => host
            .output_devices()?
            .find(|device| device.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| OutputError::DeviceNotFound(name.to_string())),
    }
}

/// Picks a configuration that plays at exactly `sample_rate`, preferring fewer channels.
fn find_config(device: &Device, sample_rate: u32) -> Result<SupportedStreamConfig, OutputError> {
    let rate = SampleRate(sample_rate);
    device
        .supported_output_configs()?
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .filter_map(|range| format_rank(range.sample_format()).map(|rank| (range, rank)))
        .min_by_key(|(range, rank)| (range.channels(), *rank))
        .map(|(range, _)| range.with_sample_rate(rate))
        .ok_or(OutputError::UnsupportedSampleRate(sample_rate))
}

/// The order in which sample formats are preferred, or `None` if unsupported.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

fn open_stream(
    device_name: Option<&str>,
    buffer: Shared<SampleBuffer>,
    cancelled: Arc<AtomicBool>,
    end_tx: mpsc::Sender<Control>,
) -> Result<Stream, OutputError> {
    let device = find_device(device_name)?;
    let supported = find_config(&device, buffer.sample_rate())?;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();

    info!(
        "Playing {} samples on {} ({} Hz, {} channels, {:?})",
        buffer.len(),
        device.name().unwrap_or_else(|_| "unknown device".into()),
        config.sample_rate.0,
        config.channels,
        format
    );

    let stream = match format {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, buffer, cancelled, end_tx),
        SampleFormat::F32 => build_stream::<f32>(&device, &config, buffer, cancelled, end_tx),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, buffer, cancelled, end_tx),
        other => return Err(OutputError::UnsupportedFormat(other)),
    }?;
    stream.play()?;

    Ok(stream)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer: Shared<SampleBuffer>,
    cancelled: Arc<AtomicBool>,
    end_tx: mpsc::Sender<Control>,
) -> Result<Stream, OutputError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels.max(1) as usize;
    let mut position = 0;
    let mut origin = None;
    let mut drain = Drain::new(config.sample_rate.0);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
            if cancelled.load(Ordering::Acquire) {
                data.fill(T::EQUILIBRIUM);
                return;
            }

            let timestamp = info.timestamp();
            let origin = *origin.get_or_insert(timestamp.callback);
            let now = timestamp.callback.duration_since(&origin).unwrap_or_default();
            let playback = timestamp.playback.duration_since(&origin).unwrap_or(now);

            // Mono source, so every channel of a frame gets the same sample
            let samples = buffer.samples();
            let mut last_frame = 0;
            for (i, frame) in data.chunks_mut(channels).enumerate() {
                let sample = match samples.get(position) {
                    Some(&s) => {
                        position += 1;
                        last_frame = i;
                        T::from_sample(s)
                    }
                    None => T::EQUILIBRIUM,
                };
                frame.fill(sample);
            }

            if position >= samples.len() {
                drain.last_sample_in(playback, last_frame);
            }
            if drain.poll(now, data.len() / channels) {
                end_tx.send(Control::Finished).ok();
            }
        },
        |err| error!("Output stream error: {}", err),
        None,
    )?;

    Ok(stream)
}
