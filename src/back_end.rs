// cpal glue for the demo binary: output config lookup and frame writing.

use cpal::traits::DeviceTrait;
use cpal::{
    Device, FromSample, Sample, SampleFormat, SampleRate, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use simplelog::info;

/// An enumeration for specifying an amount of channels and easily
/// differentiate the most common cases (mono and stereo).
#[derive(Debug)]
#[allow(dead_code)]
pub enum Channels {
    /// A single channel
    Mono,
    /// Two channels
    Stereo,
    /// Any given amount of channels
    Multi(u8),
}

impl Channels {
    pub fn get_amt(&self) -> u8 {
        match *self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Multi(x) => x,
        }
    }
}

/// Looks up a supported output config matching the requested sample format,
/// sample rate and channel count.
///
/// # Arguments
/// * `device` - the `Device` to query.
/// * `sample_format` - (optional) preferred format for each sample.
/// * `sample_rate` - (optional) preferred rate. Defaults to the device
///   maximum if not set (not recommended).
/// * `channel_amt` - (optional) maximum amount of channels to use.
///
/// # Return
/// The first `SupportedStreamConfig` fulfilling every requirement. Panics
/// when nothing matches; the demo cannot do anything useful without output.
pub fn get_preferred_config(
    device: &Device,
    sample_format: Option<SampleFormat>,
    sample_rate: Option<SampleRate>,
    channel_amt: Option<Channels>,
) -> SupportedStreamConfig {
    let mut matches: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .expect("error while querying configs")
        .filter(|config| match &sample_format {
            None => true,
            Some(format) => config.sample_format() == *format,
        })
        .filter(|config| match &channel_amt {
            None => true,
            Some(amt) => amt.get_amt() >= config.channels() as u8,
        })
        .collect();

    let range = matches
        .pop()
        .expect("No possible configuration could be found. Try widening the search.");

    let config = match sample_rate {
        None => range.with_max_sample_rate(),
        Some(rate) => range.with_sample_rate(rate),
    };

    info!(
        "<b>Output config for <cyan>{}</>",
        device.name().expect("Couldn't read device name")
    );
    info!("  |_ channels: {}", config.channels());
    info!("  |_ sample rate: {}", config.sample_rate().0);
    info!("  |_ sample format: {:?}", config.sample_format());

    config
}

// from cpal examples beep.rs
pub fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: Sample + FromSample<f32>,
{
    for frame in output.chunks_mut(channels) {
        let value: T = T::from_sample(next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}
