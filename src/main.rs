mod back_end;
mod osc;
mod preset;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, StreamConfig};
use std::thread;
use std::thread::sleep;
use std::time::Duration;

// DEBUGGING, LOGGING
use simplelog::__private::paris::Logger;
use simplelog::*;

// MY STUFF
use back_end::{get_preferred_config, write_data, Channels};
use osc::{OscillatorBuilder, OscillatorCore};
use preset::{load_preset, OscillatorPreset};

const SAMPLE_RATE: i32 = 44100;

/// One equal-tempered semitone up.
const SEMITONE: f32 = 1.059_463_1;

fn main() -> Result<(), anyhow::Error> {
    // LOGGER INIT
    TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("Failed to start simplelog");
    let mut logger = Logger::new();

    // ARGUMENTS: [preset.yaml] [--render out.wav]
    let mut preset_path: Option<String> = None;
    let mut render_path: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--render" => render_path = args.next(),
            other => preset_path = Some(other.to_string()),
        }
    }

    let preset = match preset_path {
        Some(path) => load_preset(&path)?,
        None => OscillatorPreset::default(),
    };

    let mut oscillator = OscillatorBuilder::from_preset(&preset)
        .with_name("Demo")
        .build()?;
    let mut handle = oscillator.bind_control();
    oscillator.start();

    if let Some(path) = render_path {
        return render_to_wav(oscillator, &path, 2.0);
    }

    info!("<b>Running <blue>demo program</>");

    // get default host
    let host = cpal::default_host();

    // get default device
    let device: Device = host
        .default_output_device()
        .expect("no default output device available. Please check if one is selected");

    // load config
    let supported_config = get_preferred_config(
        &device,
        Some(SampleFormat::F32),
        Some(SampleRate(preset.sample_rate as u32)),
        Some(Channels::Stereo),
    );

    // open stream
    let config: StreamConfig = supported_config.into();
    let channels = config.channels as usize;

    let mut next_value = move || oscillator.next_sample();

    let err_fn = |err| eprintln!("an error occurred on stream: {}", err);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            write_data(data, channels, &mut next_value)
        },
        err_fn,
        None,
    )?;

    // Sweep the pitch from another thread so the lock-free hand-off gets a
    // real workout: one semitone every 150 ms, each step ramped.
    let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);
    let base_frequency = preset.frequency;
    let sweeper = thread::spawn(move || {
        let mut frequency = base_frequency;
        let mut step = 0u32;
        loop {
            if stop_rx.try_recv().is_ok() {
                break;
            }

            frequency *= SEMITONE;
            if handle.set_frequency(frequency, Some(0.05)).is_err() {
                warn!("<b>Control queue <yellow>full</><b>, skipping a sweep step.</>");
            }

            // wobble the duty cycle and detuning along the way
            let pulse_width = 0.3 + 0.1 * (step % 3) as f32;
            let _ = handle.set_pulse_width(pulse_width, Some(0.05));
            let offset = if step % 2 == 0 { 2.0 } else { -2.0 };
            let _ = handle.set_detuning_offset(offset, Some(0.05));

            step += 1;
            sleep(Duration::from_millis(150));
        }

        // fade out instead of cutting the stream dead
        let _ = handle.set_amplitude(0.0, Some(0.25));
    });

    logger.loading("<blue><info></><b> Playing sound</>");
    stream.play()?;

    sleep(Duration::from_millis(2500));
    stop_tx.send(()).unwrap();
    sweeper.join().unwrap();

    // let the fade-out land
    sleep(Duration::from_millis(400));
    logger.done();

    info!("<green><tick></> <b>Program finished <green>successfully</>");
    Ok(())
}

/// Bounces `seconds` of the oscillator into a mono 16-bit WAV file.
fn render_to_wav(
    mut oscillator: OscillatorCore,
    path: &str,
    seconds: f32,
) -> Result<(), anyhow::Error> {
    let sample_rate = oscillator.get_sample_rate();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    info!("<b>Rendering <cyan>{}</> <b>seconds to <cyan>{}</><b>.</>", seconds, path);

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total = (seconds * sample_rate) as usize;
    for _ in 0..total {
        let sample = oscillator.next_sample();
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    info!("<green><tick></> <b>Render finished <green>successfully</>");
    Ok(())
}
