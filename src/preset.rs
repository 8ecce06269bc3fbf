use std::fs;

use simplelog::{error, info};
use thiserror::Error;
use yaml_rust::{Yaml, YamlLoader};

use crate::osc::ParameterId;

/// Version of the preset format this build understands.
const YAML_VERSION: f64 = 1.0;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PresetError {
    #[error("Could not read preset file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Preset file is not valid YAML: {0}")]
    Parse(#[from] yaml_rust::ScanError),
    #[error("Preset version {found} not supported (expected {expected})")]
    Version { found: f64, expected: f64 },
    #[error("Preset file contains no document")]
    Empty,
}

/// Startup values for one oscillator. Missing fields fall back to the
/// parameter defaults; loaded values get clamped later by the builder, so a
/// sloppy preset can detune the synth but never break it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorPreset {
    pub sample_rate: i32,
    pub frequency: f32,
    pub amplitude: f32,
    pub pulse_width: f32,
    pub detuning_offset: f32,
    pub detuning_multiplier: f32,
    /// Default ramp duration for parameter updates, in seconds.
    pub ramp_seconds: f32,
}

impl Default for OscillatorPreset {
    fn default() -> Self {
        Self {
            sample_rate: crate::SAMPLE_RATE,
            frequency: ParameterId::Frequency.default_value(),
            amplitude: ParameterId::Amplitude.default_value(),
            pulse_width: ParameterId::PulseWidth.default_value(),
            detuning_offset: ParameterId::DetuningOffset.default_value(),
            detuning_multiplier: ParameterId::DetuningMultiplier.default_value(),
            ramp_seconds: crate::osc::DEFAULT_RAMP_SECONDS,
        }
    }
}

/// Loads a preset from a YAML file.
///
/// # Format
/// ```yaml
/// version: 1.0
/// oscillator:
///   sample_rate: 44100
///   frequency: 440.0
///   amplitude: 1.0
///   pulse_width: 0.5
///   detuning_offset: 0.0
///   detuning_multiplier: 1.0
///   ramp_seconds: 0.02
/// ```
/// Every field under `oscillator` is optional.
pub fn load_preset(path: &str) -> Result<OscillatorPreset, PresetError> {
    info!("<b>Loading preset from <cyan>{}</><b>.</>", path);

    let text = fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.to_string(),
        source,
    })?;
    let docs = YamlLoader::load_from_str(&text)?;
    let doc = docs.first().ok_or(PresetError::Empty)?;

    let version = doc["version"].as_f64().unwrap_or(0.0);
    if version != YAML_VERSION {
        error!("<b>Please use the <red>latest preset</> <b>version.</>");
        return Err(PresetError::Version {
            found: version,
            expected: YAML_VERSION,
        });
    }

    let osc = &doc["oscillator"];
    let mut preset = OscillatorPreset::default();

    if let Some(sample_rate) = osc["sample_rate"].as_i64() {
        preset.sample_rate = sample_rate as i32;
    }
    if let Some(frequency) = as_float(&osc["frequency"]) {
        preset.frequency = frequency;
    }
    if let Some(amplitude) = as_float(&osc["amplitude"]) {
        preset.amplitude = amplitude;
    }
    if let Some(pulse_width) = as_float(&osc["pulse_width"]) {
        preset.pulse_width = pulse_width;
    }
    if let Some(offset) = as_float(&osc["detuning_offset"]) {
        preset.detuning_offset = offset;
    }
    if let Some(multiplier) = as_float(&osc["detuning_multiplier"]) {
        preset.detuning_multiplier = multiplier;
    }
    if let Some(ramp) = as_float(&osc["ramp_seconds"]) {
        preset.ramp_seconds = ramp;
    }

    info!(
        "  |_ frequency: <cyan>{}</> Hz, amplitude: <cyan>{}</>, pulse width: <cyan>{}</>",
        preset.frequency, preset.amplitude, preset.pulse_width
    );

    Ok(preset)
}

// yaml-rust keeps `440` and `440.0` as different types.
fn as_float(value: &Yaml) -> Option<f32> {
    value
        .as_f64()
        .or_else(|| value.as_i64().map(|v| v as f64))
        .map(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_full_preset() {
        let path = write_temp(
            "square_synth_full_preset.yaml",
            "version: 1.0\n\
             oscillator:\n\
             \x20 sample_rate: 48000\n\
             \x20 frequency: 220\n\
             \x20 amplitude: 0.5\n\
             \x20 pulse_width: 0.25\n\
             \x20 detuning_offset: -3.0\n\
             \x20 detuning_multiplier: 1.5\n\
             \x20 ramp_seconds: 0.1\n",
        );

        let preset = load_preset(path.to_str().unwrap()).unwrap();

        assert_eq!(preset.sample_rate, 48_000);
        assert_eq!(preset.frequency, 220.0);
        assert_eq!(preset.amplitude, 0.5);
        assert_eq!(preset.pulse_width, 0.25);
        assert_eq!(preset.detuning_offset, -3.0);
        assert_eq!(preset.detuning_multiplier, 1.5);
        assert_eq!(preset.ramp_seconds, 0.1);
    }

    #[test]
    fn test_partial_preset_keeps_defaults() {
        let path = write_temp(
            "square_synth_partial_preset.yaml",
            "version: 1.0\noscillator:\n\x20 frequency: 330\n",
        );

        let preset = load_preset(path.to_str().unwrap()).unwrap();

        assert_eq!(preset.frequency, 330.0);
        assert_eq!(preset.amplitude, 1.0);
        assert_eq!(preset.pulse_width, 0.5);
        assert_eq!(preset.sample_rate, 44_100);
    }

    #[test]
    fn test_version_mismatch() {
        let path = write_temp(
            "square_synth_old_preset.yaml",
            "version: 0.5\noscillator:\n\x20 frequency: 330\n",
        );

        let result = load_preset(path.to_str().unwrap());
        assert!(matches!(result, Err(PresetError::Version { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_preset("/definitely/not/here.yaml");
        assert!(matches!(result, Err(PresetError::Io { .. })));
    }
}
