use simplelog::{error, warn};
use thiserror::Error;

use super::control::{command_queue, CommandConsumer, ControlHandle};
use super::oscillator_math::{effective_frequency, max_harmonic, square, wrap_phase};
use super::ramp::{ParameterId, SmoothedParam};

/// Ramp duration used when a parameter update does not carry its own.
pub const DEFAULT_RAMP_SECONDS: f32 = 0.02;

/// How far the effective frequency may drift before the harmonic budget is
/// recomputed. Recomputing per sample would waste the render deadline on
/// `ceil` churn during ramps.
const HARMONIC_RECALC_THRESHOLD_HZ: f32 = 1.0;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Invalid {name}: {value} (must be greater than zero)")]
    InvalidParameter { name: &'static str, value: f32 },
}

/// Lifecycle of the core. Ramps and parameter updates operate while Idle or
/// Active; an Unconfigured core only accepts `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoreState {
    Unconfigured,
    Idle,
    Active,
}

/// A bandlimited square-wave generator with smooth parameter transitions.
///
/// # Usage
/// To generate a **new oscillator**, use the [OscillatorBuilder] instead.
///
/// Samples are pulled one by one with [`next_sample`](OscillatorCore::next_sample),
/// typically from a real-time render callback. That call never blocks,
/// allocates or locks. Parameter changes coming from another thread go
/// through a [ControlHandle] obtained with
/// [`bind_control`](OscillatorCore::bind_control); single-threaded callers
/// can use [`set_parameter`](OscillatorCore::set_parameter) directly.
///
/// # Parameters
/// * **Frequency (f)**: tone, in Hz.
/// * **Amplitude (A)**: gain, from 0 to 1.
/// * **Pulse width**: duty cycle, strictly inside (0, 1). 0.5 gives the
///   symmetric square.
/// * **Detuning offset**: added to the frequency, in Hz.
/// * **Detuning multiplier**: scales the frequency before the offset is
///   added.
///
/// # Behaviour
/// Each sample advances the phase by `f_eff / sample_rate` (wrapping mod
/// 1.0) where `f_eff = clamp(f * multiplier + offset)` stays inside
/// `(0, sample_rate / 2)`, and evaluates a truncated Fourier square whose
/// highest harmonic sits below Nyquist. Every parameter change is ramped
/// so no audible click is produced.
pub struct OscillatorCore {
    state: CoreState,
    /// Amount of samples in a second
    sample_rate: f32,
    /// Position inside the current cycle, in [0, 1)
    phase: f32,
    frequency: SmoothedParam,
    amplitude: SmoothedParam,
    pulse_width: SmoothedParam,
    detuning_offset: SmoothedParam,
    detuning_multiplier: SmoothedParam,
    default_ramp_seconds: f32,
    /// Effective frequency the harmonic budget was computed for
    band_frequency: f32,
    /// Highest harmonic below Nyquist at `band_frequency`
    harmonics: u32,
    /// Consumer end of the control link, if one is bound
    commands: Option<CommandConsumer>,
    /// Name of the oscillator (debugging)
    name: String,
}

impl OscillatorCore {
    /// (Re)initializes every parameter, clears in-progress ramps and resets
    /// the phase to zero. Calling it twice with the same arguments leaves
    /// the core in the same state both times.
    ///
    /// # Expected errors
    /// `InvalidParameter` when `sample_rate` or `frequency` is not positive.
    /// The core is left Unconfigured and produces silence until a valid
    /// `configure` arrives.
    pub fn configure(
        &mut self,
        frequency: f32,
        amplitude: f32,
        pulse_width: f32,
        detuning_offset: f32,
        detuning_multiplier: f32,
        sample_rate: f32,
    ) -> Result<(), ConfigError> {
        if sample_rate <= 0.0 {
            self.state = CoreState::Unconfigured;
            return Err(ConfigError::InvalidParameter {
                name: "sample_rate",
                value: sample_rate,
            });
        }

        if frequency <= 0.0 {
            self.state = CoreState::Unconfigured;
            return Err(ConfigError::InvalidParameter {
                name: "frequency",
                value: frequency,
            });
        }

        self.sample_rate = sample_rate;
        self.frequency.reset(frequency);
        self.amplitude.reset(amplitude);
        self.pulse_width.reset(pulse_width);
        self.detuning_offset.reset(detuning_offset);
        self.detuning_multiplier.reset(detuning_multiplier);
        self.phase = 0.0;

        self.band_frequency = effective_frequency(
            self.frequency.get(),
            self.detuning_offset.get(),
            self.detuning_multiplier.get(),
            sample_rate,
        );
        self.harmonics = max_harmonic(self.band_frequency, sample_rate);
        self.state = CoreState::Idle;

        Ok(())
    }

    /// Creates the control link and hands back its producer side. The
    /// returned handle may live on another thread; the core drains it at
    /// the top of every [`next_sample`](OscillatorCore::next_sample).
    ///
    /// Binding again replaces the link; updates queued on an old handle are
    /// no longer seen.
    pub fn bind_control(&mut self) -> ControlHandle {
        let (producer, consumer) = command_queue();
        self.commands = Some(consumer);
        ControlHandle::new(producer)
    }

    /// Begins a ramp of `id` towards `value`. A ramp already in flight for
    /// the same parameter is replaced, restarting from the current
    /// interpolated value. `None` picks the default ramp time; zero applies
    /// immediately. Out-of-range values are clamped, never rejected.
    pub fn set_parameter(&mut self, id: ParameterId, value: f32, ramp_seconds: Option<f32>) {
        if self.state == CoreState::Unconfigured {
            warn!("<b>Ignoring a parameter update on an <yellow>unconfigured</> <b>oscillator.</>");
            return;
        }

        let mut seconds = ramp_seconds.unwrap_or(self.default_ramp_seconds);
        if seconds < 0.0 {
            warn!(
                "<b>Negative ramp duration <yellow>{}</><b>. Applying immediately.</>",
                seconds
            );
            seconds = 0.0;
        }

        let ramp_samples = (seconds * self.sample_rate).round() as u32;
        self.param_mut(id).set(value, ramp_samples);
    }

    /// Produces the next sample of the lazy, infinite stream.
    ///
    /// Pending control messages are drained first, then every active ramp
    /// advances by one sample, and the bandlimited square is evaluated at
    /// the current phase. While not Active this yields silence without
    /// advancing the phase. Runs without blocking, locking or allocating.
    pub fn next_sample(&mut self) -> f32 {
        self.drain_commands();

        if self.state != CoreState::Active {
            return 0.0;
        }

        let frequency = self.frequency.tick();
        let amplitude = self.amplitude.tick();
        let pulse_width = self.pulse_width.tick();
        let detuning_offset = self.detuning_offset.tick();
        let detuning_multiplier = self.detuning_multiplier.tick();

        let effective = effective_frequency(
            frequency,
            detuning_offset,
            detuning_multiplier,
            self.sample_rate,
        );

        if (effective - self.band_frequency).abs() > HARMONIC_RECALC_THRESHOLD_HZ {
            self.band_frequency = effective;
            self.harmonics = max_harmonic(effective, self.sample_rate);
        }

        let value = square(self.phase, pulse_width, self.harmonics) * amplitude;
        self.phase = wrap_phase(self.phase + effective / self.sample_rate);

        value
    }

    /// Starts producing sound. Has no effect on an unconfigured core.
    pub fn start(&mut self) {
        match self.state {
            CoreState::Unconfigured => {
                error!("<b>Cannot start an <red>unconfigured</> <b>oscillator.</>");
            }
            _ => self.state = CoreState::Active,
        }
    }

    /// Stops producing sound and resets the phase to zero, so the next
    /// [`start`](OscillatorCore::start) picks up click-free at the top of
    /// the cycle.
    pub fn stop(&mut self) {
        if self.state == CoreState::Active {
            self.phase = 0.0;
            self.state = CoreState::Idle;
        }
    }

    /// True between `start()` and `stop()`.
    pub fn is_active(&self) -> bool {
        self.state == CoreState::Active
    }

    /// Creates an identical oscillator picking up the current parameter
    /// values, for building polyphonic voices. The copy starts Idle, at
    /// phase zero, without a control link.
    pub fn duplicate(&self) -> OscillatorCore {
        OscillatorCore {
            state: match self.state {
                CoreState::Unconfigured => CoreState::Unconfigured,
                _ => CoreState::Idle,
            },
            sample_rate: self.sample_rate,
            phase: 0.0,
            frequency: SmoothedParam::with_value(ParameterId::Frequency, self.frequency.get()),
            amplitude: SmoothedParam::with_value(ParameterId::Amplitude, self.amplitude.get()),
            pulse_width: SmoothedParam::with_value(ParameterId::PulseWidth, self.pulse_width.get()),
            detuning_offset: SmoothedParam::with_value(
                ParameterId::DetuningOffset,
                self.detuning_offset.get(),
            ),
            detuning_multiplier: SmoothedParam::with_value(
                ParameterId::DetuningMultiplier,
                self.detuning_multiplier.get(),
            ),
            default_ramp_seconds: self.default_ramp_seconds,
            band_frequency: self.band_frequency,
            harmonics: self.harmonics,
            commands: None,
            name: self.name.clone(),
        }
    }

    fn drain_commands(&mut self) {
        // take/put keeps the borrow checker happy without any allocation
        if let Some(mut consumer) = self.commands.take() {
            while let Some(update) = consumer.pop() {
                self.set_parameter(update.id, update.value, update.ramp_seconds);
            }
            self.commands = Some(consumer);
        }
    }

    fn param_mut(&mut self, id: ParameterId) -> &mut SmoothedParam {
        match id {
            ParameterId::Frequency => &mut self.frequency,
            ParameterId::Amplitude => &mut self.amplitude,
            ParameterId::PulseWidth => &mut self.pulse_width,
            ParameterId::DetuningOffset => &mut self.detuning_offset,
            ParameterId::DetuningMultiplier => &mut self.detuning_multiplier,
        }
    }
}

/// Some shortcut methods for reading the smoothed parameter values. Handy
/// for tests and UI meters; the values reflect the last `next_sample` tick.
impl OscillatorCore {
    /// Shortcut method for getting the frequency parameter.
    pub fn get_frequency(&self) -> f32 {
        self.frequency.get()
    }

    /// Shortcut method for getting the amplitude parameter.
    pub fn get_amplitude(&self) -> f32 {
        self.amplitude.get()
    }

    /// Shortcut method for getting the pulse width parameter.
    pub fn get_pulse_width(&self) -> f32 {
        self.pulse_width.get()
    }

    /// Shortcut method for getting the detuning offset parameter.
    pub fn get_detuning_offset(&self) -> f32 {
        self.detuning_offset.get()
    }

    /// Shortcut method for getting the detuning multiplier parameter.
    pub fn get_detuning_multiplier(&self) -> f32 {
        self.detuning_multiplier.get()
    }

    pub fn get_sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Highest harmonic currently kept below Nyquist.
    pub fn harmonic_count(&self) -> u32 {
        self.harmonics
    }

    pub fn get_name(&self) -> String {
        self.name.to_string()
    }
}

/// The [OscillatorBuilder] is the proper way of generating an
/// [OscillatorCore].
/// # Usage
/// ```rust
/// let mut oscillator = OscillatorBuilder::new().build().unwrap(); // Defaults
///
/// let osc = OscillatorBuilder::new() // With most values
///     .with_frequency(220.0)
///     .with_amplitude(0.5)
///     .with_pulse_width(0.25)
///     .build()
///     .unwrap();
/// ```
pub struct OscillatorBuilder {
    sample_rate: Option<i32>,
    frequency: Option<f32>,
    amplitude: Option<f32>,
    pulse_width: Option<f32>,
    detuning_offset: Option<f32>,
    detuning_multiplier: Option<f32>,
    ramp_seconds: Option<f32>,
    name: Option<String>,
}

impl OscillatorBuilder {
    /// Sets the defaults for the oscillator (no fields).
    pub fn new() -> Self {
        Self {
            sample_rate: None,
            frequency: None,
            amplitude: None,
            pulse_width: None,
            detuning_offset: None,
            detuning_multiplier: None,
            ramp_seconds: None,
            name: None,
        }
    }

    /// Pre-fills every field from a loaded preset.
    pub fn from_preset(preset: &crate::preset::OscillatorPreset) -> Self {
        Self {
            sample_rate: Some(preset.sample_rate),
            frequency: Some(preset.frequency),
            amplitude: Some(preset.amplitude),
            pulse_width: Some(preset.pulse_width),
            detuning_offset: Some(preset.detuning_offset),
            detuning_multiplier: Some(preset.detuning_multiplier),
            ramp_seconds: Some(preset.ramp_seconds),
            name: None,
        }
    }

    /// Sets the sample rate of the oscillator.
    pub fn with_sample_rate(mut self, sample_rate: i32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Sets the **default** value of the *frequency* parameter, in Hz.
    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Sets the **default** value of the *amplitude* parameter.
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    /// Sets the **default** value of the *pulse width* parameter.
    pub fn with_pulse_width(mut self, pulse_width: f32) -> Self {
        self.pulse_width = Some(pulse_width);
        self
    }

    /// Sets the **default** value of the *detuning offset* parameter, in Hz.
    pub fn with_detuning_offset(mut self, offset: f32) -> Self {
        self.detuning_offset = Some(offset);
        self
    }

    /// Sets the **default** value of the *detuning multiplier* parameter.
    pub fn with_detuning_multiplier(mut self, multiplier: f32) -> Self {
        self.detuning_multiplier = Some(multiplier);
        self
    }

    /// Sets the ramp duration used when an update carries none.
    pub fn with_default_ramp(mut self, seconds: f32) -> Self {
        self.ramp_seconds = Some(seconds);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Tries to generate an [OscillatorCore] from the given configuration.
    ///
    /// # Default values:
    /// * Sample rate: [SAMPLE_RATE](const@crate::SAMPLE_RATE)
    /// * Frequency: 440 Hz
    /// * Amplitude: 1.0
    /// * Pulse width: 0.5
    /// * Detuning offset: 0 Hz
    /// * Detuning multiplier: 1.0
    ///
    /// # Expected errors
    /// * Non-positive sample rate or frequency.
    pub fn build(self) -> Result<OscillatorCore, ConfigError> {
        let name = self
            .name
            .unwrap_or_else(|| "SquareOscillator".to_string());
        let sample_rate = self.sample_rate.unwrap_or(crate::SAMPLE_RATE) as f32;
        let frequency = self
            .frequency
            .unwrap_or_else(|| ParameterId::Frequency.default_value());
        let amplitude = self
            .amplitude
            .unwrap_or_else(|| ParameterId::Amplitude.default_value());
        let pulse_width = self
            .pulse_width
            .unwrap_or_else(|| ParameterId::PulseWidth.default_value());
        let detuning_offset = self
            .detuning_offset
            .unwrap_or_else(|| ParameterId::DetuningOffset.default_value());
        let detuning_multiplier = self
            .detuning_multiplier
            .unwrap_or_else(|| ParameterId::DetuningMultiplier.default_value());

        let mut core = OscillatorCore {
            state: CoreState::Unconfigured,
            sample_rate: 0.0,
            phase: 0.0,
            frequency: SmoothedParam::new(ParameterId::Frequency),
            amplitude: SmoothedParam::new(ParameterId::Amplitude),
            pulse_width: SmoothedParam::new(ParameterId::PulseWidth),
            detuning_offset: SmoothedParam::new(ParameterId::DetuningOffset),
            detuning_multiplier: SmoothedParam::new(ParameterId::DetuningMultiplier),
            default_ramp_seconds: self.ramp_seconds.unwrap_or(DEFAULT_RAMP_SECONDS),
            band_frequency: 0.0,
            harmonics: 1,
            commands: None,
            name,
        };

        core.configure(
            frequency,
            amplitude,
            pulse_width,
            detuning_offset,
            detuning_multiplier,
            sample_rate,
        )?;

        Ok(core)
    }
}

#[cfg(test)]
mod oscillator_builder_tests {
    use super::*;
    use simplelog::__private::paris::Logger;

    fn get_logger() -> Logger<'static> {
        Logger::new()
    }

    #[test]
    fn test_empty() {
        let mut logger = get_logger();
        logger.info("<b>Running test for oscillator builder with no arguments</>");

        let osc = OscillatorBuilder::new().build().unwrap();

        assert_eq!(osc.get_sample_rate(), 44100.0, "Default sample mismatch");
        assert_eq!(osc.get_frequency(), 440.0, "Default frequency differs");
        assert_eq!(osc.get_amplitude(), 1.0, "Default amplitude differs");
        assert_eq!(osc.get_pulse_width(), 0.5, "Default pulse width differs");
        assert_eq!(osc.get_detuning_offset(), 0.0, "Default offset differs");
        assert_eq!(
            osc.get_detuning_multiplier(),
            1.0,
            "Default multiplier differs"
        );
        assert!(!osc.is_active(), "A fresh oscillator must be idle");
    }

    #[test]
    fn test_all_fields() {
        let osc = OscillatorBuilder::new()
            .with_sample_rate(22_000)
            .with_frequency(220.0)
            .with_amplitude(0.5)
            .with_pulse_width(0.25)
            .with_detuning_offset(3.0)
            .with_detuning_multiplier(2.0)
            .with_name("Test")
            .build()
            .unwrap();

        assert_eq!(osc.get_sample_rate(), 22_000.0, "Sample mismatch");
        assert_eq!(osc.get_frequency(), 220.0, "Frequency parameter differs");
        assert_eq!(osc.get_amplitude(), 0.5, "Amplitude parameter differs");
        assert_eq!(osc.get_pulse_width(), 0.25, "Pulse width parameter differs");
        assert_eq!(osc.get_detuning_offset(), 3.0, "Offset parameter differs");
        assert_eq!(
            osc.get_detuning_multiplier(),
            2.0,
            "Multiplier parameter differs"
        );
        assert_eq!(osc.get_name(), "Test");
    }

    #[test]
    fn test_invalid_frequency() {
        let result = OscillatorBuilder::new().with_frequency(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "frequency",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_sample_rate() {
        let result = OscillatorBuilder::new().with_sample_rate(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "sample_rate",
                ..
            })
        ));
    }
}


#[cfg(test)]
#[cfg(debug_assertions)]
mod duty_cycle_tests {
    use super::*;
    use crate::osc::debug::NaiveSquare;

    // 441 Hz at 44.1 kHz gives a period of exactly 100 samples, so whole
    // periods are easy to count.
    const FREQUENCY: f32 = 441.0;
    const PERIODS: usize = 44;

    fn positive_fraction(samples: &[f32]) -> f32 {
        let positive = samples.iter().filter(|s| **s > 0.0).count();
        positive as f32 / samples.len() as f32
    }

    #[test]
    fn test_duty_cycle_follows_pulse_width() {
        let pulse_width = 0.25;
        let mut osc = OscillatorBuilder::new()
            .with_frequency(FREQUENCY)
            .with_pulse_width(pulse_width)
            .build()
            .unwrap();
        osc.start();

        let samples: Vec<f32> = (0..PERIODS * 100).map(|_| osc.next_sample()).collect();
        let bandlimited = positive_fraction(&samples);

        let mut naive = NaiveSquare::new(FREQUENCY, pulse_width, crate::SAMPLE_RATE);
        let reference: Vec<f32> = (0..PERIODS * 100).map(|_| naive.next_sample()).collect();
        let expected = positive_fraction(&reference);

        assert!(
            (bandlimited - expected).abs() < 0.05,
            "Duty cycle {} deviates from the naive reference {}",
            bandlimited,
            expected
        );
    }
}
