use std::f32::consts::PI;

/// Floor for the effective frequency. Zero or negative frequencies make the
/// harmonic budget meaningless, so anything below this gets pulled up.
pub const MIN_EFFECTIVE_FREQUENCY: f32 = 0.01;

/// Fraction of the band kept below Nyquist so at least the fundamental
/// always survives truncation.
const NYQUIST_MARGIN: f32 = 1e-3;

/// Highest harmonic of `frequency` whose own frequency stays below Nyquist
/// (`sample_rate / 2`).
///
/// For a frequency just under Nyquist this is 1 (fundamental only). For
/// `sample_rate / 100` the Nyquist ratio is exactly 50 and the result is 49,
/// since harmonic 50 would land on Nyquist itself.
pub fn max_harmonic(frequency: f32, sample_rate: f32) -> u32 {
    let ratio = sample_rate * 0.5 / frequency;
    let highest = (ratio.ceil() as u32).saturating_sub(1);
    highest.max(1)
}

/// Combines base frequency, detuning offset and detuning multiplier into the
/// frequency the phase accumulator actually runs at, clamped into the band
/// the additive synthesis can represent: `(0, sample_rate / 2)`.
pub fn effective_frequency(
    frequency: f32,
    detuning_offset: f32,
    detuning_multiplier: f32,
    sample_rate: f32,
) -> f32 {
    let nyquist = sample_rate * 0.5;
    (frequency * detuning_multiplier + detuning_offset)
        .clamp(MIN_EFFECTIVE_FREQUENCY, nyquist * (1.0 - NYQUIST_MARGIN))
}

/// Wraps a non-negative phase into [0, 1).
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.fract();
    if wrapped < 0.0 {
        wrapped + 1.0
    } else {
        wrapped
    }
}

/// Truncated Fourier sawtooth, descending from +1 towards -1 over one cycle.
///
/// `saw(phase) = (2/pi) * sum_{n=1..N} sigma(n) * sin(2 pi n phase) / n`
///
/// The Lanczos sigma factor tapers the highest harmonics so the Gibbs
/// overshoot at the reset stays small.
fn sawtooth(phase: f32, harmonics: u32) -> f32 {
    let span = (harmonics + 1) as f32;
    let mut acc = 0.0f32;

    for n in 1..=harmonics {
        let nf = n as f32;
        let x = PI * nf / span;
        let sigma = x.sin() / x;
        acc += sigma * (2.0 * PI * nf * phase).sin() / nf;
    }

    acc * 2.0 / PI
}

/// Bandlimited square wave at `phase` with duty cycle `pulse_width`,
/// normalized to [-1, 1].
///
/// Built from two phase-shifted copies of the bandlimited sawtooth plus a DC
/// term. The difference cancels the ramps and leaves a pulse that sits high
/// for `pulse_width` of the cycle; at `pulse_width = 0.5` this reduces to
/// the classic odd-harmonic square sum. The residual truncation ripple is
/// clamped away so the result can never leave [-1, 1].
pub fn square(phase: f32, pulse_width: f32, harmonics: u32) -> f32 {
    let shifted = wrap_phase(phase + 1.0 - pulse_width);
    let value =
        sawtooth(phase, harmonics) - sawtooth(shifted, harmonics) + (2.0 * pulse_width - 1.0);

    value.clamp(-1.0, 1.0)
}
